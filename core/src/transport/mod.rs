//! Transport collaborators
//!
//! The reconciler only sees two seams:
//! - [`SnapshotSource`]: one-shot bulk snapshots and periodic poll samples
//! - [`PushChannel`]: an open/message/error/close stream of UTF-8 messages
//!
//! [`HttpTransport`] covers the request/response side over `reqwest`,
//! [`WsPushChannel`] the backend's dashboard sockets. [`PushHub`] is an
//! in-process channel fed by the caller.

mod http;
mod hub;
mod ws;

pub use http::HttpTransport;
pub use hub::PushHub;
pub use ws::WsPushChannel;

use crate::dashboard::DashboardKind;
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

/// What a push channel delivers
#[derive(Clone, Debug, PartialEq)]
pub enum ChannelEvent {
    /// One UTF-8 text frame
    Message(String),
    /// The channel failed; no more events follow
    Error(String),
    /// The channel was closed by the remote end
    Closed,
}

pub type PushReceiver = mpsc::Receiver<ChannelEvent>;

/// Request/response side of the backend
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Full state for one dashboard
    async fn fetch_snapshot(&self, kind: DashboardKind) -> Result<Value>;

    /// One periodic sample for poll-driven dashboards
    async fn poll(&self, kind: DashboardKind) -> Result<Value>;
}

/// Push side of the backend
#[async_trait]
pub trait PushChannel: Send + Sync {
    /// Open the channel for one dashboard
    async fn open(&self, kind: DashboardKind) -> Result<PushReceiver>;
}
