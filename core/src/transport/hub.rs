// In-process push hub
//
// Uses tokio broadcast channels, one per dashboard, to fan raw text frames
// out to every mounted reconciler.

use crate::dashboard::DashboardKind;
use crate::transport::{ChannelEvent, PushChannel, PushReceiver};
use crate::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

/// Push hub shared by the socket side and the reconcilers
pub struct PushHub {
    capacity: usize,
    channels: DashMap<DashboardKind, broadcast::Sender<String>>,
}

impl PushHub {
    /// Create a hub buffering up to `capacity` frames per channel
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            channels: DashMap::new(),
        }
    }

    /// Deliver a frame to every open channel of `kind`
    pub fn publish(&self, kind: DashboardKind, frame: impl Into<String>) -> usize {
        // Ignore error if no subscribers
        self.sender(kind).send(frame.into()).unwrap_or(0)
    }

    /// Deliver a frame to every dashboard; each ignores tags meant for others
    pub fn publish_all(&self, frame: &str) -> usize {
        DashboardKind::ALL
            .iter()
            .map(|kind| self.publish(*kind, frame))
            .sum()
    }

    /// Close the channel for `kind`; open receivers see `Closed`
    pub fn close(&self, kind: DashboardKind) {
        self.channels.remove(&kind);
    }

    /// Get number of open channels for `kind`
    pub fn subscriber_count(&self, kind: DashboardKind) -> usize {
        self.channels
            .get(&kind)
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }

    fn sender(&self, kind: DashboardKind) -> broadcast::Sender<String> {
        self.channels
            .entry(kind)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }
}

impl Default for PushHub {
    fn default() -> Self {
        Self::new(1000) // Buffer last 1000 frames
    }
}

#[async_trait]
impl PushChannel for PushHub {
    async fn open(&self, kind: DashboardKind) -> Result<PushReceiver> {
        let mut frames = self.sender(kind).subscribe();
        let (tx, rx) = mpsc::channel(self.capacity);
        debug!(target: "transport", dashboard = %kind, "Push channel opened");

        tokio::spawn(async move {
            loop {
                let received = tokio::select! {
                    _ = tx.closed() => break,
                    received = frames.recv() => received,
                };
                let event = match received {
                    Ok(frame) => ChannelEvent::Message(frame),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(target: "transport", dashboard = %kind, skipped, "Push channel lagged");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => ChannelEvent::Closed,
                };
                let last = event == ChannelEvent::Closed;
                if tx.send(event).await.is_err() || last {
                    break;
                }
            }
        });

        Ok(rx)
    }
}
