// Dashboard module - Live view-models for the console pages
//
// Each mounted dashboard owns one reconciler task that folds a one-shot bulk
// snapshot, push messages and periodic polls into a single view-model.

mod analytics;
mod message;
mod overview;
mod reconciler;
mod system;
mod threats;
mod versioned;

pub use analytics::{AnalyticsModel, AnalyticsState, Counts, GeoPayload, GeoRecord, Severity};
pub use message::{field, MessageError, MessageTag, PushMessage};
pub use overview::{Forecast, MitreCount, NamedCount, OverviewModel, OverviewState, Stats};
pub use reconciler::{
    mount, ChannelStatus, DashboardHandle, DashboardSources, DashboardView, LoadStatus,
    MountOptions,
};
pub use system::{
    CpuFrequency, CpuInfo, DiskInfo, MemoryInfo, NetworkTotals, SystemMetricsModel, SystemMetricsSample,
    SystemMetricsState, TemperatureReading, TemperatureStatus,
};
pub use threats::{ThreatFilter, ThreatLevel, ThreatRecord, ThreatsModel, ThreatsState};
pub use versioned::Versioned;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Logical dashboards of the console
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DashboardKind {
    /// Landing page: headline stats, recent logs, last forecast
    Overview,
    /// Analyzed threat log
    Threats,
    /// Activity, geography and classification aggregates
    Analytics,
    /// Host CPU/memory/disk/network/temperature charts
    SystemMetrics,
}

impl DashboardKind {
    pub const ALL: [DashboardKind; 4] = [
        DashboardKind::Overview,
        DashboardKind::Threats,
        DashboardKind::Analytics,
        DashboardKind::SystemMetrics,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DashboardKind::Overview => "overview",
            DashboardKind::Threats => "threats",
            DashboardKind::Analytics => "analytics",
            DashboardKind::SystemMetrics => "system_metrics",
        }
    }

    /// Discriminator of the push messages meant for this dashboard
    pub fn push_tag(&self) -> Option<MessageTag> {
        match self {
            DashboardKind::Overview => Some(MessageTag::DashboardUpdate),
            DashboardKind::Threats => Some(MessageTag::ThreatsUpdate),
            DashboardKind::Analytics => Some(MessageTag::AnalyticsUpdate),
            DashboardKind::SystemMetrics => None,
        }
    }

    pub fn has_snapshot(&self) -> bool {
        !matches!(self, DashboardKind::SystemMetrics)
    }

    pub fn is_polled(&self) -> bool {
        matches!(self, DashboardKind::SystemMetrics)
    }
}

impl fmt::Display for DashboardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("sample does not match the expected shape: {0}")]
    Sample(#[from] serde_json::Error),
}

/// How one dashboard folds updates into its state
///
/// Bulk snapshots use the same field names as push messages, so both go
/// through [`apply`](DashboardModel::apply); the snapshot just carries every
/// field at once.
pub trait DashboardModel: Send + 'static {
    type State: Clone + Send + Sync + 'static;

    fn kind(&self) -> DashboardKind;

    fn initial_state(&self) -> Self::State;

    /// Replace each structurally valid field present in `fields`.
    /// Returns the number of fields replaced.
    fn apply(&self, state: &mut Self::State, fields: &Map<String, Value>, version: u64) -> usize;

    /// Fold one periodic sample
    fn poll(&self, _state: &mut Self::State, _sample: Value) -> Result<(), ReconcileError> {
        Ok(())
    }

    /// A poll interval passed without a usable sample
    fn poll_missed(&self, _state: &mut Self::State) {}
}
