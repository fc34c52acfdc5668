// Luminaris Core Library
// Session gate and live telemetry aggregation for the security operations console

pub mod config;
pub mod dashboard;
pub mod gate;
pub mod series;
pub mod session;
pub mod storage;
pub mod telemetry;
pub mod transport;

// Export core types
pub use config::LuminarisConfig;
pub use dashboard::{
    mount, DashboardHandle, DashboardKind, DashboardModel, DashboardSources, DashboardView,
    LoadStatus, MountOptions,
};
pub use gate::{AuthorizationGate, CapabilityRequirement, GateDecision, View};
pub use series::{KeyedSeries, RateDeriver, RateSeries, SeriesSample, SlidingWindow};
pub use session::{Role, Session, SessionStore};
pub use storage::{MemoryStorage, RocksStorage, SessionStorage};
pub use transport::{HttpTransport, PushHub, WsPushChannel};

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LuminarisError {
    #[error("Session error: {0}")]
    SessionError(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Token error: {0}")]
    TokenError(#[from] session::TokenError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
pub type Result<T> = std::result::Result<T, LuminarisError>;
