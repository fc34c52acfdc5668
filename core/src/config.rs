use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::series::DEFAULT_WINDOW;

/// High-level configuration for the console core
#[derive(Clone, Debug, Default)]
pub struct LuminarisConfig {
    pub api: ApiConfig,
    pub series: SeriesConfig,
    pub session: SessionConfig,
}

/// Backend endpoint settings
#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout_ms: u64,
}

/// Live chart settings
#[derive(Clone, Debug)]
pub struct SeriesConfig {
    /// Samples kept per chart
    pub window_capacity: usize,
    /// Period of the system metrics poll, also the rate interval
    pub poll_interval_ms: u64,
}

/// Session persistence settings
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// RocksDB directory; `None` keeps the session in memory only
    pub storage_dir: Option<PathBuf>,
    pub expiry_check_ms: u64,
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|v| v.parse::<u64>().ok())
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("LUMINARIS_API_URL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "http://127.0.0.1:8000".to_string()),
            request_timeout_ms: env_u64("LUMINARIS_TIMEOUT_MS").unwrap_or(10_000),
        }
    }
}

impl Default for SeriesConfig {
    fn default() -> Self {
        Self {
            window_capacity: env_u64("LUMINARIS_WINDOW")
                .map(|v| v as usize)
                .unwrap_or(DEFAULT_WINDOW),
            poll_interval_ms: env_u64("LUMINARIS_POLL_MS").unwrap_or(2_000),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            storage_dir: std::env::var("LUMINARIS_SESSION_DIR")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            expiry_check_ms: env_u64("LUMINARIS_EXPIRY_CHECK_MS").unwrap_or(30_000),
        }
    }
}

impl SeriesConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn interval_secs(&self) -> f64 {
        self.poll_interval().as_secs_f64()
    }
}

impl SessionConfig {
    pub fn expiry_check(&self) -> Duration {
        Duration::from_millis(self.expiry_check_ms.max(1))
    }
}

impl LuminarisConfig {
    /// Load configuration from a TOML file (path via LUMINARIS_CONFIG or ./luminaris.toml),
    /// overlaying values onto env-driven defaults.
    pub fn load() -> Self {
        let path = std::env::var("LUMINARIS_CONFIG").unwrap_or_else(|_| "luminaris.toml".into());
        Self::load_from(Path::new(&path))
    }

    pub fn load_from(path: &Path) -> Self {
        let default = Self::default();
        if !path.exists() {
            tracing::info!(target: "config", path = %path.display(), "No TOML config found; using defaults/env");
            return default;
        }
        match fs::read_to_string(path) {
            Ok(s) => Self::from_toml_str(&s).unwrap_or_else(|e| {
                tracing::warn!(target: "config", error = %e, "Failed to parse TOML; using defaults");
                default
            }),
            Err(e) => {
                tracing::warn!(target: "config", error = %e, "Failed to read TOML; using defaults");
                default
            }
        }
    }

    /// Overlay a TOML document onto the defaults
    pub fn from_toml_str(s: &str) -> crate::Result<Self> {
        let t = toml::from_str::<LuminarisToml>(s)
            .map_err(|e| crate::LuminarisError::ConfigError(e.to_string()))?;
        Ok(t.overlay(Self::default()))
    }
}

// =========================
// TOML overlay definitions
// =========================

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct LuminarisToml {
    pub api: Option<ApiToml>,
    pub series: Option<SeriesToml>,
    pub session: Option<SessionToml>,
}

impl LuminarisToml {
    fn overlay(self, mut base: LuminarisConfig) -> LuminarisConfig {
        if let Some(a) = self.api {
            a.apply(&mut base.api);
        }
        if let Some(s) = self.series {
            s.apply(&mut base.series);
        }
        if let Some(s) = self.session {
            s.apply(&mut base.session);
        }
        base
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct ApiToml {
    pub base_url: Option<String>,
    pub request_timeout_ms: Option<u64>,
}
impl ApiToml {
    fn apply(self, a: &mut ApiConfig) {
        if let Some(x) = self.base_url {
            a.base_url = x.trim_end_matches('/').to_string();
        }
        if let Some(x) = self.request_timeout_ms {
            a.request_timeout_ms = x;
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct SeriesToml {
    pub window_capacity: Option<usize>,
    pub poll_interval_ms: Option<u64>,
}
impl SeriesToml {
    fn apply(self, s: &mut SeriesConfig) {
        if let Some(x) = self.window_capacity {
            s.window_capacity = x.max(1);
        }
        if let Some(x) = self.poll_interval_ms {
            s.poll_interval_ms = x;
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct SessionToml {
    pub storage_dir: Option<PathBuf>,
    pub expiry_check_ms: Option<u64>,
}
impl SessionToml {
    fn apply(self, s: &mut SessionConfig) {
        if let Some(x) = self.storage_dir {
            s.storage_dir = Some(x);
        }
        if let Some(x) = self.expiry_check_ms {
            s.expiry_check_ms = x;
        }
    }
}
