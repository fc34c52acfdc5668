/// HTTP transport
///
/// Request/response side of the backend over `reqwest`. Bulk snapshots are
/// assembled from the per-widget endpoints into one object whose field names
/// match the push messages, so the reconciler seeds and updates through the
/// same path.
use crate::config::ApiConfig;
use crate::dashboard::{DashboardKind, Forecast, ThreatRecord};
use crate::session::{AuthClient, Profile, SessionStore};
use crate::transport::SnapshotSource;
use crate::{LuminarisError, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserCount {
    count: u64,
}

/// Backend client for auth, bulk snapshots and polls
#[derive(Clone)]
pub struct HttpTransport {
    http: Client,
    base_url: String,
    session: Option<Arc<SessionStore>>,
}

impl HttpTransport {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .user_agent(concat!("luminaris/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LuminarisError::TransportError(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session: None,
        })
    }

    /// Attach the bearer token of `store` to every non-auth request
    pub fn with_session(mut self, store: Arc<SessionStore>) -> Self {
        self.session = Some(store);
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.as_ref().and_then(|s| s.current()) {
            Some(session) => request.bearer_auth(session.token),
            None => request,
        }
    }

    async fn send(&self, method: Method, path: &str) -> Result<Response> {
        debug!(target: "transport", method = %method, path = %path, "Request");
        let response = self
            .authorized(self.http.request(method.clone(), self.url(path)))
            .send()
            .await
            .map_err(|e| {
                warn!(target: "transport", path = %path, error = %e, "Request failed");
                LuminarisError::TransportError(format!("{} {} failed: {}", method, path, e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            warn!(target: "transport", path = %path, status = %status, "Backend returned error");
            return Err(LuminarisError::TransportError(format!(
                "{} {} returned status: {}",
                method, path, status
            )));
        }
        Ok(response)
    }

    async fn get_json(&self, path: &str) -> Result<Value> {
        self.send(Method::GET, path).await?.json().await.map_err(|e| {
            LuminarisError::TransportError(format!("GET {} returned invalid JSON: {}", path, e))
        })
    }

    async fn get_typed<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        Ok(serde_json::from_value(self.get_json(path).await?)?)
    }

    /// One analyzed log entry
    pub async fn threat(&self, id: u64) -> Result<ThreatRecord> {
        self.get_typed(&format!("/logs/analyzed/{}", id)).await
    }

    /// Mark a threat resolved and return its updated record
    pub async fn resolve_threat(&self, id: u64) -> Result<ThreatRecord> {
        self.send(Method::PATCH, &format!("/threats/{}/resolve", id))
            .await?;
        info!(target: "transport", id, "Threat resolved");
        self.threat(id).await
    }

    /// Most recent stored forecast
    pub async fn last_forecast(&self) -> Result<Forecast> {
        self.get_typed("/forecast/last").await
    }

    /// Ask the backend for a fresh next-attack forecast
    pub async fn next_attack_forecast(&self) -> Result<Forecast> {
        self.get_typed("/forecast/next-attack").await
    }

    /// Every stored forecast
    pub async fn forecast_history(&self) -> Result<Vec<Forecast>> {
        self.get_typed("/forecast/all").await
    }

    async fn overview_snapshot(&self) -> Result<Value> {
        let (stats, users, recent) = tokio::try_join!(
            self.get_json("/dashboard/stats"),
            self.get_json("/companies/user-count"),
            self.get_json("/logs/recent"),
        )?;
        let users: UserCount = serde_json::from_value(users)?;
        // No forecast yet is normal for a fresh tenant.
        let forecast = self.get_json("/forecast/last").await.ok();

        Ok(json!({
            "stats": stats,
            "userCount": users.count,
            "recentLogs": recent,
            "forecast": forecast,
        }))
    }

    async fn analytics_snapshot(&self) -> Result<Value> {
        let (activity, geo, severity, summary) = tokio::try_join!(
            self.get_json("/analytics/hourly-activity"),
            self.get_json("/analytics/geolocation"),
            self.get_json("/analytics/severity"),
            self.get_json("/analytics/summary"),
        )?;

        Ok(json!({
            "activity": activity["hourly_activity"],
            "geo": geo["geodata"],
            "severity": severity,
            "attack_types": summary["attack_types"],
            "risk_levels": summary["risk_levels"],
            "mitre_data": summary["top_mitre"],
        }))
    }
}

#[async_trait]
impl SnapshotSource for HttpTransport {
    async fn fetch_snapshot(&self, kind: DashboardKind) -> Result<Value> {
        match kind {
            DashboardKind::Overview => self.overview_snapshot().await,
            DashboardKind::Threats => Ok(json!({ "threats": self.get_json("/logs/analyzed").await? })),
            DashboardKind::Analytics => self.analytics_snapshot().await,
            DashboardKind::SystemMetrics => Err(LuminarisError::TransportError(format!(
                "{} has no bulk snapshot",
                kind
            ))),
        }
    }

    async fn poll(&self, kind: DashboardKind) -> Result<Value> {
        match kind {
            DashboardKind::SystemMetrics => self.get_json("/system/metrics").await,
            other => Err(LuminarisError::TransportError(format!(
                "{} is not polled",
                other
            ))),
        }
    }
}

#[async_trait]
impl AuthClient for HttpTransport {
    async fn exchange(&self, username: &str, password: &str) -> Result<String> {
        // Auth endpoints never carry a bearer token.
        let response = self
            .http
            .post(self.url("/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .map_err(|e| LuminarisError::TransportError(format!("login request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(LuminarisError::AuthError(format!(
                "login returned status: {}",
                response.status()
            )));
        }

        let body: LoginResponse = response
            .json()
            .await
            .map_err(|e| LuminarisError::AuthError(format!("invalid login response: {}", e)))?;
        Ok(body.access_token)
    }

    async fn profile(&self, token: &str) -> Result<Profile> {
        let response = self
            .http
            .get(self.url("/auth/me"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| LuminarisError::TransportError(format!("profile request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(LuminarisError::AuthError(format!(
                "profile returned status: {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| LuminarisError::AuthError(format!("invalid profile response: {}", e)))
    }
}
