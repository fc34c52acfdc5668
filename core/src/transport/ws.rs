// WebSocket push channel
//
// One socket per dashboard at `{ws base}/ws/{dashboard|threats|analytics}`,
// authenticated with the session token in the query string. Text frames
// become messages; a close frame or the end of the stream yields `Closed`,
// a socket error yields `Error`. Either ends the channel.

use crate::config::ApiConfig;
use crate::dashboard::DashboardKind;
use crate::session::SessionStore;
use crate::transport::{ChannelEvent, PushChannel, PushReceiver};
use crate::{LuminarisError, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

const FRAME_BUFFER: usize = 256;

/// Push channel backed by the backend's dashboard sockets
#[derive(Clone)]
pub struct WsPushChannel {
    base_url: String,
    session: Option<Arc<SessionStore>>,
}

impl WsPushChannel {
    /// Derive the socket base from the API base URL (`http` → `ws`, `https` → `wss`)
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let base = config.base_url.trim_end_matches('/');
        let base_url = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else if base.starts_with("wss://") || base.starts_with("ws://") {
            base.to_string()
        } else {
            return Err(LuminarisError::ConfigError(format!(
                "cannot derive a socket URL from {}",
                config.base_url
            )));
        };
        Ok(Self {
            base_url,
            session: None,
        })
    }

    /// Authenticate sockets with the token of `store`
    pub fn with_session(mut self, store: Arc<SessionStore>) -> Self {
        self.session = Some(store);
        self
    }

    /// Socket URL for `kind`, including the current token
    pub fn endpoint(&self, kind: DashboardKind) -> Result<String> {
        let name = match kind {
            DashboardKind::Overview => "dashboard",
            DashboardKind::Threats => "threats",
            DashboardKind::Analytics => "analytics",
            DashboardKind::SystemMetrics => {
                return Err(LuminarisError::TransportError(format!(
                    "{} has no push channel",
                    kind
                )))
            }
        };
        let session = self
            .session
            .as_ref()
            .and_then(|s| s.current())
            .ok_or_else(|| LuminarisError::AuthError("push channel needs a session".into()))?;
        Ok(format!("{}/ws/{}?token={}", self.base_url, name, session.token))
    }
}

#[async_trait]
impl PushChannel for WsPushChannel {
    async fn open(&self, kind: DashboardKind) -> Result<PushReceiver> {
        let url = self.endpoint(kind)?;
        let (mut socket, _) = connect_async(url.as_str()).await.map_err(|e| {
            warn!(target: "transport", dashboard = %kind, error = %e, "Socket connect failed");
            LuminarisError::TransportError(format!("{} socket failed to connect: {}", kind, e))
        })?;
        info!(target: "transport", dashboard = %kind, "Push socket open");

        let (tx, rx) = mpsc::channel(FRAME_BUFFER);
        tokio::spawn(async move {
            loop {
                let next = tokio::select! {
                    _ = tx.closed() => break,
                    next = socket.next() => next,
                };
                let event = match next {
                    Some(Ok(Message::Text(text))) => ChannelEvent::Message(text),
                    Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                        Ok(text) => ChannelEvent::Message(text),
                        Err(_) => {
                            debug!(target: "transport", dashboard = %kind, "Dropping non-UTF-8 frame");
                            continue;
                        }
                    },
                    Some(Ok(Message::Close(frame))) => {
                        debug!(target: "transport", dashboard = %kind, frame = ?frame, "Socket closed by backend");
                        ChannelEvent::Closed
                    }
                    // Ping/pong are answered by the socket itself
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => ChannelEvent::Error(e.to_string()),
                    None => ChannelEvent::Closed,
                };
                let last = !matches!(event, ChannelEvent::Message(_));
                if tx.send(event).await.is_err() || last {
                    break;
                }
            }
            let _ = socket.close(None).await;
            debug!(target: "transport", dashboard = %kind, "Push socket released");
        });

        Ok(rx)
    }
}
