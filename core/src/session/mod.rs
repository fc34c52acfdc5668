//! Session store
//!
//! Holds the operator's session (token, username, role, tenant) and its
//! validity. The store is constructed explicitly and handed to whoever needs
//! it; nothing reads durable storage behind its back.
//!
//! - `load()` rehydrates from storage; any missing entry, undecodable token,
//!   past expiry or role/tenant entry that disagrees with the token's claims
//!   yields "no session" and wipes what was stored.
//! - `set()` persists every field in one batch, after checking the session
//!   against its own token.
//! - `clear()` wipes storage; calling it twice is harmless.
//! - `current()` is a pure read and treats an expired session as absent.
//!
//! Listeners registered with [`SessionStore::register`] are notified
//! synchronously after every change.

mod auth;
mod token;

pub use auth::{AuthClient, Profile};
pub use token::{TokenClaims, TokenError};

use crate::gate::View;
use crate::storage::SessionStorage;
use crate::{LuminarisError, Result};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub(crate) const KEY_TOKEN: &str = "token";
pub(crate) const KEY_USERNAME: &str = "username";
pub(crate) const KEY_ROLE: &str = "role";
pub(crate) const KEY_TENANT_ID: &str = "companyId";
pub(crate) const KEY_TENANT_NAME: &str = "companyName";

const ALL_KEYS: [&str; 5] = [
    KEY_TOKEN,
    KEY_USERNAME,
    KEY_ROLE,
    KEY_TENANT_ID,
    KEY_TENANT_NAME,
];

/// Operator role
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Role {
    SuperAdmin,
    Admin,
    Analyst,
    Viewer,
    /// A role string the console does not know; it satisfies no requirement
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::SuperAdmin => "SUPER_ADMIN",
            Role::Admin => "ADMIN",
            Role::Analyst => "ANALYST",
            Role::Viewer => "VIEWER",
            Role::Other(raw) => raw.as_str(),
        }
    }

    /// Destination after a successful login
    pub fn landing_view(&self) -> View {
        match self {
            Role::SuperAdmin => View::SuperAdmin,
            Role::Admin => View::Admin,
            Role::Analyst | Role::Viewer => View::Dashboard,
            Role::Other(_) => View::Home,
        }
    }
}

impl FromStr for Role {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "SUPER_ADMIN" => Role::SuperAdmin,
            "ADMIN" => Role::Admin,
            "ANALYST" => Role::Analyst,
            "VIEWER" => Role::Viewer,
            other => Role::Other(other.to_string()),
        })
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        match Role::from_str(&s) {
            Ok(role) => role,
            Err(never) => match never {},
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An authenticated operator session
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub username: String,
    pub role: Role,
    pub tenant_id: String,
    pub tenant_name: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Build a session from a freshly issued token
    pub fn from_token(token: String, username: String, tenant_name: String) -> Result<Self> {
        let claims = TokenClaims::decode(&token)?;
        let expires_at = claims.expires_at()?;
        Ok(Self {
            role: Role::from(claims.role),
            tenant_id: claims.company_id,
            token,
            username,
            tenant_name,
            expires_at,
        })
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Role, tenant and expiry must be the ones the token carries
    fn check_claims(&self) -> Result<()> {
        let claims = TokenClaims::decode(&self.token)?;
        if Role::from(claims.role.clone()) != self.role {
            return Err(LuminarisError::SessionError(format!(
                "role {} disagrees with token role {}",
                self.role, claims.role
            )));
        }
        if claims.company_id != self.tenant_id {
            return Err(LuminarisError::SessionError(format!(
                "tenant {} disagrees with token tenant {}",
                self.tenant_id, claims.company_id
            )));
        }
        if claims.expires_at()? != self.expires_at {
            return Err(LuminarisError::SessionError(
                "expiry disagrees with token".into(),
            ));
        }
        Ok(())
    }
}

/// Wall clock used for expiry checks
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// System time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Observer of session changes
pub trait SessionListener: Send + Sync {
    fn session_changed(&self, session: Option<&Session>);
}

/// Registration handle returned by [`SessionStore::register`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Process-wide session holder with explicit lifecycle
pub struct SessionStore {
    storage: Arc<dyn SessionStorage>,
    clock: Arc<dyn Clock>,
    session: watch::Sender<Option<Session>>,
    listeners: DashMap<ListenerId, Weak<dyn SessionListener>>,
    next_listener: AtomicU64,
}

impl SessionStore {
    /// Create an empty store; call [`load`](Self::load) to rehydrate
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self::with_clock(storage, Arc::new(SystemClock))
    }

    pub fn with_clock(storage: Arc<dyn SessionStorage>, clock: Arc<dyn Clock>) -> Self {
        let (session, _) = watch::channel(None);
        Self {
            storage,
            clock,
            session,
            listeners: DashMap::new(),
            next_listener: AtomicU64::new(1),
        }
    }

    /// Create a store and rehydrate it in one step
    pub fn open(storage: Arc<dyn SessionStorage>) -> Arc<Self> {
        let store = Arc::new(Self::new(storage));
        store.load();
        store
    }

    /// Rehydrate from durable storage
    ///
    /// Never fails: anything unusable becomes "no session" and the stored
    /// material is removed.
    pub fn load(&self) -> Option<Session> {
        let loaded = match self.read_persisted() {
            Ok(Some(session)) if !session.is_expired_at(self.clock.now()) => Some(session),
            Ok(Some(session)) => {
                info!(target: "session", username = %session.username, "Stored session expired");
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!(target: "session", error = %e, "Discarding unreadable stored session");
                None
            }
        };

        if loaded.is_none() {
            self.wipe_storage();
        }
        self.replace(loaded.clone());
        loaded
    }

    /// Persist a session after a successful credential exchange
    pub fn set(&self, session: Session) -> Result<()> {
        session.check_claims()?;
        if session.is_expired_at(self.clock.now()) {
            return Err(LuminarisError::SessionError(
                "refusing to store an expired session".into(),
            ));
        }

        let role = session.role.to_string();
        self.storage.write_all(&[
            (KEY_TOKEN, session.token.as_str()),
            (KEY_USERNAME, session.username.as_str()),
            (KEY_ROLE, role.as_str()),
            (KEY_TENANT_ID, session.tenant_id.as_str()),
            (KEY_TENANT_NAME, session.tenant_name.as_str()),
        ])?;

        info!(
            target: "session",
            username = %session.username,
            role = %session.role,
            tenant = %session.tenant_id,
            "Session stored"
        );
        self.replace(Some(session));
        Ok(())
    }

    /// Remove all session material
    pub fn clear(&self) {
        self.wipe_storage();
        if self.session.borrow().is_some() {
            info!(target: "session", "Session cleared");
        }
        self.replace(None);
    }

    /// The trusted session, if any
    pub fn current(&self) -> Option<Session> {
        let now = self.clock.now();
        self.session
            .borrow()
            .as_ref()
            .filter(|s| !s.is_expired_at(now))
            .cloned()
    }

    /// Exchange credentials for a session and persist it
    pub async fn login(
        &self,
        client: &dyn AuthClient,
        username: &str,
        password: &str,
    ) -> Result<Session> {
        let token = client.exchange(username, password).await.map_err(|e| {
            warn!(target: "session", username = %username, error = %e, "Login failed");
            e
        })?;
        let profile = client.profile(&token).await?;
        let session = Session::from_token(token, username.to_string(), profile.company_name)?;
        self.set(session.clone())?;
        Ok(session)
    }

    /// Drop the session
    pub fn logout(&self) {
        self.clear();
    }

    /// Clear the session if it has expired; returns whether it did
    pub fn expire_if_stale(&self) -> bool {
        let expired = self
            .session
            .borrow()
            .as_ref()
            .is_some_and(|s| s.is_expired_at(self.clock.now()));
        if expired {
            info!(target: "session", "Session expired");
            self.clear();
        }
        expired
    }

    /// Wake at the session's expiry (or every `period`) and clear it when due
    pub fn watch_expiry(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let store = Arc::downgrade(self);
        tokio::spawn(async move {
            loop {
                let wait = match store.upgrade() {
                    Some(store) => store.time_to_expiry().map_or(period, |d| d.min(period)),
                    None => break,
                };
                tokio::time::sleep(wait).await;
                match store.upgrade() {
                    Some(store) => {
                        store.expire_if_stale();
                    }
                    None => break,
                }
            }
        })
    }

    /// Register a listener; it is held weakly and pruned once dropped
    pub fn register(&self, listener: Weak<dyn SessionListener>) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners.insert(id, listener);
        id
    }

    pub fn unregister(&self, id: ListenerId) {
        self.listeners.remove(&id);
    }

    /// Async view of session changes
    ///
    /// The channel carries the stored session; compare `expires_at` against
    /// [`clock`](Self::clock) before trusting it.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.session.subscribe()
    }

    /// Clock used for every expiry check
    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    fn time_to_expiry(&self) -> Option<Duration> {
        let now = self.clock.now();
        self.session
            .borrow()
            .as_ref()
            .map(|s| (s.expires_at - now).to_std().unwrap_or(Duration::ZERO))
    }

    fn read_persisted(&self) -> Result<Option<Session>> {
        let mut values = Vec::with_capacity(ALL_KEYS.len());
        for key in ALL_KEYS {
            match self.storage.read(key)? {
                Some(value) if !value.is_empty() => values.push(value),
                _ => {
                    debug!(target: "session", key = %key, "Stored session incomplete");
                    return Ok(None);
                }
            }
        }

        let [token, username, role, tenant_id, tenant_name]: [String; 5] = values
            .try_into()
            .map_err(|_| LuminarisError::SessionError("stored session incomplete".into()))?;
        let session = Session::from_token(token, username, tenant_name)?;
        if Role::from(role) != session.role || tenant_id != session.tenant_id {
            return Err(LuminarisError::SessionError(
                "stored role or tenant disagrees with token claims".into(),
            ));
        }
        Ok(Some(session))
    }

    fn wipe_storage(&self) {
        if let Err(e) = self.storage.remove_all(&ALL_KEYS) {
            warn!(target: "session", error = %e, "Failed to remove stored session");
        }
    }

    fn replace(&self, session: Option<Session>) {
        self.session.send_replace(session.clone());
        self.notify(session.as_ref());
    }

    fn notify(&self, session: Option<&Session>) {
        // Collect first so no map shard is held while listeners run.
        let mut live = Vec::new();
        let mut dead = Vec::new();
        for entry in self.listeners.iter() {
            match entry.value().upgrade() {
                Some(listener) => live.push(listener),
                None => dead.push(*entry.key()),
            }
        }
        for id in dead {
            self.listeners.remove(&id);
        }
        for listener in live {
            listener.session_changed(session);
        }
    }
}
