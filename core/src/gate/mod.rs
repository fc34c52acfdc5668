// Authorization gate
//
// Wraps a protected view with the set of roles allowed to see it. The gate
// listens to the session store and recomputes its decision synchronously on
// every session change, so a logout or expiry flips it to a redirect before
// anything else can read the old decision. Reading the decision also checks
// the session's expiry against the store clock, so a session that lapses
// between notifications is already treated as absent.

mod views;

pub use views::{landing_view, navigation, View};

use crate::session::{Clock, Role, Session, SessionListener, SessionStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Ordered set of roles accepted by a view; empty means any session will do
///
/// (De)serializes as a plain role list, deduplicated on the way in.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Role>", into = "Vec<Role>")]
pub struct CapabilityRequirement {
    roles: Vec<Role>,
}

impl From<Vec<Role>> for CapabilityRequirement {
    fn from(roles: Vec<Role>) -> Self {
        Self::roles(roles)
    }
}

impl From<CapabilityRequirement> for Vec<Role> {
    fn from(requirement: CapabilityRequirement) -> Self {
        requirement.roles
    }
}

impl CapabilityRequirement {
    /// Any authenticated session
    pub fn any() -> Self {
        Self::default()
    }

    pub fn roles<I: IntoIterator<Item = Role>>(roles: I) -> Self {
        let mut ordered: Vec<Role> = Vec::new();
        for role in roles {
            if !ordered.contains(&role) {
                ordered.push(role);
            }
        }
        Self { roles: ordered }
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    pub fn allows(&self, role: &Role) -> bool {
        self.roles.is_empty() || self.roles.contains(role)
    }

    pub fn as_slice(&self) -> &[Role] {
        &self.roles
    }
}

/// What the presentation layer should do with a protected view
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateDecision {
    Render,
    RedirectToLogin,
    RedirectToUnauthorized,
}

impl GateDecision {
    /// Where to navigate instead of rendering
    pub fn redirect_target(&self) -> Option<View> {
        match self {
            GateDecision::Render => None,
            GateDecision::RedirectToLogin => Some(View::Login),
            GateDecision::RedirectToUnauthorized => Some(View::Unauthorized),
        }
    }
}

/// Pure decision function
pub fn evaluate(session: Option<&Session>, requirement: &CapabilityRequirement) -> GateDecision {
    match session {
        None => GateDecision::RedirectToLogin,
        Some(s) if !requirement.allows(&s.role) => GateDecision::RedirectToUnauthorized,
        Some(_) => GateDecision::Render,
    }
}

/// Reactive guard for one view
pub struct AuthorizationGate {
    view: View,
    requirement: CapabilityRequirement,
    clock: Arc<dyn Clock>,
    session: watch::Receiver<Option<Session>>,
    decision: watch::Sender<GateDecision>,
}

impl AuthorizationGate {
    /// Guard `view` with its registered requirement
    pub fn for_view(store: &SessionStore, view: View) -> Arc<Self> {
        let requirement = view.requirement();
        Self::attach(store, view, requirement)
    }

    /// Guard `view` with an explicit requirement and start listening
    pub fn attach(store: &SessionStore, view: View, requirement: CapabilityRequirement) -> Arc<Self> {
        let initial = evaluate(store.current().as_ref(), &requirement);
        let (decision, _) = watch::channel(initial);
        let gate = Arc::new(Self {
            view,
            requirement,
            clock: store.clock(),
            session: store.subscribe(),
            decision,
        });

        let listener: Arc<dyn SessionListener> = gate.clone();
        store.register(Arc::downgrade(&listener));
        gate
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn requirement(&self) -> &CapabilityRequirement {
        &self.requirement
    }

    /// Decision for the session as of now
    pub fn decision(&self) -> GateDecision {
        let session = self.session.borrow().clone();
        self.publish(session.as_ref())
    }

    /// Decision updates for async consumers
    pub fn subscribe(&self) -> watch::Receiver<GateDecision> {
        self.decision.subscribe()
    }

    fn publish(&self, session: Option<&Session>) -> GateDecision {
        let now = self.clock.now();
        let trusted = session.filter(|s| !s.is_expired_at(now));
        let next = evaluate(trusted, &self.requirement);
        let changed = self.decision.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next.clone();
            true
        });
        if changed {
            debug!(target: "gate", view = %self.view, decision = ?next, "Gate decision changed");
        }
        next
    }
}

impl SessionListener for AuthorizationGate {
    fn session_changed(&self, session: Option<&Session>) {
        self.publish(session);
    }
}
