//! Authorization Gate Tests
//!
//! - Decision table over session/role combinations
//! - Reactive re-evaluation on login, logout and expiry
//! - View registry, navigation and landing views

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use luminaris_core::gate::{evaluate, landing_view, navigation};
use luminaris_core::session::Clock;
use luminaris_core::{
    AuthorizationGate, CapabilityRequirement, GateDecision, MemoryStorage, Role, Session,
    SessionStore, View,
};
use serde_json::json;
use std::sync::{Arc, Mutex};

fn session(role: &str, exp: DateTime<Utc>) -> Session {
    let claims = json!({"role": role, "company_id": "1", "exp": exp.timestamp()});
    let token = format!("h.{}.s", URL_SAFE_NO_PAD.encode(claims.to_string()));
    Session::from_token(token, "bob".into(), "Acme".into()).expect("valid token")
}

fn live(role: &str) -> Session {
    session(role, Utc::now() + ChronoDuration::hours(1))
}

struct TestClock(Mutex<DateTime<Utc>>);

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

// =============================================================================
// Decision table
// =============================================================================

#[test]
fn no_session_redirects_to_login() {
    let req = CapabilityRequirement::roles([Role::Admin]);
    assert_eq!(evaluate(None, &req), GateDecision::RedirectToLogin);
    assert_eq!(
        evaluate(None, &CapabilityRequirement::any()),
        GateDecision::RedirectToLogin
    );
}

#[test]
fn role_outside_requirement_is_unauthorized() {
    let viewer = live("VIEWER");
    let decision = evaluate(Some(&viewer), &View::Threats.requirement());
    assert_eq!(decision, GateDecision::RedirectToUnauthorized);
    assert_eq!(decision.redirect_target(), Some(View::Unauthorized));
}

#[test]
fn role_inside_requirement_renders() {
    let analyst = live("ANALYST");
    assert_eq!(
        evaluate(Some(&analyst), &View::Threats.requirement()),
        GateDecision::Render
    );
    assert_eq!(GateDecision::Render.redirect_target(), None);
}

#[test]
fn super_admin_is_not_an_admin() {
    let root = live("SUPER_ADMIN");
    assert_eq!(
        evaluate(Some(&root), &View::Dashboard.requirement()),
        GateDecision::RedirectToUnauthorized
    );
    assert_eq!(
        evaluate(Some(&root), &View::SuperAdminCompany("9".into()).requirement()),
        GateDecision::Render
    );
}

#[test]
fn unknown_role_only_passes_open_requirements() {
    let guest = live("AUDITOR");
    assert_eq!(guest.role, Role::Other("AUDITOR".into()));
    assert_eq!(
        evaluate(Some(&guest), &CapabilityRequirement::any()),
        GateDecision::Render
    );
    assert_eq!(
        evaluate(Some(&guest), &View::Settings.requirement()),
        GateDecision::RedirectToUnauthorized
    );
}

#[test]
fn requirement_deduplicates_in_order() {
    let req = CapabilityRequirement::roles([Role::Admin, Role::Viewer, Role::Admin]);
    assert_eq!(req.as_slice(), &[Role::Admin, Role::Viewer]);
    assert!(!req.is_empty());
}

#[test]
fn deserialized_requirement_is_deduplicated() {
    let req: CapabilityRequirement =
        serde_json::from_value(json!(["ANALYST", "ADMIN", "ANALYST"])).unwrap();
    assert_eq!(req.as_slice(), &[Role::Analyst, Role::Admin]);
    assert_eq!(serde_json::to_value(&req).unwrap(), json!(["ANALYST", "ADMIN"]));
}

// =============================================================================
// Reactive gate
// =============================================================================

#[tokio::test]
async fn gate_follows_login_and_logout() {
    let store = SessionStore::new(Arc::new(MemoryStorage::new()));
    let gate = AuthorizationGate::for_view(&store, View::Reports);
    assert_eq!(gate.decision(), GateDecision::RedirectToLogin);

    store.set(live("ANALYST")).unwrap();
    assert_eq!(gate.decision(), GateDecision::Render);

    store.logout();
    assert_eq!(gate.decision(), GateDecision::RedirectToLogin);
}

#[tokio::test]
async fn gate_reflects_role_changes() {
    let store = SessionStore::new(Arc::new(MemoryStorage::new()));
    store.set(live("ADMIN")).unwrap();
    let gate = AuthorizationGate::for_view(&store, View::Admin);
    assert_eq!(gate.decision(), GateDecision::Render);

    store.set(live("VIEWER")).unwrap();
    assert_eq!(gate.decision(), GateDecision::RedirectToUnauthorized);
}

#[tokio::test]
async fn gate_flips_when_session_expires() {
    let now = Utc::now();
    let clock = Arc::new(TestClock(Mutex::new(now)));
    let store = SessionStore::with_clock(Arc::new(MemoryStorage::new()), clock.clone());
    store
        .set(session("ANALYST", now + ChronoDuration::seconds(10)))
        .unwrap();

    let gate = AuthorizationGate::for_view(&store, View::Analytics);
    let mut decisions = gate.subscribe();
    assert_eq!(gate.decision(), GateDecision::Render);

    *clock.0.lock().unwrap() = now + ChronoDuration::seconds(11);
    assert!(store.expire_if_stale());
    assert_eq!(gate.decision(), GateDecision::RedirectToLogin);
    assert!(decisions.has_changed().unwrap());
    assert_eq!(*decisions.borrow_and_update(), GateDecision::RedirectToLogin);
}

#[tokio::test]
async fn lapsed_session_redirects_without_an_expiry_sweep() {
    let now = Utc::now();
    let clock = Arc::new(TestClock(Mutex::new(now)));
    let store = SessionStore::with_clock(Arc::new(MemoryStorage::new()), clock.clone());
    store
        .set(session("ANALYST", now + ChronoDuration::seconds(10)))
        .unwrap();

    let gate = AuthorizationGate::for_view(&store, View::Analytics);
    let decisions = gate.subscribe();
    assert_eq!(gate.decision(), GateDecision::Render);

    *clock.0.lock().unwrap() = now + ChronoDuration::seconds(11);
    assert!(store.current().is_none());
    assert_eq!(gate.decision(), GateDecision::RedirectToLogin);
    assert_eq!(*decisions.borrow(), GateDecision::RedirectToLogin);
}

#[tokio::test]
async fn gate_with_explicit_requirement() {
    let store = SessionStore::new(Arc::new(MemoryStorage::new()));
    store.set(live("VIEWER")).unwrap();
    let gate = AuthorizationGate::attach(&store, View::Settings, CapabilityRequirement::any());
    assert_eq!(gate.decision(), GateDecision::Render);
    assert!(gate.requirement().is_empty());
    assert_eq!(gate.view(), &View::Settings);
}

#[tokio::test]
async fn dropped_gate_does_not_block_store() {
    let store = SessionStore::new(Arc::new(MemoryStorage::new()));
    let gate = AuthorizationGate::for_view(&store, View::Dashboard);
    drop(gate);
    store.set(live("ANALYST")).unwrap();
    store.clear();
}

// =============================================================================
// View registry
// =============================================================================

#[test]
fn paths_resolve_including_parameters() {
    assert_eq!(View::from_path("/"), Some(View::Home));
    assert_eq!(View::from_path("/threats/42"), Some(View::ThreatDetail("42".into())));
    assert_eq!(View::from_path("/settings/login-history"), Some(View::LoginHistory));
    assert_eq!(
        View::from_path("/superadmin/company/3/"),
        Some(View::SuperAdminCompany("3".into()))
    );
    assert_eq!(View::from_path("/nope"), None);
    assert_eq!(View::from_path("dashboard"), None);
    assert_eq!(View::from_path(""), None);
    assert_eq!(View::from_path("/dashboard/"), Some(View::Dashboard));
    assert_eq!(View::ThreatDetail("42".into()).path(), "/threats/42");
}

#[test]
fn public_views_are_unprotected() {
    assert!(!View::Home.is_protected());
    assert!(!View::Login.is_protected());
    assert!(!View::Unauthorized.is_protected());
    assert!(View::ForecastHistory.is_protected());
}

#[test]
fn navigation_depends_on_role() {
    assert_eq!(
        navigation(&Role::Viewer),
        vec![View::Dashboard, View::Analytics, View::Settings]
    );
    assert_eq!(
        navigation(&Role::Analyst),
        vec![
            View::Dashboard,
            View::Threats,
            View::Analytics,
            View::Forecast,
            View::Reports,
            View::Settings,
        ]
    );
    assert_eq!(navigation(&Role::Admin).len(), 7);
    assert!(navigation(&Role::SuperAdmin).is_empty());
}

#[test]
fn landing_views_per_role() {
    assert_eq!(landing_view("SUPER_ADMIN"), View::SuperAdmin);
    assert_eq!(landing_view("ADMIN"), View::Admin);
    assert_eq!(landing_view("ANALYST"), View::Dashboard);
    assert_eq!(landing_view("VIEWER"), View::Dashboard);
    assert_eq!(landing_view("INTERN"), View::Home);
}
