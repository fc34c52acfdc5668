// View registry
//
// Every page of the console, its path and the roles allowed to open it.

use crate::gate::CapabilityRequirement;
use crate::session::Role;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    Home,
    Login,
    Unauthorized,
    Dashboard,
    Analytics,
    Threats,
    ThreatDetail(String),
    Forecast,
    ForecastHistory,
    Reports,
    Settings,
    LoginHistory,
    Admin,
    SuperAdmin,
    SuperAdminCompany(String),
}

/// Sidebar order
const NAVIGATION: [View; 7] = [
    View::Dashboard,
    View::Threats,
    View::Analytics,
    View::Forecast,
    View::Reports,
    View::Admin,
    View::Settings,
];

impl View {
    pub fn path(&self) -> String {
        match self {
            View::Home => "/".into(),
            View::Login => "/login".into(),
            View::Unauthorized => "/unauthorized".into(),
            View::Dashboard => "/dashboard".into(),
            View::Analytics => "/analytics".into(),
            View::Threats => "/threats".into(),
            View::ThreatDetail(id) => format!("/threats/{}", id),
            View::Forecast => "/forecast".into(),
            View::ForecastHistory => "/forecast/history".into(),
            View::Reports => "/reports".into(),
            View::Settings => "/settings".into(),
            View::LoginHistory => "/settings/login-history".into(),
            View::Admin => "/admin".into(),
            View::SuperAdmin => "/superadmin".into(),
            View::SuperAdminCompany(id) => format!("/superadmin/company/{}", id),
        }
    }

    /// Resolve an absolute path, including parameterised ones
    pub fn from_path(path: &str) -> Option<View> {
        let trimmed = path.strip_prefix('/')?.trim_end_matches('/');
        let segments: Vec<&str> = if trimmed.is_empty() {
            Vec::new()
        } else {
            trimmed.split('/').collect()
        };
        let view = match segments.as_slice() {
            [] => View::Home,
            ["login"] => View::Login,
            ["unauthorized"] => View::Unauthorized,
            ["dashboard"] => View::Dashboard,
            ["analytics"] => View::Analytics,
            ["threats"] => View::Threats,
            ["threats", id] if !id.is_empty() => View::ThreatDetail((*id).to_string()),
            ["forecast"] => View::Forecast,
            ["forecast", "history"] => View::ForecastHistory,
            ["reports"] => View::Reports,
            ["settings"] => View::Settings,
            ["settings", "login-history"] => View::LoginHistory,
            ["admin"] => View::Admin,
            ["superadmin"] => View::SuperAdmin,
            ["superadmin", "company", id] if !id.is_empty() => {
                View::SuperAdminCompany((*id).to_string())
            }
            _ => return None,
        };
        Some(view)
    }

    /// Whether the view needs a session at all
    pub fn is_protected(&self) -> bool {
        !matches!(self, View::Home | View::Login | View::Unauthorized)
    }

    /// Roles allowed to open the view; empty for public views
    pub fn requirement(&self) -> CapabilityRequirement {
        use Role::*;
        match self {
            View::Home | View::Login | View::Unauthorized => CapabilityRequirement::any(),
            View::Dashboard | View::Analytics => {
                CapabilityRequirement::roles([Analyst, Viewer, Admin])
            }
            View::Settings => CapabilityRequirement::roles([Admin, Analyst, Viewer]),
            View::Threats
            | View::ThreatDetail(_)
            | View::Forecast
            | View::ForecastHistory
            | View::Reports
            | View::LoginHistory => CapabilityRequirement::roles([Admin, Analyst]),
            View::Admin => CapabilityRequirement::roles([Admin]),
            View::SuperAdmin | View::SuperAdminCompany(_) => {
                CapabilityRequirement::roles([SuperAdmin])
            }
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Sidebar entries visible to `role`
pub fn navigation(role: &Role) -> Vec<View> {
    NAVIGATION
        .iter()
        .filter(|view| view.requirement().allows(role))
        .cloned()
        .collect()
}

/// Post-login destination for a raw role string
pub fn landing_view(role: &str) -> View {
    Role::from(role.to_string()).landing_view()
}
