use super::versioned::Versioned;
use super::{DashboardKind, DashboardModel};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// One analyzed log entry
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreatRecord {
    pub id: u64,
    pub ip: String,
    pub log_text: Option<String>,
    pub attack_type: String,
    pub mitre_id: Option<String>,
    /// Model confidence, 0..=100
    pub probability: f64,
    pub recommendation: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub severity_windows: Option<String>,
    pub severity_syslog: Option<String>,
    pub timestamp: String,
    pub status: String,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<String>,
}

impl ThreatRecord {
    pub fn level(&self) -> ThreatLevel {
        ThreatLevel::from_probability(self.probability)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl ThreatLevel {
    pub fn from_probability(probability: f64) -> Self {
        if probability >= 80.0 {
            ThreatLevel::Critical
        } else if probability >= 60.0 {
            ThreatLevel::High
        } else if probability >= 40.0 {
            ThreatLevel::Medium
        } else {
            ThreatLevel::Low
        }
    }
}

/// Attack type / status filter; `None` matches everything
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatFilter {
    pub attack_type: Option<String>,
    pub status: Option<String>,
}

impl ThreatFilter {
    pub fn matches(&self, record: &ThreatRecord) -> bool {
        self.attack_type
            .as_deref()
            .map_or(true, |t| record.attack_type == t)
            && self.status.as_deref().map_or(true, |s| record.status == s)
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct ThreatsState {
    pub threats: Versioned<Vec<ThreatRecord>>,
}

impl ThreatsState {
    pub fn filtered(&self, filter: &ThreatFilter) -> Vec<&ThreatRecord> {
        self.threats
            .get()
            .map(|all| all.iter().filter(|r| filter.matches(r)).collect())
            .unwrap_or_default()
    }

    /// Distinct attack types, for the filter picker
    pub fn attack_types(&self) -> BTreeSet<&str> {
        self.threats
            .get()
            .map(|all| all.iter().map(|r| r.attack_type.as_str()).collect())
            .unwrap_or_default()
    }
}

pub struct ThreatsModel;

impl DashboardModel for ThreatsModel {
    type State = ThreatsState;

    fn kind(&self) -> DashboardKind {
        DashboardKind::Threats
    }

    fn initial_state(&self) -> ThreatsState {
        ThreatsState::default()
    }

    fn apply(&self, state: &mut ThreatsState, fields: &Map<String, Value>, version: u64) -> usize {
        usize::from(state.threats.offer_field(fields, "threats", version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_follow_probability_bands() {
        assert_eq!(ThreatLevel::from_probability(80.0), ThreatLevel::Critical);
        assert_eq!(ThreatLevel::from_probability(79.9), ThreatLevel::High);
        assert_eq!(ThreatLevel::from_probability(60.0), ThreatLevel::High);
        assert_eq!(ThreatLevel::from_probability(40.0), ThreatLevel::Medium);
        assert_eq!(ThreatLevel::from_probability(12.0), ThreatLevel::Low);
    }

    #[test]
    fn filter_combines_type_and_status() {
        let record = ThreatRecord {
            attack_type: "SQL Injection".into(),
            status: "active".into(),
            ..Default::default()
        };
        assert!(ThreatFilter::default().matches(&record));
        let by_type = ThreatFilter {
            attack_type: Some("SQL Injection".into()),
            status: None,
        };
        assert!(by_type.matches(&record));
        let both = ThreatFilter {
            status: Some("resolved".into()),
            ..by_type
        };
        assert!(!both.matches(&record));
    }
}
