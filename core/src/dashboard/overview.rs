use super::threats::ThreatRecord;
use super::versioned::Versioned;
use super::{DashboardKind, DashboardModel};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamedCount {
    pub name: String,
    pub count: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MitreCount {
    pub mitre_id: String,
    pub count: u64,
}

/// Headline counters of the overview page
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stats {
    pub total_logs: u64,
    pub total_analyzed: u64,
    pub attacks_detected: u64,
    pub high_risk_attacks: u64,
    pub attack_types: Vec<NamedCount>,
    pub top_mitre_ids: Vec<MitreCount>,
    pub top_3_attacks: Vec<NamedCount>,
}

/// Latest attack forecast
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Forecast {
    pub id: u64,
    pub attack_type: String,
    pub confidence: f64,
    pub expected_time: String,
    pub target_ip: String,
    pub reasoning: String,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct OverviewState {
    pub stats: Versioned<Stats>,
    pub user_count: Versioned<u64>,
    pub recent_logs: Versioned<Vec<ThreatRecord>>,
    pub forecast: Versioned<Forecast>,
}

pub struct OverviewModel;

impl DashboardModel for OverviewModel {
    type State = OverviewState;

    fn kind(&self) -> DashboardKind {
        DashboardKind::Overview
    }

    fn initial_state(&self) -> OverviewState {
        OverviewState::default()
    }

    fn apply(&self, state: &mut OverviewState, fields: &Map<String, Value>, version: u64) -> usize {
        [
            state.stats.offer_field(fields, "stats", version),
            state.user_count.offer_field(fields, "userCount", version),
            state.recent_logs.offer_field(fields, "recentLogs", version),
            state.forecast.offer_field(fields, "forecast", version),
        ]
        .into_iter()
        .filter(|applied| *applied)
        .count()
    }
}
