use super::message::field;
use super::versioned::Versioned;
use super::{DashboardKind, DashboardModel};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Category → count mapping as charted
pub type Counts = BTreeMap<String, f64>;

/// A raw geolocation record; only the country matters here
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct GeoRecord {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Geography arrives either pre-counted or as raw records
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum GeoPayload {
    Counts(Counts),
    Records(Vec<GeoRecord>),
}

impl GeoPayload {
    /// Country → count; records without a country are skipped
    pub fn into_counts(self) -> Counts {
        match self {
            GeoPayload::Counts(counts) => counts,
            GeoPayload::Records(records) => {
                let mut counts = Counts::new();
                for country in records.into_iter().filter_map(|r| r.country) {
                    *counts.entry(country).or_insert(0.0) += 1.0;
                }
                counts
            }
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Severity {
    pub windows: Counts,
    pub syslog: Counts,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct AnalyticsState {
    /// Events per hour of day
    pub activity: Versioned<Vec<f64>>,
    pub geo: Versioned<Counts>,
    pub severity: Versioned<Severity>,
    pub attack_types: Versioned<Counts>,
    pub risk_levels: Versioned<Counts>,
    pub mitre_data: Versioned<Counts>,
}

pub struct AnalyticsModel;

impl DashboardModel for AnalyticsModel {
    type State = AnalyticsState;

    fn kind(&self) -> DashboardKind {
        DashboardKind::Analytics
    }

    fn initial_state(&self) -> AnalyticsState {
        AnalyticsState::default()
    }

    fn apply(&self, state: &mut AnalyticsState, fields: &Map<String, Value>, version: u64) -> usize {
        let geo = field::<GeoPayload>(fields, "geo")
            .map(|geo| state.geo.offer(geo.into_counts(), version))
            .unwrap_or(false);

        [
            state.activity.offer_field(fields, "activity", version),
            geo,
            state.severity.offer_field(fields, "severity", version),
            state.attack_types.offer_field(fields, "attack_types", version),
            state.risk_levels.offer_field(fields, "risk_levels", version),
            state.mitre_data.offer_field(fields, "mitre_data", version),
        ]
        .into_iter()
        .filter(|applied| *applied)
        .count()
    }
}
