use super::{DashboardKind, DashboardModel, ReconcileError};
use crate::series::{KeyedSeries, RateSeries, SlidingWindow};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuFrequency {
    pub current: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuInfo {
    pub percent: f64,
    #[serde(default)]
    pub count_logical: Option<u32>,
    #[serde(default)]
    pub count_physical: Option<u32>,
    #[serde(default)]
    pub freq: Option<CpuFrequency>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryInfo {
    pub percent: f64,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub used: Option<u64>,
    #[serde(default)]
    pub available: Option<u64>,
    #[serde(default)]
    pub free: Option<u64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskInfo {
    pub percent: f64,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub used: Option<u64>,
    #[serde(default)]
    pub free: Option<u64>,
}

/// Cumulative interface counters
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkTotals {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TemperatureReading {
    #[serde(default)]
    pub label: String,
    pub current: f64,
}

/// One `/system/metrics` sample
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SystemMetricsSample {
    pub cpu: CpuInfo,
    pub memory: MemoryInfo,
    pub disk: DiskInfo,
    pub net: NetworkTotals,
    /// Sensor name → readings
    #[serde(default)]
    pub temperatures: Option<BTreeMap<String, Vec<TemperatureReading>>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemperatureStatus {
    Normal,
    Warm,
    Hot,
}

impl TemperatureStatus {
    pub fn from_celsius(celsius: f64) -> Self {
        if celsius > 80.0 {
            TemperatureStatus::Hot
        } else if celsius > 60.0 {
            TemperatureStatus::Warm
        } else {
            TemperatureStatus::Normal
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct SystemMetricsState {
    interval_secs: f64,
    pub cpu: SlidingWindow,
    pub memory: SlidingWindow,
    pub disk: SlidingWindow,
    pub net_sent: RateSeries,
    pub net_recv: RateSeries,
    pub temperatures: KeyedSeries,
    /// Latest sample, for the info panels
    pub latest: Option<SystemMetricsSample>,
}

impl SystemMetricsState {
    pub fn new(capacity: usize, interval_secs: f64) -> Self {
        Self {
            interval_secs,
            cpu: SlidingWindow::new(capacity),
            memory: SlidingWindow::new(capacity),
            disk: SlidingWindow::new(capacity),
            net_sent: RateSeries::new(interval_secs, capacity),
            net_recv: RateSeries::new(interval_secs, capacity),
            temperatures: KeyedSeries::new(capacity),
            latest: None,
        }
    }

    /// X-axis labels for the utilisation charts
    pub fn time_labels(&self) -> Vec<String> {
        self.cpu.time_labels(self.interval_secs)
    }

    /// Status of one temperature series, from its latest reading
    pub fn temperature_status(&self, key: &str) -> Option<TemperatureStatus> {
        self.temperatures
            .get(key)
            .and_then(|window| window.latest())
            .map(TemperatureStatus::from_celsius)
    }

    fn fold(&mut self, sample: SystemMetricsSample) {
        self.cpu.push(sample.cpu.percent);
        self.memory.push(sample.memory.percent);
        self.disk.push(sample.disk.percent);
        self.net_sent.observe(sample.net.bytes_sent);
        self.net_recv.observe(sample.net.bytes_recv);

        if let Some(sensors) = &sample.temperatures {
            for (sensor, readings) in sensors {
                for reading in readings {
                    let key = if reading.label.is_empty() {
                        sensor.as_str()
                    } else {
                        reading.label.as_str()
                    };
                    self.temperatures.observe(key, reading.current);
                }
            }
        }

        self.latest = Some(sample);
    }
}

/// Poll-driven host metrics dashboard
pub struct SystemMetricsModel {
    capacity: usize,
    interval_secs: f64,
}

impl SystemMetricsModel {
    pub fn new(capacity: usize, interval_secs: f64) -> Self {
        Self {
            capacity,
            interval_secs,
        }
    }
}

impl DashboardModel for SystemMetricsModel {
    type State = SystemMetricsState;

    fn kind(&self) -> DashboardKind {
        DashboardKind::SystemMetrics
    }

    fn initial_state(&self) -> SystemMetricsState {
        SystemMetricsState::new(self.capacity, self.interval_secs)
    }

    fn apply(&self, _state: &mut SystemMetricsState, _fields: &Map<String, Value>, _version: u64) -> usize {
        0
    }

    fn poll(&self, state: &mut SystemMetricsState, sample: Value) -> Result<(), ReconcileError> {
        let sample: SystemMetricsSample = serde_json::from_value(sample)?;
        state.fold(sample);
        Ok(())
    }

    fn poll_missed(&self, state: &mut SystemMetricsState) {
        state.net_sent.skip();
        state.net_recv.skip();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample(cpu: f64, sent: u64, temps: Value) -> Value {
        json!({
            "cpu": {"percent": cpu, "count_logical": 8, "freq": {"current": 2400.0, "max": 3600.0}},
            "memory": {"percent": 40.0, "total": 16_000_000_000u64},
            "disk": {"percent": 70.0},
            "net": {"bytes_sent": sent, "bytes_recv": 0},
            "temperatures": temps,
        })
    }

    #[test]
    fn poll_folds_windows_and_rates() {
        let model = SystemMetricsModel::new(60, 2.0);
        let mut state = model.initial_state();
        model.poll(&mut state, sample(10.0, 100, Value::Null)).unwrap();
        model.poll(&mut state, sample(20.0, 150, Value::Null)).unwrap();

        assert_eq!(state.cpu.values(), vec![10.0, 20.0]);
        assert_eq!(state.net_sent.values(), vec![25.0]);
        assert_eq!(state.time_labels(), vec!["0s", "2s"]);
        assert_eq!(state.latest.as_ref().map(|s| s.cpu.percent), Some(20.0));
    }

    #[test]
    fn temperatures_key_by_label_then_sensor() {
        let model = SystemMetricsModel::new(60, 2.0);
        let mut state = model.initial_state();
        let temps = json!({
            "coretemp": [{"label": "Core 0", "current": 85.0}, {"label": "", "current": 55.0}],
        });
        model.poll(&mut state, sample(1.0, 0, temps)).unwrap();

        assert_eq!(state.temperatures.keys(), vec!["Core 0", "coretemp"]);
        assert_eq!(state.temperature_status("Core 0"), Some(TemperatureStatus::Hot));
        assert_eq!(state.temperature_status("coretemp"), Some(TemperatureStatus::Normal));
    }

    #[test]
    fn malformed_sample_leaves_state_untouched() {
        let model = SystemMetricsModel::new(60, 2.0);
        let mut state = model.initial_state();
        assert!(model.poll(&mut state, json!({"cpu": "busy"})).is_err());
        assert!(state.cpu.is_empty());
    }

    #[test]
    fn temperature_bands() {
        assert_eq!(TemperatureStatus::from_celsius(80.0), TemperatureStatus::Warm);
        assert_eq!(TemperatureStatus::from_celsius(60.0), TemperatureStatus::Normal);
        assert_eq!(TemperatureStatus::from_celsius(80.5), TemperatureStatus::Hot);
    }
}
