use crate::series::SlidingWindow;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Open-ended set of named sub-series, one window per key
///
/// Keys appear on first observation and stay for the lifetime of the
/// aggregator, even when later updates stop mentioning them.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct KeyedSeries {
    capacity: usize,
    series: HashMap<String, SlidingWindow>,
}

impl KeyedSeries {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            series: HashMap::new(),
        }
    }

    /// Push `value` into the window for `key`, creating it if needed
    pub fn observe(&mut self, key: &str, value: f64) {
        let capacity = self.capacity;
        self.series
            .entry(key.to_string())
            .or_insert_with(|| {
                debug!(target: "series", key = %key, "New keyed series");
                SlidingWindow::new(capacity)
            })
            .push(value);
    }

    /// Current values of every key seen so far, ordered by key
    pub fn snapshot(&self) -> BTreeMap<String, Vec<f64>> {
        self.series
            .iter()
            .map(|(key, window)| (key.clone(), window.values()))
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<&SlidingWindow> {
        self.series.get(key)
    }

    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.series.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

impl Default for KeyedSeries {
    fn default() -> Self {
        Self::new(crate::series::DEFAULT_WINDOW)
    }
}
