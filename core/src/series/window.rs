use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Samples kept per chart by default
pub const DEFAULT_WINDOW: usize = 60;

/// One scalar sample with its position in the series
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeriesSample {
    pub value: f64,
    pub sequence: u64,
}

/// Fixed-capacity buffer holding the most recent samples, oldest first
///
/// Serialize only: a window is always built through [`SlidingWindow::new`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SlidingWindow {
    capacity: usize,
    samples: VecDeque<SeriesSample>,
    next_sequence: u64,
}

impl SlidingWindow {
    /// Create a window; a capacity of zero is raised to one
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
            next_sequence: 0,
        }
    }

    /// Append a sample, evicting from the front past capacity
    pub fn push(&mut self, value: f64) {
        self.samples.push_back(SeriesSample {
            value,
            sequence: self.next_sequence,
        });
        self.next_sequence += 1;
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Values in chronological order
    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }

    pub fn samples(&self) -> impl Iterator<Item = &SeriesSample> {
        self.samples.iter()
    }

    pub fn latest(&self) -> Option<f64> {
        self.samples.back().map(|s| s.value)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total samples ever pushed
    pub fn pushed(&self) -> u64 {
        self.next_sequence
    }

    /// X-axis labels, one per held sample, spaced by `interval_secs`
    pub fn time_labels(&self, interval_secs: f64) -> Vec<String> {
        (0..self.samples.len())
            .map(|i| format!("{}s", i as f64 * interval_secs))
            .collect()
    }
}

impl Default for SlidingWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequences_keep_counting_after_eviction() {
        let mut w = SlidingWindow::new(2);
        for v in [1.0, 2.0, 3.0] {
            w.push(v);
        }
        let seqs: Vec<u64> = w.samples().map(|s| s.sequence).collect();
        assert_eq!(seqs, vec![1, 2]);
        assert_eq!(w.pushed(), 3);
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let mut w = SlidingWindow::new(0);
        w.push(5.0);
        w.push(6.0);
        assert_eq!(w.values(), vec![6.0]);
    }

    #[test]
    fn labels_follow_poll_spacing() {
        let mut w = SlidingWindow::new(4);
        w.push(0.0);
        w.push(0.0);
        w.push(0.0);
        assert_eq!(w.time_labels(2.0), vec!["0s", "2s", "4s"]);
    }
}
