use crate::series::SlidingWindow;
use serde::Serialize;
use tracing::debug;

/// Turns a monotonically increasing counter into a per-second rate
///
/// The first observation only primes the unit. A counter that goes backwards
/// (backend restart) primes it again instead of producing a negative rate.
/// Intervals reported missing with [`skip`](Self::skip) widen the divisor of
/// the next rate.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RateDeriver {
    interval_secs: f64,
    previous: Option<u64>,
    missed: u32,
}

impl RateDeriver {
    pub fn new(interval_secs: f64) -> Self {
        Self {
            interval_secs,
            previous: None,
            missed: 0,
        }
    }

    /// Feed the next counter value; returns a rate once two usable samples exist
    pub fn observe(&mut self, current: u64) -> Option<f64> {
        let intervals = 1 + std::mem::take(&mut self.missed);
        let previous = self.previous.replace(current)?;
        if current < previous {
            debug!(target: "series", previous, current, "Counter reset, resynchronizing");
            return None;
        }
        if self.interval_secs <= 0.0 {
            return None;
        }
        Some((current - previous) as f64 / (self.interval_secs * f64::from(intervals)))
    }

    /// Record an interval that produced no sample
    pub fn skip(&mut self) {
        if self.previous.is_some() {
            self.missed = self.missed.saturating_add(1);
        }
    }

    pub fn interval_secs(&self) -> f64 {
        self.interval_secs
    }

    /// Forget the retained sample
    pub fn reset(&mut self) {
        self.previous = None;
        self.missed = 0;
    }
}

/// A rate deriver feeding its own window
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RateSeries {
    deriver: RateDeriver,
    window: SlidingWindow,
}

impl RateSeries {
    pub fn new(interval_secs: f64, capacity: usize) -> Self {
        Self {
            deriver: RateDeriver::new(interval_secs),
            window: SlidingWindow::new(capacity),
        }
    }

    /// Observe a counter value, pushing the derived rate if there is one
    pub fn observe(&mut self, counter: u64) -> Option<f64> {
        let rate = self.deriver.observe(counter)?;
        self.window.push(rate);
        Some(rate)
    }

    /// Record an interval that produced no sample
    pub fn skip(&mut self) {
        self.deriver.skip();
    }

    pub fn window(&self) -> &SlidingWindow {
        &self.window
    }

    pub fn values(&self) -> Vec<f64> {
        self.window.values()
    }
}
