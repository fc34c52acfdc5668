//! Series Tests
//!
//! - SlidingWindow: bounded, ordered retention
//! - RateDeriver / RateSeries: counter-to-rate conversion and resets
//! - KeyedSeries: open-ended per-key windows

use luminaris_core::{KeyedSeries, RateDeriver, RateSeries, SlidingWindow};

// =============================================================================
// SlidingWindow
// =============================================================================

#[test]
fn window_keeps_the_latest_capacity_samples() {
    let mut window = SlidingWindow::new(60);
    for i in 0..75 {
        window.push(i as f64);
    }

    assert_eq!(window.len(), 60);
    assert_eq!(window.pushed(), 75);
    let values = window.values();
    assert_eq!(values.first(), Some(&15.0));
    assert_eq!(values.last(), Some(&74.0));
    assert!(values.windows(2).all(|w| w[0] < w[1]), "arrival order preserved");
}

#[test]
fn window_under_capacity_keeps_everything() {
    let mut window = SlidingWindow::new(5);
    window.push(1.5);
    window.push(2.5);
    assert_eq!(window.values(), vec![1.5, 2.5]);
    assert_eq!(window.latest(), Some(2.5));
}

#[test]
fn zero_capacity_is_clamped() {
    let mut window = SlidingWindow::new(0);
    window.push(1.0);
    window.push(2.0);
    assert_eq!(window.capacity(), 1);
    assert_eq!(window.values(), vec![2.0]);
}

#[test]
fn samples_carry_arrival_sequence() {
    let mut window = SlidingWindow::new(2);
    window.push(10.0);
    window.push(20.0);
    window.push(30.0);
    let sequences: Vec<u64> = window.samples().map(|s| s.sequence).collect();
    assert_eq!(sequences, vec![1, 2]);
}

#[test]
fn time_labels_follow_interval() {
    let mut window = SlidingWindow::new(10);
    for v in [1.0, 2.0, 3.0] {
        window.push(v);
    }
    assert_eq!(window.time_labels(2.0), vec!["0s", "2s", "4s"]);
    assert!(SlidingWindow::default().time_labels(2.0).is_empty());
}

// =============================================================================
// Rates
// =============================================================================

#[test]
fn first_observation_only_primes() {
    let mut rate = RateDeriver::new(2.0);
    assert_eq!(rate.observe(1_000), None);
    assert_eq!(rate.observe(1_400), Some(200.0));
}

#[test]
fn counter_reset_resynchronizes() {
    let mut series = RateSeries::new(2.0, 60);
    for counter in [100, 150, 130] {
        series.observe(counter);
    }
    assert_eq!(series.values(), vec![25.0]);

    series.observe(170);
    assert_eq!(series.values(), vec![25.0, 20.0]);
}

#[test]
fn flat_counter_is_zero_rate() {
    let mut rate = RateDeriver::new(2.0);
    rate.observe(500);
    assert_eq!(rate.observe(500), Some(0.0));
}

#[test]
fn reset_forgets_previous_sample() {
    let mut rate = RateDeriver::new(1.0);
    rate.observe(10);
    rate.reset();
    assert_eq!(rate.observe(50), None);
    assert_eq!(rate.observe(60), Some(10.0));
}

#[test]
fn missed_intervals_widen_the_next_rate() {
    let mut series = RateSeries::new(2.0, 60);
    series.observe(1_000);
    series.skip();
    series.skip();
    assert_eq!(series.observe(1_600), Some(100.0));

    // Back to single-interval spacing afterwards
    assert_eq!(series.observe(1_800), Some(100.0));
}

#[test]
fn skip_before_first_sample_is_ignored() {
    let mut rate = RateDeriver::new(1.0);
    rate.skip();
    rate.observe(10);
    assert_eq!(rate.observe(30), Some(20.0));
}

#[test]
fn non_positive_interval_yields_nothing() {
    let mut rate = RateDeriver::new(0.0);
    rate.observe(1);
    assert_eq!(rate.observe(5), None);
}

// =============================================================================
// KeyedSeries
// =============================================================================

#[test]
fn keys_appear_on_first_observation_and_persist() {
    let mut temps = KeyedSeries::new(60);
    temps.observe("cpu0", 41.0);
    temps.observe("cpu1", 45.0);
    temps.observe("cpu0", 43.0);

    let snapshot = temps.snapshot();
    assert_eq!(snapshot["cpu0"], vec![41.0, 43.0]);
    assert_eq!(snapshot["cpu1"], vec![45.0]);
    assert_eq!(temps.keys(), vec!["cpu0", "cpu1"]);

    // cpu1 not mentioned again, still present
    temps.observe("cpu0", 44.0);
    assert_eq!(temps.len(), 2);
    assert_eq!(temps.get("cpu1").map(|w| w.len()), Some(1));
}

#[test]
fn each_key_is_bounded_independently() {
    let mut series = KeyedSeries::new(3);
    for i in 0..10 {
        series.observe("busy", i as f64);
    }
    series.observe("quiet", 1.0);
    assert_eq!(series.get("busy").map(|w| w.values()), Some(vec![7.0, 8.0, 9.0]));
    assert_eq!(series.get("quiet").map(|w| w.len()), Some(1));
    assert!(series.get("missing").is_none());
}
