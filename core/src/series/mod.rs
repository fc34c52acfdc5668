// Chart-ready series
//
// Bounded buffers every live chart reads from, plus the derivations that feed
// them (counter rates, per-key sub-series).

mod keyed;
mod rate;
mod window;

pub use keyed::KeyedSeries;
pub use rate::{RateDeriver, RateSeries};
pub use window::{SeriesSample, SlidingWindow, DEFAULT_WINDOW};
