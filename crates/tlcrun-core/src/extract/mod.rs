//! Result extraction: outcome classification and run metadata scraped from
//! engine output and the model configuration.

pub mod bounds;
pub mod markers;
pub mod stats;

pub use bounds::parse_bounds;
pub use markers::{
    classify, classify_lines, CapturedOutput, Marker, MarkerHit, MarkerKind, MarkerTable,
    OutcomeScanner,
};
pub use stats::{parse_stats, StatsCollector};
