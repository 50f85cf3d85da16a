//! Visibility probe: how long until a written document is searchable

pub mod prober;
pub mod stats;

pub use prober::{ProbeSettings, ProbeState, Prober};
pub use stats::{LatencyStats, LatencySummary};
