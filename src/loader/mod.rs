//! Write workloads
//!
//! The building blocks ([`IdAllocator`], [`BatchPipeliner`], [`RateGovernor`])
//! and the three loaders built on them: the bulk [`Seeder`], the paced
//! [`SustainedLoader`] and the [`SessionLoader`].

pub mod allocator;
pub mod governor;
pub mod pipeline;
pub mod seed;
pub mod sessions;
pub mod sustain;

pub use allocator::{IdAllocator, IdRange};
pub use governor::RateGovernor;
pub use pipeline::{document_key, BatchPipeliner};
pub use seed::Seeder;
pub use sessions::SessionLoader;
pub use sustain::SustainedLoader;

use crate::common::{format_count, rate_per_sec};
use std::fmt;
use std::time::Duration;

/// Acknowledged writes of a load run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub sent: u64,
    pub batches: u64,
    /// Highest id in the last acknowledged batch
    pub last_id: Option<u64>,
    pub elapsed: Duration,
}

impl LoadReport {
    pub fn rps(&self) -> f64 {
        rate_per_sec(self.sent, self.elapsed)
    }
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sent={} over {:.1}s (rps≈{})",
            format_count(self.sent),
            self.elapsed.as_secs_f64(),
            format_count(self.rps().round() as u64)
        )
    }
}
