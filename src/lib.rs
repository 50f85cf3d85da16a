//! # searchload
//!
//! Seeds and stress-tests a Redis deployment with JSON documents and a search
//! index, and measures how long a write takes to become searchable.
//!
//! - Lock-free ID allocation through one shared `INCRBY` counter
//! - Pipelined batch writes, paced to a target rate indefinitely
//! - Idempotent index creation before or after a bulk load
//! - Write-to-searchable latency probe on the store's own clock
//!
//! ## Architecture
//!
//! ```text
//!  ┌──────────────┐   ┌──────────────┐   ┌────────────────┐
//!  │ IdAllocator  │──▶│ records::*   │──▶│ BatchPipeliner │──┐
//!  │ (INCRBY)     │   │ (generators) │   │ (PIPELINE)     │  │
//!  └──────▲───────┘   └──────────────┘   └───────┬────────┘  │
//!         │                                      │ paced by  │
//!         │                               ┌──────▼───────┐   │
//!         │                               │ RateGovernor │   │
//!         │                               └──────────────┘   ▼
//!  ┌──────┴───────┐   poll @id:[n n]                     ┌────────┐
//!  │ Prober       │─────────────────────────────────────▶│ Store  │
//!  │ + LatencyStats│◀──── FT.INFO snapshots ─────────────│        │
//!  └──────────────┘                                      └────────┘
//! ```
//!
//! ## Usage
//!
//! ### Bulk seed, index built afterwards
//! ```bash
//! TOTAL_DOCS=1000000 BATCH_SIZE=1000 searchload seed
//! ```
//!
//! ### Sustained load at ~2,500 writes/sec for 5 minutes
//! ```bash
//! searchload sustain --target-rps 2500 --batch-size 100 --duration 300
//! ```
//!
//! ### Probe visibility latency while the loader runs
//! ```bash
//! searchload probe --iterations 1000 --sleep-ms 5 --timeout-ms 10000
//! ```
//!
//! ### Session hashes with TTLs
//! ```bash
//! searchload sessions --total 100000
//! ```

pub mod common;
pub mod index;
pub mod loader;
pub mod probe;
pub mod records;
pub mod store;

// Re-export commonly used types
pub use common::{Config, Error, Result, StopSignal};
pub use index::{EnsureOutcome, IndexDescriptor, IndexManager};
pub use loader::{IdAllocator, IdRange, LoadReport, RateGovernor};
pub use probe::{LatencyStats, ProbeState, Prober};
pub use store::{MemoryStore, RedisStore, Store};

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
