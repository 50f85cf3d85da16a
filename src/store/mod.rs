//! Store protocol surface consumed by the workloads
//!
//! [`Store`] is the seam between the loaders/probe and the document store.
//! [`RedisStore`] speaks to a Redis server with JSON and search modules;
//! [`MemoryStore`] is an in-process stand-in with a controllable clock and
//! indexing lag.

pub mod memory;
pub mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

use crate::common::{Error, Result};
use crate::index::IndexDescriptor;
use std::fmt;
use std::future::Future;
use std::str::FromStr;

/// One per-record write
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    /// `JSON.SET key $ value`
    Json {
        key: String,
        value: serde_json::Value,
    },
    /// `HSET key field value ...` followed by `EXPIRE key ttl` when set
    Hash {
        key: String,
        fields: Vec<(String, String)>,
        ttl: Option<u64>,
    },
}

impl Write {
    pub fn key(&self) -> &str {
        match self {
            Write::Json { key, .. } | Write::Hash { key, .. } => key,
        }
    }
}

/// Indexing-progress metrics reported by `FT.INFO`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexInfo {
    pub num_docs: u64,
    /// Fraction in `[0, 1]`
    pub percent_indexed: f64,
    pub total_index_memory_sz_mb: f64,
}

impl fmt::Display for IndexInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "percent_indexed={:.2} num_docs={} mem={:.3}MB",
            self.percent_indexed,
            crate::common::format_count(self.num_docs),
            self.total_index_memory_sz_mb
        )
    }
}

/// Trait for document store backends
///
/// Futures are `Send` so workloads can run on the multi-threaded runtime.
pub trait Store: Send + Sync {
    /// Atomically add `n` to `counter` and return the new value
    fn incr_by(&self, counter: &str, n: u64) -> impl Future<Output = Result<u64>> + Send;

    /// Store-side clock in milliseconds
    fn server_time_ms(&self) -> impl Future<Output = Result<u64>> + Send;

    /// Single acknowledged write
    fn write(&self, write: Write) -> impl Future<Output = Result<()>> + Send;

    /// All writes in one pipelined round-trip; fails as a whole
    fn write_batch(&self, writes: Vec<Write>) -> impl Future<Output = Result<()>> + Send;

    /// `None` when the index does not exist
    fn index_info(&self, name: &str) -> impl Future<Output = Result<Option<IndexInfo>>> + Send;

    fn create_index(
        &self,
        descriptor: &IndexDescriptor,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Total matches of `query` on `index`
    fn search_total(
        &self,
        index: &str,
        query: &str,
        offset: u64,
        count: u64,
    ) -> impl Future<Output = Result<u64>> + Send;
}

/// Numeric range filter, rendered as `@field:[lo hi]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericRange<'a> {
    pub field: &'a str,
    pub lo: f64,
    pub hi: f64,
}

impl<'a> NumericRange<'a> {
    /// Exact match on one value
    pub fn exact(field: &'a str, value: u64) -> Self {
        Self {
            field,
            lo: value as f64,
            hi: value as f64,
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.lo <= value && value <= self.hi
    }

    /// Parse `@field:[lo hi]`
    pub fn parse(query: &'a str) -> Result<Self> {
        let bad = || Error::Protocol(format!("unsupported query: {}", query));

        let rest = query.trim().strip_prefix('@').ok_or_else(bad)?;
        let (field, range) = rest.split_once(':').ok_or_else(bad)?;
        let range = range
            .strip_prefix('[')
            .and_then(|r| r.strip_suffix(']'))
            .ok_or_else(bad)?;
        let mut bounds = range.split_whitespace();
        let lo = parse_bound(bounds.next().ok_or_else(bad)?).ok_or_else(bad)?;
        let hi = parse_bound(bounds.next().ok_or_else(bad)?).ok_or_else(bad)?;
        if bounds.next().is_some() {
            return Err(bad());
        }

        Ok(Self { field, lo, hi })
    }
}

fn parse_bound(s: &str) -> Option<f64> {
    match s {
        "-inf" => Some(f64::NEG_INFINITY),
        "+inf" | "inf" => Some(f64::INFINITY),
        _ => f64::from_str(s).ok(),
    }
}

impl fmt::Display for NumericRange<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}:[{} {}]", self.field, self.lo, self.hi)
    }
}
