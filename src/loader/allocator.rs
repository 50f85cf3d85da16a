//! Logical ID allocation
//!
//! Ranges come from one `INCRBY` on a counter kept in the store, so any number
//! of loaders and probes (threads or processes) get disjoint ranges without
//! client-side locking. A failed call grants nothing; gaps are possible,
//! duplicates are not.

use crate::common::{Error, Result};
use crate::store::Store;

/// Inclusive, contiguous block of logical IDs `[lo, hi]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdRange {
    pub lo: u64,
    pub hi: u64,
}

impl IdRange {
    pub fn new(lo: u64, hi: u64) -> Self {
        debug_assert!(lo <= hi, "empty id range [{}, {}]", lo, hi);
        Self { lo, hi }
    }

    pub fn len(&self) -> u64 {
        self.hi - self.lo + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn ids(&self) -> std::ops::RangeInclusive<u64> {
        self.lo..=self.hi
    }

    pub fn overlaps(&self, other: &IdRange) -> bool {
        self.lo <= other.hi && other.lo <= self.hi
    }
}

pub struct IdAllocator<'a, S> {
    store: &'a S,
    counter: String,
}

impl<'a, S: Store> IdAllocator<'a, S> {
    pub fn new(store: &'a S, counter: impl Into<String>) -> Self {
        Self {
            store,
            counter: counter.into(),
        }
    }

    /// Reserve `n` fresh IDs: `[new - n + 1, new]`
    pub async fn allocate(&self, n: u64) -> Result<IdRange> {
        if n == 0 {
            return Err(Error::InvalidConfig("cannot allocate an empty id range".into()));
        }

        let hi = self
            .store
            .incr_by(&self.counter, n)
            .await
            .map_err(|e| Error::Allocation {
                counter: self.counter.clone(),
                reason: e.to_string(),
            })?;

        if hi < n {
            return Err(Error::Allocation {
                counter: self.counter.clone(),
                reason: format!("counter returned {} after adding {}", hi, n),
            });
        }
        Ok(IdRange::new(hi - n + 1, hi))
    }

    /// Reserve a single ID
    pub async fn next_id(&self) -> Result<u64> {
        Ok(self.allocate(1).await?.lo)
    }
}
