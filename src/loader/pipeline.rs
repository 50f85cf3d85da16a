//! Batch pipelining
//!
//! One ID range becomes one pipelined round-trip. The batch succeeds or fails
//! as a whole; the individual keys are still independent writes on the
//! server, so a failed batch may have partially landed. Writes are keyed by
//! logical ID, which makes replaying the same range safe.

use super::allocator::IdRange;
use crate::common::{retry_with_backoff, Error, Result};
use crate::store::{Store, Write};
use std::time::Duration;

/// First backoff between batch attempts
const RETRY_DELAY: Duration = Duration::from_millis(100);

/// Store key for logical id `id`
pub fn document_key(prefix: &str, id: u64) -> String {
    format!("{}{}", prefix, id)
}

pub struct BatchPipeliner<'a, S> {
    store: &'a S,
    retries: u32,
}

impl<'a, S: Store> BatchPipeliner<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store, retries: 0 }
    }

    /// Replay a failed batch up to `retries` more times on retryable errors
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Generate one write per id in `range` and submit them as one pipeline
    pub async fn write_range<F>(&self, range: IdRange, mut record: F) -> Result<()>
    where
        F: FnMut(u64) -> Write,
    {
        let writes: Vec<Write> = range.ids().map(&mut record).collect();

        retry_with_backoff(
            || self.store.write_batch(writes.clone()),
            self.retries,
            RETRY_DELAY,
        )
        .await
        .map_err(|e| Error::BatchWrite {
            lo: range.lo,
            hi: range.hi,
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn json_record(id: u64) -> Write {
        Write::Json {
            key: document_key("merchant:", id),
            value: json!({ "id": id }),
        }
    }

    #[tokio::test]
    async fn test_write_range() {
        let store = MemoryStore::new();
        let pipeliner = BatchPipeliner::new(&store);

        pipeliner
            .write_range(IdRange::new(1, 100), json_record)
            .await
            .unwrap();

        assert_eq!(store.len(), 100);
        assert_eq!(store.batches(), 1);
        assert_eq!(store.json("merchant:1").unwrap()["id"], 1);
        assert_eq!(store.json("merchant:100").unwrap()["id"], 100);
        assert!(store.json("merchant:101").is_none());
    }

    #[tokio::test]
    async fn test_failure_aborts_whole_batch() {
        let store = MemoryStore::new();
        store.fail_next_batches(1);
        let pipeliner = BatchPipeliner::new(&store);

        let err = pipeliner
            .write_range(IdRange::new(1, 10), json_record)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BatchWrite { lo: 1, hi: 10, .. }));
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_replays_same_range() {
        let store = MemoryStore::new();
        store.fail_next_batches(2);
        let pipeliner = BatchPipeliner::new(&store).with_retries(2);

        pipeliner
            .write_range(IdRange::new(11, 20), json_record)
            .await
            .unwrap();
        assert_eq!(store.len(), 10);
        assert_eq!(store.batches(), 1);
        assert!(store.json("merchant:11").is_some());
    }
}
