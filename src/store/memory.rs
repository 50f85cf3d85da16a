//! In-memory store
//!
//! Behaves like a single Redis node with the JSON and search modules, closely
//! enough for the workloads: atomic counters, JSON and hash documents,
//! numeric range search over indexed prefixes, and a server clock. Documents
//! become searchable `index_lag` after they are written (`None` = never),
//! measured on the tokio clock so paused-time tests stay deterministic.

use super::{IndexInfo, NumericRange, Store, Write};
use crate::common::{Error, Result};
use crate::index::{IndexDescriptor, IndexOn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// Server clock origin (milliseconds since the Unix epoch)
const CLOCK_ORIGIN_MS: u64 = 1_700_000_000_000;

#[derive(Debug, Clone)]
enum Body {
    Json(serde_json::Value),
    Hash(HashMap<String, String>),
}

#[derive(Debug, Clone)]
struct Doc {
    body: Body,
    written_at: Instant,
    ttl: Option<u64>,
}

#[derive(Debug, Default)]
struct State {
    counters: HashMap<String, u64>,
    docs: HashMap<String, Doc>,
    indexes: HashMap<String, IndexDescriptor>,
}

pub struct MemoryStore {
    state: Mutex<State>,
    started: Instant,
    index_lag: Option<Duration>,

    create_calls: AtomicU64,
    batches: AtomicU64,
    failing_batches: AtomicU32,
    fail_index_info: AtomicBool,
    fail_create_index: AtomicBool,
    hide_index_from_info: AtomicBool,
}

impl MemoryStore {
    /// Store whose documents are searchable as soon as they are written
    pub fn new() -> Self {
        Self::with_index_lag(Some(Duration::ZERO))
    }

    pub fn with_index_lag(index_lag: Option<Duration>) -> Self {
        Self {
            state: Mutex::new(State::default()),
            started: Instant::now(),
            index_lag,
            create_calls: AtomicU64::new(0),
            batches: AtomicU64::new(0),
            failing_batches: AtomicU32::new(0),
            fail_index_info: AtomicBool::new(false),
            fail_create_index: AtomicBool::new(false),
            hide_index_from_info: AtomicBool::new(false),
        }
    }

    /// Store that never indexes anything
    pub fn never_indexing() -> Self {
        Self::with_index_lag(None)
    }

    fn state(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| Error::Internal("memory store lock poisoned".into()))
    }

    fn now_ms(&self) -> u64 {
        CLOCK_ORIGIN_MS + self.started.elapsed().as_millis() as u64
    }

    fn is_indexed(&self, doc: &Doc) -> bool {
        match self.index_lag {
            Some(lag) => doc.written_at.elapsed() >= lag,
            None => false,
        }
    }

    /// Fail the next `n` pipelined batches with a connection error
    pub fn fail_next_batches(&self, n: u32) {
        self.failing_batches.store(n, Ordering::SeqCst);
    }

    /// Make `FT.INFO` fail with a non "unknown index" error
    pub fn fail_index_info(&self, fail: bool) {
        self.fail_index_info.store(fail, Ordering::SeqCst);
    }

    /// Make `FT.CREATE` fail with a schema error
    pub fn fail_create_index(&self, fail: bool) {
        self.fail_create_index.store(fail, Ordering::SeqCst);
    }

    /// Make `FT.INFO` report every index as missing
    pub fn hide_index_from_info(&self, hide: bool) {
        self.hide_index_from_info.store(hide, Ordering::SeqCst);
    }

    /// Register an index directly, as another process would
    pub fn create_index_now(&self, descriptor: &IndexDescriptor) -> Result<()> {
        let mut state = self.state()?;
        if state.indexes.contains_key(&descriptor.name) {
            return Err(Error::IndexCreate {
                name: descriptor.name.clone(),
                reason: "Index already exists".into(),
            });
        }
        state
            .indexes
            .insert(descriptor.name.clone(), descriptor.clone());
        Ok(())
    }

    /// `FT.CREATE` calls received, including rejected ones
    pub fn create_calls(&self) -> u64 {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Pipelined batches acknowledged
    pub fn batches(&self) -> u64 {
        self.batches.load(Ordering::SeqCst)
    }

    pub fn created_index(&self, name: &str) -> Option<IndexDescriptor> {
        self.state().ok()?.indexes.get(name).cloned()
    }

    pub fn counter(&self, key: &str) -> u64 {
        self.state()
            .map(|s| s.counters.get(key).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.state().map(|s| s.docs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn json(&self, key: &str) -> Option<serde_json::Value> {
        match &self.state().ok()?.docs.get(key)?.body {
            Body::Json(value) => Some(value.clone()),
            Body::Hash(_) => None,
        }
    }

    pub fn hash(&self, key: &str) -> Option<HashMap<String, String>> {
        match &self.state().ok()?.docs.get(key)?.body {
            Body::Hash(fields) => Some(fields.clone()),
            Body::Json(_) => None,
        }
    }

    pub fn ttl(&self, key: &str) -> Option<u64> {
        self.state().ok()?.docs.get(key)?.ttl
    }

    fn apply(&self, state: &mut State, write: Write) {
        let written_at = Instant::now();
        let (key, doc) = match write {
            Write::Json { key, value } => (
                key,
                Doc {
                    body: Body::Json(value),
                    written_at,
                    ttl: None,
                },
            ),
            Write::Hash { key, fields, ttl } => {
                let mut merged = match state.docs.remove(&key) {
                    Some(Doc {
                        body: Body::Hash(existing),
                        ..
                    }) => existing,
                    _ => HashMap::new(),
                };
                merged.extend(fields);
                (
                    key,
                    Doc {
                        body: Body::Hash(merged),
                        written_at,
                        ttl,
                    },
                )
            }
        };
        state.docs.insert(key, doc);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn covered<'a>(index: &'a IndexDescriptor, state: &'a State) -> impl Iterator<Item = &'a Doc> {
    state.docs.iter().filter_map(move |(key, doc)| {
        let shape_matches = matches!(
            (&doc.body, index.on),
            (Body::Json(_), IndexOn::Json) | (Body::Hash(_), IndexOn::Hash)
        );
        (shape_matches && key.starts_with(&index.prefix)).then_some(doc)
    })
}

fn numeric_attribute(doc: &Doc, attribute: &str) -> Option<f64> {
    match &doc.body {
        Body::Json(value) => value.get(attribute)?.as_f64(),
        Body::Hash(fields) => fields.get(attribute)?.parse().ok(),
    }
}

fn unknown_index() -> Error {
    Error::Redis(redis::RedisError::from((
        redis::ErrorKind::ResponseError,
        "Unknown index name",
    )))
}

impl Store for MemoryStore {
    async fn incr_by(&self, counter: &str, n: u64) -> Result<u64> {
        let mut state = self.state()?;
        let value = state.counters.entry(counter.to_string()).or_insert(0);
        *value += n;
        Ok(*value)
    }

    async fn server_time_ms(&self) -> Result<u64> {
        Ok(self.now_ms())
    }

    async fn write(&self, write: Write) -> Result<()> {
        let mut state = self.state()?;
        self.apply(&mut state, write);
        Ok(())
    }

    async fn write_batch(&self, writes: Vec<Write>) -> Result<()> {
        let failing = self
            .failing_batches
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(Error::Redis(redis::RedisError::from(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "connection reset while writing pipeline",
            ))));
        }

        let mut state = self.state()?;
        for write in writes {
            self.apply(&mut state, write);
        }
        self.batches.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn index_info(&self, name: &str) -> Result<Option<IndexInfo>> {
        if self.fail_index_info.load(Ordering::SeqCst) {
            return Err(Error::Redis(redis::RedisError::from((
                redis::ErrorKind::ResponseError,
                "ERR injected FT.INFO failure",
            ))));
        }
        if self.hide_index_from_info.load(Ordering::SeqCst) {
            return Ok(None);
        }

        let state = self.state()?;
        let Some(index) = state.indexes.get(name) else {
            return Ok(None);
        };

        let mut total = 0u64;
        let mut indexed = 0u64;
        let mut bytes = 0usize;
        for doc in covered(index, &state) {
            total += 1;
            if self.is_indexed(doc) {
                indexed += 1;
                bytes += match &doc.body {
                    Body::Json(value) => value.to_string().len(),
                    Body::Hash(fields) => fields.iter().map(|(k, v)| k.len() + v.len()).sum(),
                };
            }
        }

        Ok(Some(IndexInfo {
            num_docs: indexed,
            percent_indexed: if total == 0 {
                1.0
            } else {
                indexed as f64 / total as f64
            },
            total_index_memory_sz_mb: bytes as f64 / (1024.0 * 1024.0),
        }))
    }

    async fn create_index(&self, descriptor: &IndexDescriptor) -> Result<()> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_create_index.load(Ordering::SeqCst) {
            return Err(Error::IndexCreate {
                name: descriptor.name.clone(),
                reason: "Invalid field type for field `company_name`".into(),
            });
        }
        self.create_index_now(descriptor)
    }

    async fn search_total(
        &self,
        index: &str,
        query: &str,
        _offset: u64,
        _count: u64,
    ) -> Result<u64> {
        let state = self.state()?;
        let descriptor = state.indexes.get(index).ok_or_else(unknown_index)?;

        let range = NumericRange::parse(query)?;
        let field = descriptor.field(range.field).ok_or_else(|| {
            Error::Redis(redis::RedisError::from((
                redis::ErrorKind::ResponseError,
                "Unknown field",
            )))
        })?;
        let attribute = field.attribute();

        let total = covered(descriptor, &state)
            .filter(|doc| self.is_indexed(doc))
            .filter_map(|doc| numeric_attribute(doc, attribute))
            .filter(|value| range.contains(*value))
            .count();
        Ok(total as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::merchant_index;
    use serde_json::json;

    fn merchant(id: u64) -> Write {
        Write::Json {
            key: format!("merchant:{}", id),
            value: json!({ "id": id, "state": "SP" }),
        }
    }

    #[tokio::test]
    async fn test_incr_by() {
        let store = MemoryStore::new();
        assert_eq!(store.incr_by("merchant:id", 100).await.unwrap(), 100);
        assert_eq!(store.incr_by("merchant:id", 1).await.unwrap(), 101);
        assert_eq!(store.counter("merchant:id"), 101);
    }

    #[tokio::test]
    async fn test_search_requires_index() {
        let store = MemoryStore::new();
        store.write(merchant(1)).await.unwrap();
        assert!(store
            .search_total("idx:merchant", "@id:[1 1]", 0, 1)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_search_by_id() {
        let store = MemoryStore::new();
        store
            .create_index_now(&merchant_index("idx:merchant", "merchant:"))
            .unwrap();
        store
            .write_batch((1..=10).map(merchant).collect())
            .await
            .unwrap();
        store
            .write(Write::Json {
                key: "other:5".into(),
                value: json!({ "id": 5 }),
            })
            .await
            .unwrap();

        let total = store
            .search_total("idx:merchant", "@id:[5 5]", 0, 1)
            .await
            .unwrap();
        assert_eq!(total, 1);
        let total = store
            .search_total("idx:merchant", "@id:[3 7]", 0, 1)
            .await
            .unwrap();
        assert_eq!(total, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_index_lag() {
        let store = MemoryStore::with_index_lag(Some(Duration::from_millis(50)));
        store
            .create_index_now(&merchant_index("idx:merchant", "merchant:"))
            .unwrap();
        store.write(merchant(1)).await.unwrap();

        let info = store.index_info("idx:merchant").await.unwrap().unwrap();
        assert_eq!(info.num_docs, 0);
        assert_eq!(info.percent_indexed, 0.0);

        tokio::time::sleep(Duration::from_millis(50)).await;
        let info = store.index_info("idx:merchant").await.unwrap().unwrap();
        assert_eq!(info.num_docs, 1);
        assert_eq!(info.percent_indexed, 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_clock_follows_tokio_time() {
        let store = MemoryStore::new();
        let t0 = store.server_time_ms().await.unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;
        let t1 = store.server_time_ms().await.unwrap();
        assert_eq!(t1 - t0, 250);
    }

    #[tokio::test]
    async fn test_injected_batch_failure() {
        let store = MemoryStore::new();
        store.fail_next_batches(1);
        let err = store.write_batch(vec![merchant(1)]).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(store.is_empty());

        store.write_batch(vec![merchant(1)]).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.batches(), 1);
    }

    #[tokio::test]
    async fn test_hash_write_with_ttl() {
        let store = MemoryStore::new();
        store
            .write(Write::Hash {
                key: "session:sess-00000001".into(),
                fields: vec![("uid".into(), "42".into())],
                ttl: Some(1800),
            })
            .await
            .unwrap();
        assert_eq!(store.hash("session:sess-00000001").unwrap()["uid"], "42");
        assert_eq!(store.ttl("session:sess-00000001"), Some(1800));
    }
}
