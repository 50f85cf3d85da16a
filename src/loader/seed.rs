//! Bulk seed of merchant documents
//!
//! Writes ids `1..=total_docs` in fixed batches and ensures the search index
//! either before the load or after it (`create_index_after_load`). Building
//! the index after the load lets the server index in bulk instead of per write.

use super::{BatchPipeliner, IdRange, LoadReport};
use crate::common::{format_count, Config, Result, StopSignal};
use crate::index::{merchant_index, IndexManager};
use crate::loader::pipeline::document_key;
use crate::records;
use crate::store::{Store, Write};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::time::Instant;
use tracing::info;

/// Batches between progress lines
const PROGRESS_BATCHES: u64 = 10;

/// Batch ranges covering `1..=total`, the last one possibly short
pub fn plan(total: u64, batch_size: u64) -> impl Iterator<Item = IdRange> {
    (0..total)
        .step_by(batch_size.max(1) as usize)
        .map(move |start| IdRange::new(start + 1, (start + batch_size).min(total)))
}

pub struct Seeder<'a, S> {
    store: &'a S,
    config: &'a Config,
    report: LoadReport,
}

impl<'a, S: Store> Seeder<'a, S> {
    pub fn new(store: &'a S, config: &'a Config) -> Self {
        Self {
            store,
            config,
            report: LoadReport::default(),
        }
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    pub async fn run(&mut self, stop: &StopSignal) -> Result<()> {
        let config = self.config;
        let descriptor = merchant_index(&config.index_name, &config.key_prefix);
        let indexes = IndexManager::new(self.store);

        if !config.create_index_after_load {
            indexes.ensure(&descriptor).await?;
        }

        let pipeliner = BatchPipeliner::new(self.store).with_retries(config.batch_retries);
        let mut rng = StdRng::from_entropy();
        let started = Instant::now();
        let total = config.total_docs;

        for range in plan(total, config.batch_size) {
            if stop.is_stopped() {
                info!(
                    "Seed interrupted at {} / {}",
                    format_count(self.report.sent),
                    format_count(total)
                );
                break;
            }

            pipeliner
                .write_range(range, |id| Write::Json {
                    key: document_key(&config.key_prefix, id),
                    value: records::merchant(id, &mut rng),
                })
                .await?;

            self.report.sent += range.len();
            self.report.batches += 1;
            self.report.last_id = Some(range.hi);
            self.report.elapsed = started.elapsed();

            if self.report.batches % PROGRESS_BATCHES == 0 || range.hi == total {
                info!(
                    inserted = range.hi,
                    "Inserted {} / {}",
                    format_count(range.hi),
                    format_count(total)
                );
            }
        }

        if config.create_index_after_load {
            indexes.ensure(&descriptor).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn config(total_docs: u64, batch_size: u64, after: bool) -> Config {
        Config {
            total_docs,
            batch_size,
            create_index_after_load: after,
            ..Config::default()
        }
    }

    #[test]
    fn test_plan() {
        let ranges: Vec<_> = plan(250, 100).collect();
        assert_eq!(
            ranges,
            vec![IdRange::new(1, 100), IdRange::new(101, 200), IdRange::new(201, 250)]
        );
        assert_eq!(plan(0, 100).count(), 0);
    }

    #[tokio::test]
    async fn test_seed_then_index() {
        let store = MemoryStore::new();
        let config = config(250, 100, true);
        let mut seeder = Seeder::new(&store, &config);

        seeder.run(&StopSignal::new()).await.unwrap();

        assert_eq!(seeder.report().sent, 250);
        assert_eq!(store.batches(), 3);
        assert_eq!(store.create_calls(), 1);
        let total = store
            .search_total(&config.index_name, "@id:[50 50]", 0, 1)
            .await
            .unwrap();
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn test_index_before_load_fails_fast() {
        let store = MemoryStore::new();
        store.fail_index_info(true);
        let config = config(100, 10, false);
        let mut seeder = Seeder::new(&store, &config);

        assert!(seeder.run(&StopSignal::new()).await.is_err());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_seed_keeps_existing_index() {
        let store = MemoryStore::new();
        let config = config(10, 10, false);
        store
            .create_index_now(&merchant_index(&config.index_name, &config.key_prefix))
            .unwrap();

        Seeder::new(&store, &config)
            .run(&StopSignal::new())
            .await
            .unwrap();
        assert_eq!(store.create_calls(), 0);
        assert_eq!(store.len(), 10);
    }
}
