//! Session storage load: flat hashes that expire

use super::seed::plan;
use super::{BatchPipeliner, LoadReport};
use crate::common::{format_count, timestamp_now, Config, Result, StopSignal};
use crate::records;
use crate::store::{Store, Write};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::time::Instant;
use tracing::info;

const PROGRESS_BATCHES: u64 = 10;

pub struct SessionLoader<'a, S> {
    store: &'a S,
    config: &'a Config,
    report: LoadReport,
}

impl<'a, S: Store> SessionLoader<'a, S> {
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

    /// Write `total_sessions` sessions, each `HSET` + `EXPIRE` in the same pipeline
    pub async fn run(&mut self, stop: &StopSignal) -> Result<()> {
        let config = self.config;
        let pipeliner = BatchPipeliner::new(self.store).with_retries(config.batch_retries);
        let mut rng = StdRng::from_entropy();
        let started = Instant::now();
        let total = config.total_sessions;

        for range in plan(total, config.batch_size) {
            if stop.is_stopped() {
                break;
            }

            let now = timestamp_now();
            pipeliner
                .write_range(range, |seq| {
                    let session = records::session(seq, config.ttl_range(), now, &mut rng);
                    Write::Hash {
                        key: format!("{}{}", config.session_prefix, session.sid),
                        fields: session.fields,
                        ttl: Some(session.ttl),
                    }
                })
                .await?;

            self.report.sent += range.len();
            self.report.batches += 1;
            self.report.last_id = Some(range.hi);
            self.report.elapsed = started.elapsed();

            if self.report.batches % PROGRESS_BATCHES == 0 || range.hi == total {
                info!("Inserted {} / {}", format_count(range.hi), format_count(total));
            }
        }

        Ok(())
    }
}
