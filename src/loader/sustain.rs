//! Sustained loader: allocate, pipeline, pace, repeat

use super::{BatchPipeliner, IdAllocator, LoadReport, RateGovernor};
use crate::common::{format_count, rate_per_sec, Config, Result, StopSignal};
use crate::loader::pipeline::document_key;
use crate::records;
use crate::store::{Store, Write};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::time::Instant;
use tracing::info;

/// Batches between progress lines
const PROGRESS_EVERY: u64 = 20;

pub struct SustainedLoader<'a, S> {
    store: &'a S,
    config: &'a Config,
    report: LoadReport,
}

impl<'a, S: Store> SustainedLoader<'a, S> {
    pub fn new(store: &'a S, config: &'a Config) -> Self {
        Self {
            store,
            config,
            report: LoadReport::default(),
        }
    }

    /// Progress so far, also valid after a failed run
    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    /// Run until the configured duration elapses or `stop` is raised.
    ///
    /// Allocation and batch failures end the run; the report keeps what was
    /// acknowledged before the failure.
    pub async fn run(&mut self, stop: &StopSignal) -> Result<()> {
        let batch_size = self.config.batch_size;
        let allocator = IdAllocator::new(self.store, self.config.counter_key.as_str());
        let pipeliner = BatchPipeliner::new(self.store).with_retries(self.config.batch_retries);
        let governor =
            RateGovernor::new(self.config.target_rps, batch_size, self.config.run_duration())?;
        let prefix = self.config.key_prefix.as_str();
        let mut rng = StdRng::from_entropy();

        info!(
            "Target ~{:.0} JSON.SET ops/sec, batch={}, duration={}s",
            self.config.target_rps, batch_size, self.config.duration_s
        );

        loop {
            let batch_started = Instant::now();

            let range = allocator.allocate(batch_size).await?;
            pipeliner
                .write_range(range, |id| Write::Json {
                    key: document_key(prefix, id),
                    value: records::merchant(id, &mut rng),
                })
                .await?;

            self.report.sent += range.len();
            self.report.batches += 1;
            self.report.last_id = Some(range.hi);

            governor.pace(batch_started).await;
            self.report.elapsed = governor.elapsed();

            if self.report.batches % PROGRESS_EVERY == 0 {
                info!(
                    sent = self.report.sent,
                    "sent={} rps≈{:.0}",
                    format_count(self.report.sent),
                    rate_per_sec(self.report.sent, self.report.elapsed)
                );
            }

            if governor.expired() || stop.is_stopped() {
                break;
            }
        }

        Ok(())
    }
}
