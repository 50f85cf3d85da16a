//! Write-to-searchable latency probe
//!
//! Each iteration walks an explicit state machine:
//!
//! ```text
//! Allocated ──write──▶ Written ──▶ Polling ──match──▶ Visible
//!                                    │  ▲
//!                                    │  └─ no match, sleep poll interval
//!                                    ├──── deadline passed ──▶ TimedOut
//!                                    └──── stop raised ──────▶ Interrupted
//! ```
//!
//! Both the write timestamp and the deadline live on the store's clock, so
//! client clock skew and scheduling jitter never leak into the measurement.

use crate::common::{Error, Result, StopSignal};
use crate::loader::{document_key, IdAllocator};
use crate::probe::stats::LatencyStats;
use crate::records;
use crate::store::{IndexInfo, NumericRange, Store, Write};
use std::time::Duration;
use tracing::{info, warn};

/// Per-document probe state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeState {
    Allocated {
        id: u64,
    },
    Written {
        id: u64,
        issued_at_ms: u64,
    },
    Polling {
        id: u64,
        issued_at_ms: u64,
        deadline_ms: u64,
        attempts: u32,
    },
    Visible {
        id: u64,
        latency_ms: u64,
        attempts: u32,
    },
    TimedOut {
        id: u64,
        attempts: u32,
    },
    /// Stopped while polling; neither a sample nor a failure
    Interrupted {
        id: u64,
        attempts: u32,
    },
}

impl ProbeState {
    pub fn id(&self) -> u64 {
        match *self {
            ProbeState::Allocated { id }
            | ProbeState::Written { id, .. }
            | ProbeState::Polling { id, .. }
            | ProbeState::Visible { id, .. }
            | ProbeState::TimedOut { id, .. }
            | ProbeState::Interrupted { id, .. } => id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProbeState::Visible { .. }
                | ProbeState::TimedOut { .. }
                | ProbeState::Interrupted { .. }
        )
    }
}

/// Probe settings, split out of [`crate::Config`]
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub index_name: String,
    pub key_prefix: String,
    pub counter_key: String,
    pub poll_interval: Duration,
    pub timeout_ms: u64,
}

impl From<&crate::Config> for ProbeSettings {
    fn from(config: &crate::Config) -> Self {
        Self {
            index_name: config.index_name.clone(),
            key_prefix: config.key_prefix.clone(),
            counter_key: config.counter_key.clone(),
            poll_interval: config.poll_interval(),
            timeout_ms: config.timeout_ms,
        }
    }
}

pub struct Prober<'a, S> {
    store: &'a S,
    settings: ProbeSettings,
}

impl<'a, S: Store> Prober<'a, S> {
    pub fn new(store: &'a S, settings: ProbeSettings) -> Self {
        Self { store, settings }
    }

    /// Reserve the id for the next probe document
    pub async fn begin(&self) -> Result<ProbeState> {
        let allocator = IdAllocator::new(self.store, self.settings.counter_key.as_str());
        Ok(ProbeState::Allocated {
            id: allocator.next_id().await?,
        })
    }

    /// Advance one transition; terminal states are returned unchanged.
    ///
    /// `stop` is checked after every poll-interval sleep.
    pub async fn step(&self, state: ProbeState, stop: &StopSignal) -> Result<ProbeState> {
        match state {
            ProbeState::Allocated { id } => {
                let issued_at_ms = self.store.server_time_ms().await?;
                self.store
                    .write(Write::Json {
                        key: document_key(&self.settings.key_prefix, id),
                        value: records::probe_document(id, issued_at_ms),
                    })
                    .await?;
                Ok(ProbeState::Written { id, issued_at_ms })
            }

            ProbeState::Written { id, issued_at_ms } => Ok(ProbeState::Polling {
                id,
                issued_at_ms,
                deadline_ms: issued_at_ms.saturating_add(self.settings.timeout_ms),
                attempts: 0,
            }),

            ProbeState::Polling {
                id,
                issued_at_ms,
                deadline_ms,
                attempts,
            } => {
                if self.store.server_time_ms().await? >= deadline_ms {
                    return Ok(ProbeState::TimedOut { id, attempts });
                }

                let query = NumericRange::exact("id", id).to_string();
                let total = self
                    .store
                    .search_total(&self.settings.index_name, &query, 0, 1)
                    .await?;
                let attempts = attempts + 1;

                if total >= 1 {
                    let seen_at_ms = self.store.server_time_ms().await?;
                    return Ok(ProbeState::Visible {
                        id,
                        latency_ms: seen_at_ms.saturating_sub(issued_at_ms),
                        attempts,
                    });
                }

                tokio::time::sleep(self.settings.poll_interval).await;
                if stop.is_stopped() {
                    return Ok(ProbeState::Interrupted { id, attempts });
                }
                Ok(ProbeState::Polling {
                    id,
                    issued_at_ms,
                    deadline_ms,
                    attempts,
                })
            }

            terminal => Ok(terminal),
        }
    }

    /// Run one probe document from allocation to a terminal state
    pub async fn probe_once(&self, stop: &StopSignal) -> Result<ProbeState> {
        let mut state = self.begin().await?;
        while !state.is_terminal() {
            state = self.step(state, stop).await?;
        }
        Ok(state)
    }

    /// Point-in-time indexing progress; failures are logged, never fatal
    pub async fn snapshot(&self) -> Option<IndexInfo> {
        match self.store.index_info(&self.settings.index_name).await {
            Ok(Some(info)) => {
                info!(
                    percent_indexed = info.percent_indexed,
                    num_docs = info.num_docs,
                    "FT.INFO {}",
                    info
                );
                Some(info)
            }
            Ok(None) => {
                warn!("FT.INFO: index '{}' not found", self.settings.index_name);
                None
            }
            Err(e) => {
                warn!("FT.INFO error: {}", e);
                None
            }
        }
    }

    /// Probe `iterations` documents, reporting every `report_every`.
    ///
    /// Timeouts are recorded in `stats` and the run moves on. Store errors
    /// end the run, and so does a stop raised mid-poll, without a sample.
    pub async fn run(
        &self,
        iterations: u64,
        report_every: u64,
        stats: &mut LatencyStats,
        stop: &StopSignal,
    ) -> Result<()> {
        let report_every = report_every.max(1);

        for n in 1..=iterations {
            if stop.is_stopped() {
                info!("Probe interrupted after {} iterations", n - 1);
                break;
            }

            match self.probe_once(stop).await? {
                ProbeState::Visible { latency_ms, .. } => stats.record(latency_ms),
                ProbeState::TimedOut { id, attempts } => {
                    warn!(
                        id,
                        attempts,
                        "document not visible within {}ms",
                        self.settings.timeout_ms
                    );
                    stats.record_failure();
                }
                ProbeState::Interrupted { id, attempts } => {
                    info!(id, attempts, "Probe interrupted after {} iterations", n - 1);
                    break;
                }
                other => {
                    return Err(Error::Internal(format!(
                        "probe ended in non-terminal state {:?}",
                        other
                    )))
                }
            }

            if n % report_every == 0 || n == iterations {
                let summary = stats.summary();
                info!(
                    n = summary.samples,
                    fail = summary.failures,
                    "{}",
                    summary
                );
                self.snapshot().await;
            }
        }

        Ok(())
    }
}
