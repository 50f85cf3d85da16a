//! Configuration for searchload workloads
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! process environment variables (`REDIS_URL`, `BATCH_SIZE`, ...), and finally
//! whatever the CLI overrides. The result is an immutable [`Config`] that is
//! passed by reference into each component.

use crate::common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::Path;
use std::time::Duration;

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "searchload.toml";

/// Global configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Store connection URL (`redis://` or `rediss://`)
    pub redis_url: String,

    /// Key prefix for merchant documents (also the index prefix filter)
    pub key_prefix: String,

    /// Shared counter used for ID allocation across loaders and probes
    pub counter_key: String,

    /// Search index name
    pub index_name: String,

    /// Documents written by the bulk seed
    pub total_docs: u64,

    /// Writes per pipelined batch
    pub batch_size: u64,

    /// Create the index after the bulk seed instead of before it
    pub create_index_after_load: bool,

    /// Sustained loader target rate (writes/sec)
    pub target_rps: f64,

    /// Sustained loader run time in seconds, 0 runs until stopped
    pub duration_s: u64,

    /// Probe iterations
    pub iterations: u64,

    /// Probe poll interval
    pub sleep_ms: u64,

    /// Per-document visibility timeout
    pub timeout_ms: u64,

    /// Probe report cadence (iterations)
    pub report_every: u64,

    /// Latency samples kept for the median
    pub sample_window: usize,

    /// Key prefix for session hashes
    pub session_prefix: String,

    /// Sessions written by the session loader
    pub total_sessions: u64,

    pub ttl_min_seconds: u64,
    pub ttl_max_seconds: u64,

    /// Extra attempts for a failed batch (same ID range)
    pub batch_retries: u32,

    /// Logging level
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            key_prefix: "merchant:".to_string(),
            counter_key: "merchant:id".to_string(),
            index_name: "idx:merchant".to_string(),
            total_docs: 10_000_000,
            batch_size: 1000,
            create_index_after_load: true,
            target_rps: 2500.0,
            duration_s: 300,
            iterations: 1000,
            sleep_ms: 5,
            timeout_ms: 10_000,
            report_every: 50,
            sample_window: 100_000,
            session_prefix: "session:".to_string(),
            total_sessions: 1000,
            ttl_min_seconds: 30 * 60,
            ttl_max_seconds: 7 * 24 * 3600,
            batch_retries: 0,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load from the default file (if present) and the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::from_sources(path, config::Environment::default())
    }

    /// Load from an explicit file and environment source
    pub fn from_sources(path: Option<&Path>, env: config::Environment) -> Result<Self> {
        let file = match path {
            Some(p) => config::File::from(p).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings = config::Config::builder()
            .add_source(file)
            .add_source(env.try_parsing(true))
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no workload can run with
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be > 0".into()));
        }
        if !self.target_rps.is_finite() || self.target_rps <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "target_rps must be a positive number, got {}",
                self.target_rps
            )));
        }
        if self.report_every == 0 {
            return Err(Error::InvalidConfig("report_every must be > 0".into()));
        }
        if self.sample_window == 0 {
            return Err(Error::InvalidConfig("sample_window must be > 0".into()));
        }
        if self.ttl_min_seconds > self.ttl_max_seconds {
            return Err(Error::InvalidConfig(format!(
                "ttl_min_seconds ({}) exceeds ttl_max_seconds ({})",
                self.ttl_min_seconds, self.ttl_max_seconds
            )));
        }
        if self.key_prefix.is_empty() || self.session_prefix.is_empty() {
            return Err(Error::InvalidConfig("key prefixes cannot be empty".into()));
        }
        if self.index_name.is_empty() {
            return Err(Error::InvalidConfig("index_name cannot be empty".into()));
        }
        Ok(())
    }

    /// Run duration, `None` when unbounded
    pub fn run_duration(&self) -> Option<Duration> {
        match self.duration_s {
            0 => None,
            s => Some(Duration::from_secs(s)),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.sleep_ms)
    }

    pub fn ttl_range(&self) -> RangeInclusive<u64> {
        self.ttl_min_seconds..=self.ttl_max_seconds
    }
}
