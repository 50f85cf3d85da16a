//! Common utilities and types shared across searchload

pub mod config;
pub mod error;
pub mod utils;

pub use config::Config;
pub use error::{Error, Result};
pub use utils::{
    format_count, rate_per_sec, redact_url, retry_with_backoff, timestamp_now, StopSignal,
};
