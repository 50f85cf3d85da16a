//! Error types for searchload

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === Store Errors ===
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Unexpected reply: {0}")]
    Protocol(String),

    // === Workload Errors ===
    #[error("ID allocation failed on {counter}: {reason}")]
    Allocation { counter: String, reason: String },

    #[error("Batch [{lo}, {hi}] failed: {reason}")]
    BatchWrite { lo: u64, hi: u64, reason: String },

    #[error("Index creation failed for {name}: {reason}")]
    IndexCreate { name: String, reason: String },

    // === Encoding Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Config Errors ===
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // === Generic ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Is this a retryable error?
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Redis(e) => e.is_io_error() || e.is_timeout() || e.is_connection_dropped(),
            _ => false,
        }
    }
}
