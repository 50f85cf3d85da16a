//! Closed-loop rate pacing
//!
//! Each batch gets a time budget of `batch_size / target_rps`. After the batch
//! the governor sleeps whatever is left of that budget. A slow batch is not
//! paid back, so short bursts above the target are possible, but the long-run
//! average converges on it.

use crate::common::{Error, Result};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct RateGovernor {
    batch_budget: Duration,
    started: Instant,
    deadline: Option<Instant>,
}

impl RateGovernor {
    /// `run_for = None` runs until stopped externally.
    ///
    /// Fails when a batch budget of `batch_size / target_rps` seconds does
    /// not fit in a `Duration`.
    pub fn new(target_rps: f64, batch_size: u64, run_for: Option<Duration>) -> Result<Self> {
        let batch_budget = if target_rps.is_finite() && target_rps > 0.0 {
            Duration::try_from_secs_f64(batch_size as f64 / target_rps).map_err(|e| {
                Error::InvalidConfig(format!(
                    "target_rps {} with batch_size {} gives no usable batch budget: {}",
                    target_rps, batch_size, e
                ))
            })?
        } else {
            Duration::ZERO
        };
        let started = Instant::now();

        Ok(Self {
            batch_budget,
            started,
            deadline: run_for.map(|d| started + d),
        })
    }

    /// Time allotted to one batch
    pub fn batch_budget(&self) -> Duration {
        self.batch_budget
    }

    /// Sleep owed after a batch that took `elapsed`
    pub fn residual(&self, elapsed: Duration) -> Duration {
        self.batch_budget.saturating_sub(elapsed)
    }

    /// Sleep out the rest of the budget for a batch started at `batch_started`
    pub async fn pace(&self, batch_started: Instant) -> Duration {
        let residual = self.residual(batch_started.elapsed());
        if !residual.is_zero() {
            tokio::time::sleep(residual).await;
        }
        residual
    }

    /// Has the configured run duration elapsed?
    pub fn expired(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget() {
        let governor = RateGovernor::new(2500.0, 100, None).unwrap();
        assert_eq!(governor.batch_budget(), Duration::from_millis(40));
    }

    #[test]
    fn test_residual_never_negative() {
        let governor = RateGovernor::new(1000.0, 10, None).unwrap();
        assert_eq!(governor.residual(Duration::from_millis(4)), Duration::from_millis(6));
        assert_eq!(governor.residual(Duration::from_millis(10)), Duration::ZERO);
        assert_eq!(governor.residual(Duration::from_secs(5)), Duration::ZERO);
    }

    #[test]
    fn test_tiny_rate_is_rejected() {
        let err = RateGovernor::new(1e-20, 1000, None).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_never_expires() {
        let governor = RateGovernor::new(1000.0, 10, None).unwrap();
        tokio::time::advance(Duration::from_secs(3600)).await;
        assert!(!governor.expired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pace_sleeps_residual() {
        let governor = RateGovernor::new(100.0, 10, Some(Duration::from_secs(1))).unwrap();
        let batch_started = Instant::now();
        tokio::time::advance(Duration::from_millis(30)).await;

        let slept = governor.pace(batch_started).await;
        assert_eq!(slept, Duration::from_millis(70));
        assert_eq!(batch_started.elapsed(), Duration::from_millis(100));
        assert!(!governor.expired());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(governor.expired());
    }
}
