//! Latency statistics for the visibility probe
//!
//! Count, mean and failures cover the whole run. The median comes from a
//! bounded window of the most recent samples so memory stays flat on long
//! runs; tail percentiles come from an HDR histogram over every sample.

use crate::common::{Error, Result};
use hdrhistogram::Histogram;
use std::collections::VecDeque;
use std::fmt;

/// Significant figures kept by the tail histogram
const HISTOGRAM_SIGFIGS: u8 = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct LatencySummary {
    pub samples: u64,
    pub failures: u64,
    pub p50_ms: Option<f64>,
    pub avg_ms: Option<f64>,
    pub p95_ms: Option<u64>,
    pub p99_ms: Option<u64>,
}

impl fmt::Display for LatencySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.p50_ms, self.avg_ms, self.p95_ms, self.p99_ms) {
            (Some(p50), Some(avg), Some(p95), Some(p99)) => write!(
                f,
                "n={} p50={:.2}ms avg={:.2}ms p95={}ms p99={}ms fail={}",
                self.samples, p50, avg, p95, p99, self.failures
            ),
            _ => write!(f, "n={} fail={}", self.samples, self.failures),
        }
    }
}

pub struct LatencyStats {
    window: VecDeque<u64>,
    window_size: usize,
    samples: u64,
    sum_ms: u128,
    failures: u64,
    histogram: Histogram<u64>,
}

impl LatencyStats {
    /// Keep the `window_size` most recent samples for the median
    pub fn new(window_size: usize) -> Result<Self> {
        if window_size == 0 {
            return Err(Error::InvalidConfig("sample window must be > 0".into()));
        }
        let histogram = Histogram::new(HISTOGRAM_SIGFIGS)
            .map_err(|e| Error::Internal(format!("latency histogram: {}", e)))?;

        Ok(Self {
            window: VecDeque::with_capacity(window_size.min(4096)),
            window_size,
            samples: 0,
            sum_ms: 0,
            failures: 0,
            histogram,
        })
    }

    /// Append one visibility latency
    pub fn record(&mut self, latency_ms: u64) {
        if self.window.len() == self.window_size {
            self.window.pop_front();
        }
        self.window.push_back(latency_ms);
        self.samples += 1;
        self.sum_ms += latency_ms as u128;
        self.histogram.saturating_record(latency_ms);
    }

    /// Count a probe that never became visible
    pub fn record_failure(&mut self) {
        self.failures += 1;
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Median of the retained window; even counts average the middle pair
    pub fn median(&self) -> Option<f64> {
        if self.window.is_empty() {
            return None;
        }
        let mut sorted: Vec<u64> = self.window.iter().copied().collect();
        sorted.sort_unstable();
        let mid = sorted.len() / 2;
        Some(if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) as f64 / 2.0
        } else {
            sorted[mid] as f64
        })
    }

    pub fn mean(&self) -> Option<f64> {
        (self.samples > 0).then(|| self.sum_ms as f64 / self.samples as f64)
    }

    pub fn quantile(&self, q: f64) -> Option<u64> {
        (self.samples > 0).then(|| self.histogram.value_at_quantile(q))
    }

    pub fn summary(&self) -> LatencySummary {
        LatencySummary {
            samples: self.samples,
            failures: self.failures,
            p50_ms: self.median(),
            avg_ms: self.mean(),
            p95_ms: self.quantile(0.95),
            p99_ms: self.quantile(0.99),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        let stats = LatencyStats::new(10).unwrap();
        let summary = stats.summary();
        assert_eq!(summary.samples, 0);
        assert!(summary.p50_ms.is_none());
        assert_eq!(summary.to_string(), "n=0 fail=0");
    }

    #[test]
    fn test_median_and_mean() {
        let mut stats = LatencyStats::new(100).unwrap();
        for latency in [10, 30, 20] {
            stats.record(latency);
        }
        assert_eq!(stats.median(), Some(20.0));
        stats.record(40);
        assert_eq!(stats.median(), Some(25.0));
        assert_eq!(stats.mean(), Some(25.0));
    }

    #[test]
    fn test_window_bounds_median_not_totals() {
        let mut stats = LatencyStats::new(3).unwrap();
        for latency in [1000, 1000, 1000, 5, 6, 7] {
            stats.record(latency);
        }
        assert_eq!(stats.median(), Some(6.0));
        assert_eq!(stats.samples(), 6);
        assert_eq!(stats.mean(), Some(503.0));
    }

    #[test]
    fn test_failures_and_display() {
        let mut stats = LatencyStats::new(10).unwrap();
        stats.record(12);
        stats.record(14);
        stats.record_failure();

        let summary = stats.summary();
        assert_eq!(summary.failures, 1);
        assert_eq!(summary.p99_ms, Some(14));
        assert_eq!(
            summary.to_string(),
            "n=2 p50=13.00ms avg=13.00ms p95=14ms p99=14ms fail=1"
        );
    }

    #[test]
    fn test_zero_window_rejected() {
        assert!(LatencyStats::new(0).is_err());
    }
}
