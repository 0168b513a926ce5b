//! Process-wide request metrics
//!
//! Counters are plain atomics; the summary is computed on demand for the
//! `/metrics` endpoint.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Endpoint families counted separately
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Compare,
    Templates,
    Render,
    Other,
}

#[derive(Debug)]
pub struct Metrics {
    total_requests: AtomicU64,
    compare_requests: AtomicU64,
    template_requests: AtomicU64,
    render_requests: AtomicU64,
    comparisons_failed: AtomicU64,
    provider_errors: AtomicU64,
    compare_time_micros: AtomicU64,
    started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestCounts {
    pub total: u64,
    pub compare: u64,
    pub templates: u64,
    pub render: u64,
    pub requests_per_second: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceSummary {
    pub average_compare_time: f64,
    pub total_compare_time: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorCounts {
    pub comparisons_failed: u64,
    pub provider_errors: u64,
    pub compare_error_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub started_at: DateTime<Utc>,
    pub uptime_seconds: f64,
    pub total_requests: u64,
    pub requests: RequestCounts,
    pub performance: PerformanceSummary,
    pub errors: ErrorCounts,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            compare_requests: AtomicU64::new(0),
            template_requests: AtomicU64::new(0),
            render_requests: AtomicU64::new(0),
            comparisons_failed: AtomicU64::new(0),
            provider_errors: AtomicU64::new(0),
            compare_time_micros: AtomicU64::new(0),
            started_at: Utc::now(),
        }
    }

    pub fn increment_request(&self, endpoint: Endpoint) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        let counter = match endpoint {
            Endpoint::Compare => &self.compare_requests,
            Endpoint::Templates => &self.template_requests,
            Endpoint::Render => &self.render_requests,
            Endpoint::Other => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a finished comparison and how many providers failed in it
    pub fn record_comparison(&self, elapsed: Duration, provider_errors: usize, failed: bool) {
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.compare_time_micros.fetch_add(micros, Ordering::Relaxed);
        self.provider_errors
            .fetch_add(provider_errors as u64, Ordering::Relaxed);
        if failed {
            self.comparisons_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        let uptime = (Utc::now() - self.started_at)
            .to_std()
            .unwrap_or_default()
            .as_secs_f64();
        let total = self.total_requests.load(Ordering::Relaxed);
        let compare = self.compare_requests.load(Ordering::Relaxed);
        let failed = self.comparisons_failed.load(Ordering::Relaxed);
        let compare_time =
            Duration::from_micros(self.compare_time_micros.load(Ordering::Relaxed)).as_secs_f64();

        MetricsSummary {
            started_at: self.started_at,
            uptime_seconds: uptime,
            total_requests: total,
            requests: RequestCounts {
                total,
                compare,
                templates: self.template_requests.load(Ordering::Relaxed),
                render: self.render_requests.load(Ordering::Relaxed),
                requests_per_second: ratio(total as f64, uptime),
            },
            performance: PerformanceSummary {
                average_compare_time: ratio(compare_time, compare as f64),
                total_compare_time: compare_time,
            },
            errors: ErrorCounts {
                comparisons_failed: failed,
                provider_errors: self.provider_errors.load(Ordering::Relaxed),
                compare_error_rate: ratio(failed as f64, compare as f64),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_by_endpoint() {
        let metrics = Metrics::new();
        metrics.increment_request(Endpoint::Compare);
        metrics.increment_request(Endpoint::Compare);
        metrics.increment_request(Endpoint::Templates);
        metrics.increment_request(Endpoint::Other);

        let summary = metrics.summary();
        assert_eq!(summary.total_requests, 4);
        assert_eq!(summary.requests.compare, 2);
        assert_eq!(summary.requests.templates, 1);
        assert_eq!(summary.requests.render, 0);
    }

    #[test]
    fn test_comparison_timing_and_errors() {
        let metrics = Metrics::new();
        metrics.increment_request(Endpoint::Compare);
        metrics.increment_request(Endpoint::Compare);
        metrics.record_comparison(Duration::from_millis(1500), 1, false);
        metrics.record_comparison(Duration::from_millis(500), 2, true);

        let summary = metrics.summary();
        assert!((summary.performance.total_compare_time - 2.0).abs() < 1e-9);
        assert!((summary.performance.average_compare_time - 1.0).abs() < 1e-9);
        assert_eq!(summary.errors.provider_errors, 3);
        assert_eq!(summary.errors.comparisons_failed, 1);
        assert!((summary.errors.compare_error_rate - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_empty_summary_has_no_nan() {
        let summary = Metrics::new().summary();
        assert_eq!(summary.performance.average_compare_time, 0.0);
        assert_eq!(summary.errors.compare_error_rate, 0.0);
    }
}
