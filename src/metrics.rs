//! Prediction statistics for one form session.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::info;

/// Recent latencies kept for percentile reporting
const LATENCY_WINDOW: usize = 1000;

/// Metrics collector for predictions made during a session
pub struct SessionMetrics {
    /// Successful predictions
    pub predictions: AtomicU64,
    /// Failed predictions
    pub failures: AtomicU64,
    /// Failures by classified kind
    failures_by_kind: RwLock<HashMap<String, u64>>,
    /// Inference latencies (in microseconds)
    latencies: RwLock<Vec<u64>>,
    /// Sum of predicted values, for the session mean
    value_sum: RwLock<f64>,
    start_time: Instant,
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self {
            predictions: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            failures_by_kind: RwLock::new(HashMap::new()),
            latencies: RwLock::new(Vec::with_capacity(64)),
            value_sum: RwLock::new(0.0),
            start_time: Instant::now(),
        }
    }

    /// Record a successful prediction
    pub fn record_prediction(&self, latency: Duration, value: f64) {
        self.predictions.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut times) = self.latencies.write() {
            times.push(latency.as_micros() as u64);
            if times.len() > LATENCY_WINDOW {
                times.drain(0..LATENCY_WINDOW / 2);
            }
        }

        if let Ok(mut sum) = self.value_sum.write() {
            *sum += value;
        }
    }

    /// Record a failed prediction
    pub fn record_failure(&self, kind: &str) {
        self.failures.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut by_kind) = self.failures_by_kind.write() {
            *by_kind.entry(kind.to_string()).or_insert(0) += 1;
        }
    }

    /// Latency statistics over the recent window
    pub fn get_latency_stats(&self) -> LatencyStats {
        let Ok(times) = self.latencies.read() else {
            return LatencyStats::default();
        };
        if times.is_empty() {
            return LatencyStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        LatencyStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p99_us: sorted[((count as f64 * 0.99) as usize).min(count - 1)],
            max_us: *sorted.last().unwrap_or(&0),
        }
    }

    /// Failure counts by kind
    pub fn get_failures_by_kind(&self) -> HashMap<String, u64> {
        self.failures_by_kind
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Mean of all successful predictions, if any
    pub fn get_mean_prediction(&self) -> Option<f64> {
        let count = self.predictions.load(Ordering::Relaxed);
        if count == 0 {
            return None;
        }
        self.value_sum.read().ok().map(|sum| *sum / count as f64)
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let predictions = self.predictions.load(Ordering::Relaxed);
        let failures = self.failures.load(Ordering::Relaxed);
        let latency = self.get_latency_stats();

        info!(
            predictions = predictions,
            failures = failures,
            session_secs = self.start_time.elapsed().as_secs(),
            "Session summary"
        );

        if predictions > 0 {
            info!(
                mean_us = latency.mean_us,
                p50_us = latency.p50_us,
                p99_us = latency.p99_us,
                max_us = latency.max_us,
                mean_prediction = self.get_mean_prediction().unwrap_or_default(),
                "Inference latency"
            );
        }

        for (kind, count) in &self.get_failures_by_kind() {
            info!(kind = %kind, count = count, "Prediction failures");
        }
    }
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Inference latency statistics
#[derive(Debug, Default, PartialEq, Eq)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording() {
        let metrics = SessionMetrics::new();

        metrics.record_prediction(Duration::from_micros(100), 0.2);
        metrics.record_prediction(Duration::from_micros(300), 0.4);
        metrics.record_failure("runtime");
        metrics.record_failure("runtime");
        metrics.record_failure("non_finite");

        assert_eq!(metrics.predictions.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.failures.load(Ordering::Relaxed), 3);

        let by_kind = metrics.get_failures_by_kind();
        assert_eq!(by_kind.get("runtime"), Some(&2));
        assert_eq!(by_kind.get("non_finite"), Some(&1));

        let mean = metrics.get_mean_prediction().unwrap();
        assert!((mean - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_latency_stats() {
        let metrics = SessionMetrics::new();
        for us in [50, 10, 40, 20, 30] {
            metrics.record_prediction(Duration::from_micros(us), 0.0);
        }

        let stats = metrics.get_latency_stats();

        assert_eq!(stats.count, 5);
        assert_eq!(stats.mean_us, 30);
        assert_eq!(stats.p50_us, 30);
        assert_eq!(stats.p99_us, 50);
        assert_eq!(stats.max_us, 50);
    }

    #[test]
    fn test_empty_metrics() {
        let metrics = SessionMetrics::new();
        assert_eq!(metrics.get_latency_stats(), LatencyStats::default());
        assert_eq!(metrics.get_mean_prediction(), None);
    }
}
