//! Request metrics and statistics tracking for the prediction service.

use crate::error::ErrorKind;
use crate::types::response::PredictionClass;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Latency samples kept for percentile calculation
const LATENCY_WINDOW: usize = 10_000;

/// Metrics collector for the prediction endpoint
pub struct ServiceMetrics {
    /// Total `/predict` requests handled
    pub requests: AtomicU64,
    /// Requests answered with a prediction
    pub successes: AtomicU64,
    /// Failures indexed like `ErrorKind::ALL`
    failures: [AtomicU64; 4],
    /// Predictions per class (negative, positive)
    classes: [AtomicU64; 2],
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Start time for rate calculation
    start_time: Instant,
    started_at: DateTime<Utc>,
}

impl ServiceMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            requests: AtomicU64::new(0),
            successes: AtomicU64::new(0),
            failures: Default::default(),
            classes: Default::default(),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            start_time: Instant::now(),
            started_at: Utc::now(),
        }
    }

    /// Record a successful prediction
    pub fn record_success(&self, processing_time: Duration, class: PredictionClass) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.successes.fetch_add(1, Ordering::Relaxed);
        self.classes[class.as_u8() as usize].fetch_add(1, Ordering::Relaxed);
        self.record_time(processing_time);
    }

    /// Record a failed request
    pub fn record_failure(&self, processing_time: Duration, kind: ErrorKind) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.failures[failure_index(kind)].fetch_add(1, Ordering::Relaxed);
        self.record_time(processing_time);
    }

    fn record_time(&self, processing_time: Duration) {
        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            if times.len() > LATENCY_WINDOW {
                times.drain(0..LATENCY_WINDOW / 2);
            }
        }
    }

    /// Failures of one kind
    pub fn failures(&self, kind: ErrorKind) -> u64 {
        self.failures[failure_index(kind)].load(Ordering::Relaxed)
    }

    /// Predictions of one class
    pub fn predictions(&self, class: PredictionClass) -> u64 {
        self.classes[class.as_u8() as usize].load(Ordering::Relaxed)
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let mut sorted = match self.processing_times.read() {
            Ok(times) if !times.is_empty() => times.clone(),
            _ => return ProcessingStats::default(),
        };
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[(count as f64 * 0.95) as usize],
            p99_us: sorted[(count as f64 * 0.99) as usize],
            max_us: *sorted.last().unwrap_or(&0),
        }
    }

    /// Requests per second since startup
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.requests.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Point-in-time view for the metrics endpoint
    pub fn snapshot(&self) -> MetricsSnapshot {
        let failures = ErrorKind::ALL
            .iter()
            .map(|&kind| (kind.as_str(), self.failures(kind)))
            .collect();

        MetricsSnapshot {
            started_at: self.started_at,
            uptime_secs: self.start_time.elapsed().as_secs(),
            requests: self.requests.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            failures,
            predictions: ClassCounts {
                negative: self.predictions(PredictionClass::Negative),
                positive: self.predictions(PredictionClass::Positive),
            },
            throughput_rps: self.get_throughput(),
            latency: self.get_processing_stats(),
        }
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let snapshot = self.snapshot();
        let failed: u64 = snapshot.failures.values().sum();
        let latency = &snapshot.latency;

        info!(
            requests = snapshot.requests,
            successes = snapshot.successes,
            failed = failed,
            positive = snapshot.predictions.positive,
            negative = snapshot.predictions.negative,
            throughput = format!("{:.2} req/s", snapshot.throughput_rps),
            "Prediction service summary"
        );
        info!(
            mean_us = latency.mean_us,
            p50_us = latency.p50_us,
            p95_us = latency.p95_us,
            p99_us = latency.p99_us,
            max_us = latency.max_us,
            "Request latency"
        );
        for (kind, count) in snapshot.failures.iter().filter(|(_, c)| **c > 0) {
            info!(kind = %kind, count = count, "Failed requests");
        }
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn failure_index(kind: ErrorKind) -> usize {
    match kind {
        ErrorKind::BackendUnavailable => 0,
        ErrorKind::Input => 1,
        ErrorKind::Preprocessing => 2,
        ErrorKind::Model => 3,
    }
}

/// Processing time statistics
#[derive(Debug, Default, Clone, Serialize)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassCounts {
    pub negative: u64,
    pub positive: u64,
}

/// Serializable metrics view
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
    pub requests: u64,
    pub successes: u64,
    pub failures: BTreeMap<&'static str, u64>,
    pub predictions: ClassCounts,
    pub throughput_rps: f64,
    pub latency: ProcessingStats,
}

/// Metrics reporter that logs periodic summaries
pub struct MetricsReporter {
    metrics: Arc<ServiceMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<ServiceMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let period = Duration::from_secs(self.interval_secs.max(1));
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
