use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A simple percentile tracker that maintains a sliding window of measurements
#[derive(Debug, Clone)]
pub struct PercentileTracker {
    measurements: Arc<Mutex<VecDeque<u64>>>,
    window_size: usize,
}

impl PercentileTracker {
    /// Create a new percentile tracker with a specified window size
    pub fn new(window_size: usize) -> Self {
        Self {
            measurements: Arc::new(Mutex::new(VecDeque::with_capacity(window_size))),
            window_size: window_size.max(1),
        }
    }

    /// Record a duration
    pub fn record(&self, duration: Duration) {
        let mut measurements = self.measurements.lock();
        if measurements.len() >= self.window_size {
            measurements.pop_front();
        }
        measurements.push_back(duration.as_micros() as u64);
    }

    /// Value at quantile `p` (0.0-1.0) in milliseconds, 0 when nothing was recorded
    pub fn percentile_ms(&self, p: f64) -> f64 {
        let measurements = self.measurements.lock();
        if measurements.is_empty() {
            return 0.0;
        }

        let mut sorted: Vec<_> = measurements.iter().copied().collect();
        sorted.sort_unstable();

        let idx = ((sorted.len() as f64 * p).ceil() as usize).saturating_sub(1);
        sorted[idx.min(sorted.len() - 1)] as f64 / 1000.0
    }

    pub fn count(&self) -> usize {
        self.measurements.lock().len()
    }
}

/// Run-wide counters shared by the producer and aggregator threads
#[derive(Debug, Clone)]
pub struct PipelineMetrics {
    files_processed: Arc<AtomicU64>,
    pages_produced: Arc<AtomicU64>,
    pages_consumed: Arc<AtomicU64>,
    pages_rejected: Arc<AtomicU64>,
    blocked_pushes: Arc<AtomicU64>,
    file_latency: PercentileTracker,
    start_time: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            files_processed: Arc::new(AtomicU64::new(0)),
            pages_produced: Arc::new(AtomicU64::new(0)),
            pages_consumed: Arc::new(AtomicU64::new(0)),
            pages_rejected: Arc::new(AtomicU64::new(0)),
            blocked_pushes: Arc::new(AtomicU64::new(0)),
            file_latency: PercentileTracker::new(1000),
            start_time: Instant::now(),
        }
    }

    /// Record a fully decoded input file and how long it took
    pub fn record_file(&self, elapsed: Duration) {
        self.files_processed.fetch_add(1, Ordering::Relaxed);
        self.file_latency.record(elapsed);
    }

    pub fn record_produced(&self) {
        self.pages_produced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_consumed(&self) {
        self.pages_consumed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.pages_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_blocked_pushes(&self, count: u64) {
        self.blocked_pushes.store(count, Ordering::Relaxed);
    }

    pub fn files_processed(&self) -> u64 {
        self.files_processed.load(Ordering::Relaxed)
    }

    pub fn pages_produced(&self) -> u64 {
        self.pages_produced.load(Ordering::Relaxed)
    }

    pub fn pages_consumed(&self) -> u64 {
        self.pages_consumed.load(Ordering::Relaxed)
    }

    pub fn pages_rejected(&self) -> u64 {
        self.pages_rejected.load(Ordering::Relaxed)
    }

    /// Pages consumed per second since the metrics were created
    pub fn throughput_pps(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed == 0.0 {
            0.0
        } else {
            self.pages_consumed() as f64 / elapsed
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            files_processed: self.files_processed(),
            pages_produced: self.pages_produced(),
            pages_consumed: self.pages_consumed(),
            pages_rejected: self.pages_rejected(),
            blocked_pushes: self.blocked_pushes.load(Ordering::Relaxed),
            throughput_pps: self.throughput_pps(),
            file_p50_ms: self.file_latency.percentile_ms(0.50),
            file_p95_ms: self.file_latency.percentile_ms(0.95),
            file_p99_ms: self.file_latency.percentile_ms(0.99),
            elapsed: self.start_time.elapsed(),
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A snapshot of metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub files_processed: u64,
    pub pages_produced: u64,
    pub pages_consumed: u64,
    pub pages_rejected: u64,
    pub blocked_pushes: u64,
    pub throughput_pps: f64,
    pub file_p50_ms: f64,
    pub file_p95_ms: f64,
    pub file_p99_ms: f64,
    pub elapsed: Duration,
}

impl MetricsSnapshot {
    /// Format metrics as a human-readable string
    pub fn format(&self) -> String {
        format!(
            "Files: {}, Pages produced: {}, consumed: {}, rejected: {}, Blocked pushes: {}, \
             Throughput: {:.2} pages/s, File time P50: {:.2}ms, P95: {:.2}ms, P99: {:.2}ms, Elapsed: {:.2}s",
            self.files_processed,
            self.pages_produced,
            self.pages_consumed,
            self.pages_rejected,
            self.blocked_pushes,
            self.throughput_pps,
            self.file_p50_ms,
            self.file_p95_ms,
            self.file_p99_ms,
            self.elapsed.as_secs_f64()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_tracker() {
        let tracker = PercentileTracker::new(10);
        for i in 1..=10 {
            tracker.record(Duration::from_millis(i));
        }
        assert_eq!(tracker.percentile_ms(0.5), 5.0);
        assert_eq!(tracker.percentile_ms(0.99), 10.0);
        assert!(PercentileTracker::new(4).percentile_ms(0.5) == 0.0);
    }

    #[test]
    fn test_percentile_window_slides() {
        let tracker = PercentileTracker::new(2);
        tracker.record(Duration::from_millis(100));
        tracker.record(Duration::from_millis(1));
        tracker.record(Duration::from_millis(2));
        assert_eq!(tracker.count(), 2);
        assert_eq!(tracker.percentile_ms(1.0), 2.0);
    }

    #[test]
    fn test_pipeline_metrics() {
        let metrics = PipelineMetrics::new();
        let shared = metrics.clone();
        for _ in 0..100 {
            shared.record_produced();
            shared.record_consumed();
        }
        shared.record_rejected();
        shared.record_file(Duration::from_millis(3));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.pages_produced, 100);
        assert_eq!(snapshot.pages_consumed, 100);
        assert_eq!(snapshot.pages_rejected, 1);
        assert_eq!(snapshot.files_processed, 1);
        assert!(snapshot.format().contains("consumed: 100"));
    }
}
