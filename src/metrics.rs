// Monitor metrics module
//
// Lightweight counters for the polling and persistence loops

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Monitor engine metrics
///
/// Uses atomic operations for thread-safe tracking without locks. Both loops
/// and the facade record into the same instance; the summary is logged on
/// shutdown.
#[derive(Debug)]
pub struct Metrics {
    /// Completed polling iterations
    pub polls: AtomicU64,

    /// Organic changes written to the history
    pub changes_logged: AtomicU64,

    /// Self-inflicted changes absorbed by the polling loop without a new row
    pub changes_absorbed: AtomicU64,

    /// Writes made by persistence mode
    pub corrections: AtomicU64,

    /// Setting store reads that failed
    pub read_failures: AtomicU64,

    /// History rows that could not be written
    pub log_write_failures: AtomicU64,

    /// Loop iterations that ended in an error or panic
    pub loop_errors: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            polls: AtomicU64::new(0),
            changes_logged: AtomicU64::new(0),
            changes_absorbed: AtomicU64::new(0),
            corrections: AtomicU64::new(0),
            read_failures: AtomicU64::new(0),
            log_write_failures: AtomicU64::new(0),
            loop_errors: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_poll(&self) {
        self.polls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_change_logged(&self) {
        self.changes_logged.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_change_absorbed(&self) {
        self.changes_absorbed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_correction(&self) {
        self.corrections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_read_failure(&self) {
        self.read_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_log_write_failure(&self) {
        self.log_write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_loop_error(&self) {
        self.loop_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!("=== Monitor Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Polls: {}, changes logged: {}, absorbed: {}, corrections: {}",
            self.polls.load(Ordering::Relaxed),
            self.changes_logged.load(Ordering::Relaxed),
            self.changes_absorbed.load(Ordering::Relaxed),
            self.corrections.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Failures: {} reads, {} log writes, {} loop errors",
            self.read_failures.load(Ordering::Relaxed),
            self.log_write_failures.load(Ordering::Relaxed),
            self.loop_errors.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
