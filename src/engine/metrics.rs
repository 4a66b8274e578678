//! CASK - Engine Metrics & Observability
//! Provides atomic counters for tracking engine operations
//! in a lock-free, thread-safe manner using `AtomicU64`.
//!
//! Readers update counters while holding only a shared lock, so every
//! counter must be updatable through `&self`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Atomic operation counters for the Cask engine.
///
/// All counters use `Ordering::Relaxed`; they are for observability
/// only and never used for synchronization.
#[derive(Debug)]
pub struct EngineMetrics {
    /// Total number of `put` operations.
    pub puts: AtomicU64,
    /// Total number of `get` operations.
    pub gets: AtomicU64,
    /// Total number of `delete` operations.
    pub deletes: AtomicU64,
    /// Total number of completed compactions.
    pub compactions: AtomicU64,
    /// Compactions that returned an error.
    pub compaction_failures: AtomicU64,
    /// Total bytes appended to the log (encoded records).
    pub bytes_written: AtomicU64,
    /// Total bytes read (values returned by get).
    pub bytes_read: AtomicU64,
    /// Total log bytes reclaimed by compaction.
    pub bytes_reclaimed: AtomicU64,
    /// Records replayed when the store was opened.
    pub records_recovered: AtomicU64,
    /// Timestamp when the engine was opened.
    engine_started: Instant,
}

impl EngineMetrics {
    /// Create a new metrics instance with all counters at zero.
    pub fn new() -> Self {
        Self {
            puts: AtomicU64::new(0),
            gets: AtomicU64::new(0),
            deletes: AtomicU64::new(0),
            compactions: AtomicU64::new(0),
            compaction_failures: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            bytes_read: AtomicU64::new(0),
            bytes_reclaimed: AtomicU64::new(0),
            records_recovered: AtomicU64::new(0),
            engine_started: Instant::now(),
        }
    }

    /// Record a put that appended `record_len` bytes.
    pub fn record_put(&self, record_len: usize) {
        self.puts.fetch_add(1, Ordering::Relaxed);
        self.bytes_written
            .fetch_add(record_len as u64, Ordering::Relaxed);
    }

    /// Record a get operation.
    pub fn record_get(&self, value_size: Option<usize>) {
        self.gets.fetch_add(1, Ordering::Relaxed);
        if let Some(size) = value_size {
            self.bytes_read.fetch_add(size as u64, Ordering::Relaxed);
        }
    }

    /// Record a delete that appended a tombstone of `record_len` bytes.
    pub fn record_delete(&self, record_len: usize) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
        self.bytes_written
            .fetch_add(record_len as u64, Ordering::Relaxed);
    }

    /// Record a finished compaction.
    pub fn record_compaction(&self, reclaimed: u64) {
        self.compactions.fetch_add(1, Ordering::Relaxed);
        self.bytes_reclaimed.fetch_add(reclaimed, Ordering::Relaxed);
    }

    pub fn record_compaction_failure(&self) {
        self.compaction_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the number of records replayed at open.
    pub fn record_recovery(&self, records: u64) {
        self.records_recovered.fetch_add(records, Ordering::Relaxed);
    }

    /// Get engine uptime in seconds.
    pub fn uptime_secs(&self) -> f64 {
        self.engine_started.elapsed().as_secs_f64()
    }

    /// Get total number of operations (puts + gets + deletes).
    pub fn total_ops(&self) -> u64 {
        self.puts.load(Ordering::Relaxed)
            + self.gets.load(Ordering::Relaxed)
            + self.deletes.load(Ordering::Relaxed)
    }

    /// Get operations per second since engine start.
    pub fn ops_per_sec(&self) -> f64 {
        let uptime = self.uptime_secs();
        if uptime < 0.001 {
            return 0.0;
        }
        self.total_ops() as f64 / uptime
    }

    /// Format metrics as a human-readable report.
    pub fn report(&self) -> String {
        format!(
            "\n═══ CASK Engine Metrics ═══\n\
             Operations:\n\
               puts:        {}\n\
               gets:        {}\n\
               deletes:     {}\n\
               compactions: {}\n\
               failed:      {}\n\
             Throughput:\n\
               total ops:   {}\n\
               ops/sec:     {:.2}\n\
             I/O:\n\
               written:     {} bytes\n\
               read:        {} bytes\n\
               reclaimed:   {} bytes\n\
             Recovery:\n\
               records:     {}\n\
             Uptime: {:.2}s",
            self.puts.load(Ordering::Relaxed),
            self.gets.load(Ordering::Relaxed),
            self.deletes.load(Ordering::Relaxed),
            self.compactions.load(Ordering::Relaxed),
            self.compaction_failures.load(Ordering::Relaxed),
            self.total_ops(),
            self.ops_per_sec(),
            self.bytes_written.load(Ordering::Relaxed),
            self.bytes_read.load(Ordering::Relaxed),
            self.bytes_reclaimed.load(Ordering::Relaxed),
            self.records_recovered.load(Ordering::Relaxed),
            self.uptime_secs(),
        )
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_operations() {
        let m = EngineMetrics::new();

        m.record_put(20);
        m.record_put(30);
        m.record_get(Some(10));
        m.record_get(None); // miss
        m.record_delete(14);
        m.record_compaction(64);
        m.record_compaction_failure();
        m.record_recovery(3);

        assert_eq!(m.puts.load(Ordering::Relaxed), 2);
        assert_eq!(m.gets.load(Ordering::Relaxed), 2);
        assert_eq!(m.deletes.load(Ordering::Relaxed), 1);
        assert_eq!(m.compactions.load(Ordering::Relaxed), 1);
        assert_eq!(m.compaction_failures.load(Ordering::Relaxed), 1);
        assert_eq!(m.bytes_written.load(Ordering::Relaxed), 64);
        assert_eq!(m.bytes_read.load(Ordering::Relaxed), 10);
        assert_eq!(m.bytes_reclaimed.load(Ordering::Relaxed), 64);
        assert_eq!(m.records_recovered.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_total_ops() {
        let m = EngineMetrics::new();
        m.record_put(1);
        m.record_get(None);
        m.record_delete(1);
        assert_eq!(m.total_ops(), 3);
    }

    #[test]
    fn test_report_format() {
        let m = EngineMetrics::new();
        m.record_put(30);
        let report = m.report();
        assert!(report.contains("puts:"));
        assert!(report.contains("compactions:"));
        assert!(report.contains("reclaimed:"));
    }

    #[test]
    fn test_default() {
        let m = EngineMetrics::default();
        assert_eq!(m.total_ops(), 0);
    }
}
