//! Counters for the watch loop.

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters describing watcher activity.
#[derive(Debug, Default)]
pub struct WatchStats {
    /// Change notifications received
    pub events: AtomicU64,
    /// Windows that had dirty paths to process
    pub flushes: AtomicU64,
    /// Successful view rebuilds
    pub rebuilds: AtomicU64,
    /// Failed view rebuilds
    pub failures: AtomicU64,
    /// Errors reported by the watch subsystem
    pub watch_errors: AtomicU64,
}

impl WatchStats {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_event(&self) {
        self.events.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_flush(&self) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rebuild(&self, ok: bool) {
        if ok {
            self.rebuilds.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_watch_error(&self) {
        self.watch_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Successful rebuilds so far.
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds.load(Ordering::Relaxed)
    }

    /// Failed rebuilds so far.
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Flushed windows so far.
    pub fn flush_count(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }

    /// Change notifications so far.
    pub fn event_count(&self) -> u64 {
        self.events.load(Ordering::Relaxed)
    }

    /// Watch subsystem errors so far.
    pub fn watch_error_count(&self) -> u64 {
        self.watch_errors.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_rebuild() {
        let stats = WatchStats::new();
        stats.record_rebuild(true);
        stats.record_rebuild(true);
        stats.record_rebuild(false);

        assert_eq!(stats.rebuild_count(), 2);
        assert_eq!(stats.failure_count(), 1);
    }

    #[test]
    fn test_counters_start_at_zero() {
        let stats = WatchStats::default();
        assert_eq!(stats.event_count(), 0);
        assert_eq!(stats.flush_count(), 0);
        assert_eq!(stats.watch_error_count(), 0);
    }
}
