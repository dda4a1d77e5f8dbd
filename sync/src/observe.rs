use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Cheap monotonic counters for embedders that want to watch the poller.
/// Reads go through `snapshot`. Relaxed ordering is enough for trend
/// numbers.
#[derive(Debug, Default)]
pub struct SyncCounters {
    polls_total: AtomicU64,
    poll_failures_total: AtomicU64,
    updates_applied_total: AtomicU64,
    visuals_suppressed_total: AtomicU64,
    fallbacks_applied_total: AtomicU64,
    stale_polls_discarded_total: AtomicU64,
    resources_discovered_total: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CountersSnapshot {
    pub polls_total: u64,
    pub poll_failures_total: u64,
    pub updates_applied_total: u64,
    pub visuals_suppressed_total: u64,
    pub fallbacks_applied_total: u64,
    pub stale_polls_discarded_total: u64,
    pub resources_discovered_total: u64,
}

impl SyncCounters {
    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            polls_total: self.polls_total.load(Ordering::Relaxed),
            poll_failures_total: self.poll_failures_total.load(Ordering::Relaxed),
            updates_applied_total: self.updates_applied_total.load(Ordering::Relaxed),
            visuals_suppressed_total: self.visuals_suppressed_total.load(Ordering::Relaxed),
            fallbacks_applied_total: self.fallbacks_applied_total.load(Ordering::Relaxed),
            stale_polls_discarded_total: self.stale_polls_discarded_total.load(Ordering::Relaxed),
            resources_discovered_total: self.resources_discovered_total.load(Ordering::Relaxed),
        }
    }

    pub fn record_poll(&self) {
        self.polls_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_poll_failure(&self) {
        self.poll_failures_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_updates_applied(&self, count: u64) {
        self.updates_applied_total.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_visuals_suppressed(&self, count: u64) {
        self.visuals_suppressed_total
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_fallback_applied(&self) {
        self.fallbacks_applied_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_poll_discarded(&self) {
        self.stale_polls_discarded_total
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_resources_discovered(&self, count: u64) {
        self.resources_discovered_total
            .fetch_add(count, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::SyncCounters;

    #[test]
    fn snapshot_reflects_recorded_counts() {
        let counters = SyncCounters::default();
        counters.record_poll();
        counters.record_poll();
        counters.record_poll_failure();
        counters.record_updates_applied(3);
        counters.record_visuals_suppressed(1);
        counters.record_fallback_applied();
        counters.record_stale_poll_discarded();
        counters.record_resources_discovered(2);

        let snap = counters.snapshot();
        assert_eq!(snap.polls_total, 2);
        assert_eq!(snap.poll_failures_total, 1);
        assert_eq!(snap.updates_applied_total, 3);
        assert_eq!(snap.visuals_suppressed_total, 1);
        assert_eq!(snap.fallbacks_applied_total, 1);
        assert_eq!(snap.stale_polls_discarded_total, 1);
        assert_eq!(snap.resources_discovered_total, 2);
    }
}
