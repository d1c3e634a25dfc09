//! Statistics tracking for feed fetches and mutations

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Statistics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedStats {
    pub pages_fetched: u64,
    pub page_failures: u64,
    pub mutations_committed: u64,
    pub mutations_rolled_back: u64,
    pub mutations_failed: u64,
    pub mutations_rejected: u64,
    pub completions_discarded: u64,
}

/// Thread-safe statistics collector
#[derive(Clone, Default)]
pub struct StatsCollector {
    pages_fetched: Arc<AtomicU64>,
    page_failures: Arc<AtomicU64>,
    mutations_committed: Arc<AtomicU64>,
    mutations_rolled_back: Arc<AtomicU64>,
    mutations_failed: Arc<AtomicU64>,
    mutations_rejected: Arc<AtomicU64>,
    completions_discarded: Arc<AtomicU64>,
}

impl StatsCollector {
    /// Create new statistics collector
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_page(&self) {
        self.pages_fetched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_page_failure(&self) {
        self.page_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_commit(&self) {
        self.mutations_committed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rollback(&self) {
        self.mutations_rolled_back.fetch_add(1, Ordering::Relaxed);
    }

    /// Confirmation-gated mutation that the server refused
    pub fn record_failure(&self) {
        self.mutations_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejection(&self) {
        self.mutations_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_discard(&self) {
        self.completions_discarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current statistics snapshot
    pub fn snapshot(&self) -> FeedStats {
        FeedStats {
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            page_failures: self.page_failures.load(Ordering::Relaxed),
            mutations_committed: self.mutations_committed.load(Ordering::Relaxed),
            mutations_rolled_back: self.mutations_rolled_back.load(Ordering::Relaxed),
            mutations_failed: self.mutations_failed.load(Ordering::Relaxed),
            mutations_rejected: self.mutations_rejected.load(Ordering::Relaxed),
            completions_discarded: self.completions_discarded.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_collector_new() {
        let collector = StatsCollector::new();
        assert_eq!(collector.snapshot(), FeedStats::default());
    }

    #[test]
    fn test_stats_collector_records() {
        let collector = StatsCollector::new();
        collector.record_page();
        collector.record_page();
        collector.record_commit();
        collector.record_rollback();
        collector.record_rejection();

        let stats = collector.snapshot();
        assert_eq!(stats.pages_fetched, 2);
        assert_eq!(stats.mutations_committed, 1);
        assert_eq!(stats.mutations_rolled_back, 1);
        assert_eq!(stats.mutations_rejected, 1);
        assert_eq!(stats.page_failures, 0);
    }

    #[test]
    fn test_stats_collector_clone() {
        let collector1 = StatsCollector::new();
        collector1.record_discard();

        let collector2 = collector1.clone();
        collector2.record_discard();

        // Both should share the same underlying data
        assert_eq!(collector1.snapshot().completions_discarded, 2);
    }
}
