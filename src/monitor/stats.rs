//! Counters shared between the monitor loop and its delivery tasks.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct MonitorStats {
    cycles: AtomicU64,
    failed_cycles: AtomicU64,
    notifications_sent: AtomicU64,
    notifications_failed: AtomicU64,
}

impl MonitorStats {
    pub fn record_cycle(&self, ok: bool) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.failed_cycles.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_delivery(&self, ok: bool) {
        let counter = if ok { &self.notifications_sent } else { &self.notifications_failed };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            failed_cycles: self.failed_cycles.load(Ordering::Relaxed),
            notifications_sent: self.notifications_sent.load(Ordering::Relaxed),
            notifications_failed: self.notifications_failed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`MonitorStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub cycles: u64,
    pub failed_cycles: u64,
    pub notifications_sent: u64,
    pub notifications_failed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let stats = MonitorStats::default();
        stats.record_cycle(true);
        stats.record_cycle(false);
        stats.record_delivery(true);
        stats.record_delivery(true);
        stats.record_delivery(false);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.cycles, 2);
        assert_eq!(snapshot.failed_cycles, 1);
        assert_eq!(snapshot.notifications_sent, 2);
        assert_eq!(snapshot.notifications_failed, 1);
    }
}
