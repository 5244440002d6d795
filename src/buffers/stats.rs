//! Pool occupancy counters and operation statistics

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

/// Point-in-time free/used pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CounterSnapshot {
    pub free: u8,
    pub used: u8,
}

impl CounterSnapshot {
    /// Packed debug-counter record, `used` first
    pub fn to_bytes(&self) -> [u8; 2] {
        [self.used, self.free]
    }

    pub fn total(&self) -> usize {
        self.free as usize + self.used as usize
    }
}

/// Statistics for message pool monitoring
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Successful allocations, blocking or not
    pub total_allocations: u64,
    /// Allocation attempts that returned no buffer
    pub allocation_failures: u64,
    /// Successful releases
    pub total_releases: u64,
    pub total_posts: u64,
    pub total_gets: u64,
    /// Times `allocate_blocking` had to wait for a slot
    pub blocking_waits: u64,
    /// Highest number of slots out of the free list at once
    pub peak_usage: usize,
}

impl PoolStats {
    /// Calculate allocation success rate (0.0 to 1.0)
    pub fn success_rate(&self) -> f64 {
        let attempts = self.total_allocations + self.allocation_failures;
        if attempts == 0 {
            return 1.0;
        }
        self.total_allocations as f64 / attempts as f64
    }

    /// Get a summary string of the statistics
    pub fn summary(&self) -> String {
        format!(
            "PoolStats {{ allocations: {}, failures: {}, releases: {}, posts: {}, gets: {}, \
             waits: {}, peak: {}, success_rate: {:.2}% }}",
            self.total_allocations,
            self.allocation_failures,
            self.total_releases,
            self.total_posts,
            self.total_gets,
            self.blocking_waits,
            self.peak_usage,
            self.success_rate() * 100.0
        )
    }
}

/// Thread-safe statistics, readable without taking the pool lock
#[derive(Debug, Default)]
pub struct AtomicPoolStats {
    total_allocations: AtomicU64,
    allocation_failures: AtomicU64,
    total_releases: AtomicU64,
    total_posts: AtomicU64,
    total_gets: AtomicU64,
    blocking_waits: AtomicU64,
    peak_usage: AtomicUsize,
}

impl AtomicPoolStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful allocation with the resulting used count
    pub fn record_allocation(&self, used: usize) {
        self.total_allocations.fetch_add(1, Ordering::Relaxed);
        self.peak_usage.fetch_max(used, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.allocation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_release(&self) {
        self.total_releases.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_post(&self) {
        self.total_posts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_get(&self) {
        self.total_gets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_wait(&self) {
        self.blocking_waits.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current statistics snapshot
    pub fn snapshot(&self) -> PoolStats {
        PoolStats {
            total_allocations: self.total_allocations.load(Ordering::Relaxed),
            allocation_failures: self.allocation_failures.load(Ordering::Relaxed),
            total_releases: self.total_releases.load(Ordering::Relaxed),
            total_posts: self.total_posts.load(Ordering::Relaxed),
            total_gets: self.total_gets.load(Ordering::Relaxed),
            blocking_waits: self.blocking_waits.load(Ordering::Relaxed),
            peak_usage: self.peak_usage.load(Ordering::Relaxed),
        }
    }

    /// Reset all statistics
    pub fn reset(&self) {
        self.total_allocations.store(0, Ordering::Relaxed);
        self.allocation_failures.store(0, Ordering::Relaxed);
        self.total_releases.store(0, Ordering::Relaxed);
        self.total_posts.store(0, Ordering::Relaxed);
        self.total_gets.store(0, Ordering::Relaxed);
        self.blocking_waits.store(0, Ordering::Relaxed);
        self.peak_usage.store(0, Ordering::Relaxed);
    }
}
