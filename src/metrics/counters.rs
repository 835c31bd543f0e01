//! Atomic counters for hot-path metrics
//!
//! Lock-free counters updated outside the pool lock.

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-pool event counters
#[derive(Debug, Default)]
pub struct PoolCounters {
    allocations: AtomicU64,
    releases: AtomicU64,
    growth_events: AtomicU64,
    allocation_failures: AtomicU64,
}

impl PoolCounters {
    pub const fn new() -> Self {
        Self {
            allocations: AtomicU64::new(0),
            releases: AtomicU64::new(0),
            growth_events: AtomicU64::new(0),
            allocation_failures: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn allocated(&self) {
        self.allocations.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn released(&self) {
        self.releases.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn grew(&self) {
        self.growth_events.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn allocation_failed(&self) {
        self.allocation_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Combine counters with the pool's structural figures
    pub fn snapshot(
        &self,
        slot_size: usize,
        page_size: usize,
        pages: usize,
        capacity: usize,
        in_use: usize,
    ) -> PoolStats {
        PoolStats {
            slot_size,
            page_size,
            pages,
            capacity,
            in_use,
            allocations: self.allocations.load(Ordering::Relaxed),
            releases: self.releases.load(Ordering::Relaxed),
            growth_events: self.growth_events.load(Ordering::Relaxed),
            allocation_failures: self.allocation_failures.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of pool state for reporting
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub slot_size: usize,
    pub page_size: usize,
    pub pages: usize,
    pub capacity: usize,
    pub in_use: usize,
    pub allocations: u64,
    pub releases: u64,
    pub growth_events: u64,
    pub allocation_failures: u64,
}

impl PoolStats {
    pub fn free(&self) -> usize {
        self.capacity - self.in_use
    }
}
