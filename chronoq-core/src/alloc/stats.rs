//! ## chronoq-core::alloc::stats
//! **Allocation statistics**
//!
//! One `MemoryStats` can be shared by several pools through an `Arc`, giving a
//! simulation a single allocation ledger for scheduler records and whatever
//! payload pools its collaborators build.

use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct MemoryStats {
    allocations: AtomicUsize,
    deallocations: AtomicUsize,
    exhausted: AtomicUsize,
    peak_live: AtomicUsize,
}

impl MemoryStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn increment_allocations(&self) {
        let allocated = self.allocations.fetch_add(1, Ordering::Relaxed) + 1;
        let live = allocated.saturating_sub(self.deallocations.load(Ordering::Relaxed));
        self.peak_live.fetch_max(live, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_deallocations(&self) {
        self.deallocations.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_exhausted(&self) {
        self.exhausted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::Relaxed)
    }

    pub fn deallocations(&self) -> usize {
        self.deallocations.load(Ordering::Relaxed)
    }

    /// Allocations refused because a pool was at capacity.
    pub fn exhausted(&self) -> usize {
        self.exhausted.load(Ordering::Relaxed)
    }

    /// Values currently alive across every pool sharing these stats.
    pub fn live(&self) -> usize {
        self.allocations().saturating_sub(self.deallocations())
    }

    /// Highest `live` value observed.
    pub fn peak_live(&self) -> usize {
        self.peak_live.load(Ordering::Relaxed)
    }
}
