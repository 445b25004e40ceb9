//! Raw block providers for exercising arena growth and teardown.

#![allow(unsafe_code)]

use std::alloc::Layout;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use allocator_api2::alloc::{AllocError, Allocator, Global};

/// Shared counters for a [`CountingAllocator`] or [`BudgetAllocator`].
///
/// Held behind an `Arc` so tests can inspect them after the allocator has
/// been moved into (and dropped with) an arena.
#[derive(Debug, Default)]
pub struct AllocStats {
    acquired: AtomicUsize,
    released: AtomicUsize,
    live_bytes: AtomicUsize,
}

impl AllocStats {
    /// Number of successful `allocate` calls.
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::Relaxed)
    }

    /// Number of `deallocate` calls.
    pub fn released(&self) -> usize {
        self.released.load(Ordering::Relaxed)
    }

    /// Bytes acquired and not yet released.
    pub fn live_bytes(&self) -> usize {
        self.live_bytes.load(Ordering::Relaxed)
    }

    fn record_acquire(&self, size: usize) {
        self.acquired.fetch_add(1, Ordering::Relaxed);
        self.live_bytes.fetch_add(size, Ordering::Relaxed);
    }

    fn record_release(&self, size: usize) {
        self.released.fetch_add(1, Ordering::Relaxed);
        self.live_bytes.fetch_sub(size, Ordering::Relaxed);
    }
}

/// Forwards to [`Global`] and counts every acquire and release.
#[derive(Clone, Debug, Default)]
pub struct CountingAllocator {
    stats: Arc<AllocStats>,
}

impl CountingAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the counters, valid after the allocator is dropped.
    pub fn stats(&self) -> Arc<AllocStats> {
        Arc::clone(&self.stats)
    }
}

// SAFETY: every block comes from `Global` and is returned to it unchanged.
unsafe impl Allocator for CountingAllocator {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        let block = Global.allocate(layout)?;
        self.stats.record_acquire(layout.size());
        Ok(block)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.stats.record_release(layout.size());
        // SAFETY: forwarded from the caller; `ptr` came from `Global`.
        unsafe { Global.deallocate(ptr, layout) }
    }
}

/// A [`CountingAllocator`] that refuses requests once `budget` live bytes
/// would be exceeded. Released bytes return to the budget.
#[derive(Debug)]
pub struct BudgetAllocator {
    inner: CountingAllocator,
    budget: usize,
}

impl BudgetAllocator {
    pub fn new(budget: usize) -> Self {
        Self {
            inner: CountingAllocator::new(),
            budget,
        }
    }

    pub fn stats(&self) -> Arc<AllocStats> {
        self.inner.stats()
    }

    /// Bytes still available before requests start failing.
    pub fn remaining(&self) -> usize {
        self.budget.saturating_sub(self.inner.stats.live_bytes())
    }
}

// SAFETY: delegates to `CountingAllocator` or fails without allocating.
unsafe impl Allocator for BudgetAllocator {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        if layout.size() > self.remaining() {
            return Err(AllocError);
        }
        self.inner.allocate(layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: forwarded from the caller.
        unsafe { self.inner.deallocate(ptr, layout) }
    }
}
