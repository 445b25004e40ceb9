//! Contiguous memory chunks and the growable chunk list.
//!
//! A [`Chunk`] is one block acquired from the raw provider, with a bump
//! cursor. A [`ChunkList`] chains chunks and acquires a new one when a
//! request does not fit in the remaining space of the current chunk.
//!
//! This is the only module that touches raw chunk memory.

#![allow(unsafe_code)]

use std::alloc::Layout;
use std::ops::Range;
use std::ptr::NonNull;

use allocator_api2::alloc::{AllocError, Allocator};
use log::{debug, trace, warn};
use smallvec::SmallVec;

use crate::config::{ArenaConfig, ResetPolicy};
use crate::error::ArenaError;

/// Minimum alignment of every chunk's base address.
pub(crate) const CHUNK_ALIGN: usize = 16;

/// A single contiguous block with bump allocation.
///
/// The cursor is a byte offset from `base`. Padding is computed on the
/// absolute address so any power-of-two alignment works, including ones
/// larger than the chunk's own layout alignment.
pub(crate) struct Chunk {
    base: NonNull<u8>,
    layout: Layout,
    /// Bump pointer: next free byte offset.
    cursor: usize,
}

impl Chunk {
    fn acquire<A: Allocator>(allocator: &A, layout: Layout) -> Result<Self, AllocError> {
        let block = allocator.allocate(layout)?;
        Ok(Self {
            base: block.cast(),
            layout,
            cursor: 0,
        })
    }

    /// Byte range a `size`/`align` request would occupy, or `None` if it
    /// does not fit. Does not move the cursor.
    fn fit(&self, size: usize, align: usize) -> Option<Range<usize>> {
        let base = self.base.as_ptr() as usize;
        let start = base.checked_add(self.cursor)?;
        let aligned = start.checked_add(align - 1)? & !(align - 1);
        let offset = aligned - base;
        let end = offset.checked_add(size)?;
        (end <= self.layout.size()).then_some(offset..end)
    }

    fn bump(&mut self, range: Range<usize>) -> NonNull<u8> {
        debug_assert!(range.start >= self.cursor && range.end <= self.layout.size());
        self.cursor = range.end;
        // SAFETY: `range` came from `fit`, so `range.start <= capacity` and the
        // offset stays inside (or one past the end of) the acquired block.
        unsafe { NonNull::new_unchecked(self.base.as_ptr().add(range.start)) }
    }

    fn alloc(&mut self, size: usize, align: usize) -> Option<NonNull<u8>> {
        let range = self.fit(size, align)?;
        Some(self.bump(range))
    }

    /// Rewind the cursor. Every pointer handed out from this chunk is
    /// invalid afterwards.
    fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// Return the block to the provider it came from.
    ///
    /// # Safety
    ///
    /// `allocator` must be the allocator that acquired this chunk.
    unsafe fn release<A: Allocator>(self, allocator: &A) {
        // SAFETY: caller guarantees `allocator` produced `base` with `layout`.
        unsafe { allocator.deallocate(self.base, self.layout) }
    }

    pub(crate) fn used(&self) -> usize {
        self.cursor
    }

    pub(crate) fn capacity(&self) -> usize {
        self.layout.size()
    }

    pub(crate) fn contains(&self, ptr: NonNull<u8>) -> bool {
        let base = self.base.as_ptr() as usize;
        let addr = ptr.as_ptr() as usize;
        addr >= base && addr < base + self.layout.size()
    }
}

/// A growable list of [`Chunk`]s with overflow-based bump allocation.
///
/// Requests that do not fit in the current chunk are placed entirely in a
/// later chunk; there is no cross-chunk splitting.
///
/// # Teardown
///
/// `Drop` releases every chunk through `allocator` before `allocator`
/// itself is dropped. Nothing allocated from the list can outlive it.
pub(crate) struct ChunkList<A: Allocator> {
    chunks: SmallVec<[Chunk; 4]>,
    /// Index of the chunk currently being filled.
    current: usize,
    /// Capacity of the next regular chunk. Doubles up to `max_chunk_size`.
    next_size: usize,
    config: ArenaConfig,
    allocator: A,
}

// SAFETY: the list exclusively owns its chunks; the raw base pointers are
// never shared outside `&mut self` methods, so moving the list to another
// thread moves sole ownership of the blocks along with the provider.
unsafe impl<A: Allocator + Send> Send for ChunkList<A> {}

impl<A: Allocator> ChunkList<A> {
    /// Validate `config` and acquire the first chunk.
    pub(crate) fn new(config: ArenaConfig, allocator: A) -> Result<Self, ArenaError> {
        config.validate()?;
        let mut list = Self {
            chunks: SmallVec::new(),
            current: 0,
            next_size: config.chunk_size,
            config,
            allocator,
        };
        list.grow(0, 1)?;
        Ok(list)
    }

    /// Bump-allocate `size` bytes aligned to `align`, growing if needed.
    ///
    /// `align` must be a power of two. On failure nothing changes: no chunk
    /// is added and neither the current chunk nor its cursor moves.
    pub(crate) fn alloc(&mut self, size: usize, align: usize) -> Result<NonNull<u8>, ArenaError> {
        debug_assert!(align.is_power_of_two());

        if let Some(ptr) = self
            .chunks
            .get_mut(self.current)
            .and_then(|chunk| chunk.alloc(size, align))
        {
            return Ok(ptr);
        }

        // Chunks past `current` only exist under `RetainAll`.
        let retained = (self.current + 1..self.chunks.len())
            .find_map(|idx| self.chunks[idx].fit(size, align).map(|range| (idx, range)));
        if let Some((idx, range)) = retained {
            self.current = idx;
            return Ok(self.chunks[idx].bump(range));
        }

        self.grow(size, align)
    }

    /// Acquire a chunk large enough for `size`/`align`, make it current and
    /// carve the request from its start.
    fn grow(&mut self, size: usize, align: usize) -> Result<NonNull<u8>, ArenaError> {
        // The base is aligned to at least `align`, so offset 0 needs no padding.
        let chunk_align = align.max(CHUNK_ALIGN);
        let mut capacity = self.next_size.max(size);

        if let Some(limit) = self.config.byte_limit {
            let remaining = limit.saturating_sub(self.reserved_bytes());
            if size > remaining || remaining == 0 {
                warn!("arena byte limit reached: requested {size} bytes, limit {limit}");
                return Err(ArenaError::CapacityExceeded {
                    requested: size,
                    limit,
                });
            }
            capacity = capacity.min(remaining);
        }

        let layout = Layout::from_size_align(capacity, chunk_align)
            .map_err(|_| ArenaError::LayoutOverflow { size, align })?;
        let mut chunk = Chunk::acquire(&self.allocator, layout).map_err(|_| {
            warn!("chunk acquisition failed: {capacity} bytes, align {chunk_align}");
            ArenaError::OutOfMemory {
                requested: capacity,
            }
        })?;

        let ptr = chunk.bump(0..size);
        self.chunks.push(chunk);
        self.current = self.chunks.len() - 1;
        self.advance_growth();
        debug!(
            "acquired chunk {} ({capacity} bytes, align {chunk_align})",
            self.chunks.len()
        );
        Ok(ptr)
    }

    fn advance_growth(&mut self) {
        self.next_size = self
            .next_size
            .saturating_mul(2)
            .min(self.config.max_chunk_size);
    }

    /// Discard every allocation according to the configured [`ResetPolicy`].
    ///
    /// No destructors run and no memory is scanned.
    pub(crate) fn reset(&mut self) {
        let keep = match self.config.reset_policy {
            ResetPolicy::RetainFirst => 1,
            ResetPolicy::RetainAll => self.chunks.len(),
            ResetPolicy::ReleaseAll => 0,
        };
        let keep = keep.min(self.chunks.len());
        for chunk in self.chunks.drain(keep..) {
            debug!("releasing chunk ({} bytes)", chunk.capacity());
            // SAFETY: every chunk in the list was acquired from `self.allocator`.
            unsafe { chunk.release(&self.allocator) };
        }
        for chunk in &mut self.chunks {
            chunk.rewind();
        }
        self.current = 0;
        // Growth resumes as if the retained chunks had just been acquired.
        self.next_size = self.config.chunk_size;
        for _ in 0..self.chunks.len() {
            self.advance_growth();
        }
        trace!(
            "arena reset ({:?}): {} chunk(s) retained",
            self.config.reset_policy,
            self.chunks.len()
        );
    }

    /// Bytes handed out, including alignment padding.
    pub(crate) fn allocated_bytes(&self) -> usize {
        self.chunks.iter().map(Chunk::used).sum()
    }

    /// Bytes acquired from the provider across all chunks.
    pub(crate) fn reserved_bytes(&self) -> usize {
        self.chunks.iter().map(Chunk::capacity).sum()
    }

    pub(crate) fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Whether `ptr` points into any live chunk.
    pub(crate) fn owns(&self, ptr: NonNull<u8>) -> bool {
        self.chunks.iter().any(|chunk| chunk.contains(ptr))
    }

    pub(crate) fn config(&self) -> &ArenaConfig {
        &self.config
    }
}

impl<A: Allocator> Drop for ChunkList<A> {
    fn drop(&mut self) {
        for chunk in self.chunks.drain(..) {
            // SAFETY: every chunk in the list was acquired from `self.allocator`,
            // which is still alive until this body returns.
            unsafe { chunk.release(&self.allocator) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use allocator_api2::alloc::Global;
    use strata_test_utils::{BudgetAllocator, CountingAllocator};

    fn list(chunk_size: usize) -> ChunkList<Global> {
        ChunkList::new(ArenaConfig::new(chunk_size), Global).unwrap()
    }

    fn addr(ptr: NonNull<u8>) -> usize {
        ptr.as_ptr() as usize
    }

    #[test]
    fn new_acquires_one_empty_chunk() {
        let list = list(256);
        assert_eq!(list.chunk_count(), 1);
        assert_eq!(list.reserved_bytes(), 256);
        assert_eq!(list.allocated_bytes(), 0);
    }

    #[test]
    fn chunk_base_is_chunk_aligned() {
        let mut list = list(256);
        let p = list.alloc(1, 1).unwrap();
        assert_eq!(addr(p) % CHUNK_ALIGN, 0);
    }

    #[test]
    fn sequential_alloc_pads_to_alignment() {
        let mut list = list(256);
        let a = list.alloc(3, 1).unwrap();
        let b = list.alloc(8, 8).unwrap();
        assert_eq!(addr(b) % 8, 0);
        assert_eq!(addr(b) - addr(a), 8);
        assert_eq!(list.allocated_bytes(), 16);
    }

    #[test]
    fn alloc_fills_chunk_exactly() {
        let mut list = list(128);
        list.alloc(128, 1).unwrap();
        assert_eq!(list.chunk_count(), 1);
        list.alloc(1, 1).unwrap();
        assert_eq!(list.chunk_count(), 2);
    }

    #[test]
    fn grows_with_doubling_up_to_max() {
        let config = ArenaConfig::new(64).with_max_chunk_size(128);
        let mut list = ChunkList::new(config, Global).unwrap();
        list.alloc(64, 1).unwrap();
        list.alloc(64, 1).unwrap(); // second chunk: 128
        list.alloc(64, 1).unwrap(); // fills it
        list.alloc(1, 1).unwrap(); // third chunk: capped at 128
        assert_eq!(list.chunk_count(), 3);
        assert_eq!(list.reserved_bytes(), 64 + 128 + 128);
    }

    #[test]
    fn oversized_request_gets_dedicated_chunk() {
        let mut list = list(64);
        let p = list.alloc(10_000, 8).unwrap();
        assert_eq!(addr(p) % 8, 0);
        assert_eq!(list.chunk_count(), 2);
        assert!(list.reserved_bytes() >= 64 + 10_000);
    }

    #[test]
    fn large_alignment_honoured_in_new_chunk() {
        let mut list = list(64);
        list.alloc(1, 1).unwrap();
        let p = list.alloc(64, 4096).unwrap();
        assert_eq!(addr(p) % 4096, 0);
    }

    #[test]
    fn retain_first_keeps_only_first_chunk() {
        let mut list = list(64);
        let first = list.alloc(64, 8).unwrap();
        list.alloc(64, 8).unwrap();
        assert_eq!(list.chunk_count(), 2);

        list.reset();
        assert_eq!(list.chunk_count(), 1);
        assert_eq!(list.allocated_bytes(), 0);
        assert_eq!(list.alloc(16, 8).unwrap(), first);
    }

    #[test]
    fn retain_all_walks_retained_chunks() {
        let config = ArenaConfig::new(64).with_reset_policy(ResetPolicy::RetainAll);
        let mut list = ChunkList::new(config, Global).unwrap();
        let first = list.alloc(64, 1).unwrap();
        let second = list.alloc(64, 1).unwrap();

        list.reset();
        assert_eq!(list.chunk_count(), 2);
        assert_eq!(list.alloc(64, 1).unwrap(), first);
        assert_eq!(list.alloc(64, 1).unwrap(), second);
        assert_eq!(list.chunk_count(), 2);
    }

    #[test]
    fn release_all_reacquires_on_next_alloc() {
        let config = ArenaConfig::new(64).with_reset_policy(ResetPolicy::ReleaseAll);
        let mut list = ChunkList::new(config, Global).unwrap();
        list.alloc(8, 8).unwrap();
        list.reset();
        assert_eq!(list.chunk_count(), 0);
        assert_eq!(list.reserved_bytes(), 0);
        list.alloc(8, 8).unwrap();
        assert_eq!(list.chunk_count(), 1);
    }

    #[test]
    fn reset_restarts_growth_sequence() {
        let mut list = list(64);
        list.alloc(64, 1).unwrap();
        list.alloc(128, 1).unwrap();
        list.reset();
        list.alloc(64, 1).unwrap();
        list.alloc(1, 1).unwrap(); // 128 again, not 256
        assert_eq!(list.reserved_bytes(), 64 + 128);
    }

    #[test]
    fn out_of_memory_leaves_state_unchanged() {
        let mut list = ChunkList::new(ArenaConfig::new(64), BudgetAllocator::new(100)).unwrap();
        let first = list.alloc(8, 8).unwrap();

        let err = list.alloc(200, 8).unwrap_err();
        assert!(matches!(err, ArenaError::OutOfMemory { .. }));
        assert_eq!(list.chunk_count(), 1);
        assert_eq!(list.allocated_bytes(), 8);

        // A request that fits the current chunk still succeeds.
        let next = list.alloc(8, 8).unwrap();
        assert_eq!(addr(next), addr(first) + 8);
    }

    #[test]
    fn byte_limit_rejects_without_calling_provider() {
        let allocator = CountingAllocator::new();
        let stats = allocator.stats();
        let config = ArenaConfig::new(64).with_byte_limit(96);
        let mut list = ChunkList::new(config, allocator).unwrap();
        list.alloc(64, 1).unwrap();

        let err = list.alloc(64, 1).unwrap_err();
        assert_eq!(
            err,
            ArenaError::CapacityExceeded {
                requested: 64,
                limit: 96
            }
        );
        assert_eq!(stats.acquired(), 1);

        // The tail under the limit is still usable.
        list.alloc(32, 1).unwrap();
        assert_eq!(list.reserved_bytes(), 96);
    }

    #[test]
    fn drop_releases_every_chunk() {
        let allocator = CountingAllocator::new();
        let stats = allocator.stats();
        {
            let mut list = ChunkList::new(ArenaConfig::new(64), allocator).unwrap();
            list.alloc(64, 1).unwrap();
            list.alloc(64, 1).unwrap();
            list.alloc(500, 1).unwrap();
            assert_eq!(stats.acquired(), 3);
        }
        assert_eq!(stats.released(), 3);
        assert_eq!(stats.live_bytes(), 0);
    }

    #[test]
    fn reset_releases_through_provider() {
        let allocator = CountingAllocator::new();
        let stats = allocator.stats();
        let mut list = ChunkList::new(ArenaConfig::new(64), allocator).unwrap();
        list.alloc(64, 1).unwrap();
        list.alloc(64, 1).unwrap();
        list.reset();
        assert_eq!(stats.released(), 1);
        assert_eq!(stats.live_bytes(), 64);
    }

    #[test]
    fn owns_reports_membership() {
        let mut list = list(64);
        let p = list.alloc(8, 8).unwrap();
        assert!(list.owns(p));
        let outside = NonNull::from(&0u8);
        assert!(!list.owns(outside));
    }
}
