//! The bump allocator facade.
//!
//! [`BumpAllocator`] owns one chunk list and exposes allocation through
//! `&self`, so many live references can coexist while the borrow checker
//! still forbids [`reset`](BumpAllocator::reset) until every one of them is
//! gone.
//!
//! Values placed in the arena are never dropped. `reset()` and the
//! allocator's own drop release memory without running destructors.

#![allow(unsafe_code)]

use std::alloc::Layout;
use std::cell::RefCell;
use std::fmt;
use std::ptr::{self, NonNull};

use allocator_api2::alloc::{AllocError, Allocator, Global};

use crate::chunk::ChunkList;
use crate::config::ArenaConfig;
use crate::error::{ArenaError, ConstructError};

/// Alignment used by [`BumpAllocator::allocate_default`].
pub const DEFAULT_ALIGN: usize = 8;

/// Largest alignment [`BumpAllocator::allocate`] accepts.
pub const MAX_ALIGN: usize = 4096;

/// Chunked bump allocator.
///
/// Allocation advances a cursor through the current chunk; when a request
/// does not fit, a new chunk is acquired from the provider `A`. Individual
/// deallocation is a no-op. [`reset`](Self::reset) discards everything at
/// once.
///
/// `BumpAllocator` is `Send` when `A` is, but never `Sync`: share it across
/// threads through [`global`](crate::global), [`local`](crate::local), or
/// a lock of your own.
///
/// # Example
///
/// ```
/// use strata_arena::{ArenaConfig, BumpAllocator};
///
/// let mut bump = BumpAllocator::new(ArenaConfig::default()).unwrap();
/// let a = bump.construct(41u64).unwrap();
/// *a += 1;
/// assert_eq!(*a, 42);
///
/// bump.reset();
/// assert_eq!(bump.allocated_bytes(), 0);
/// ```
pub struct BumpAllocator<A: Allocator = Global> {
    chunks: RefCell<ChunkList<A>>,
}

impl BumpAllocator<Global> {
    /// Create an allocator backed by the global heap.
    ///
    /// Acquires the first chunk eagerly. Returns `Err(ArenaError)` if the
    /// config is invalid or the first chunk cannot be acquired.
    pub fn new(config: ArenaConfig) -> Result<Self, ArenaError> {
        Self::with_allocator(config, Global)
    }
}

impl<A: Allocator> BumpAllocator<A> {
    /// Create an allocator that acquires its chunks from `allocator`.
    pub fn with_allocator(config: ArenaConfig, allocator: A) -> Result<Self, ArenaError> {
        Ok(Self {
            chunks: RefCell::new(ChunkList::new(config, allocator)?),
        })
    }

    /// Reserve `size` bytes aligned to `align`.
    ///
    /// `align` must be a power of two no larger than [`MAX_ALIGN`]; otherwise
    /// `InvalidAlignment` is returned before anything is reserved. Zero-sized
    /// requests return a dangling, well-aligned pointer and do not move the
    /// cursor.
    ///
    /// The bytes are uninitialised and stay valid until the next
    /// [`reset`](Self::reset) or until the allocator is dropped.
    pub fn allocate(&self, size: usize, align: usize) -> Result<NonNull<u8>, ArenaError> {
        check_align(align)?;
        if size == 0 {
            return dangling(align);
        }
        if size > isize::MAX as usize - (align - 1) {
            return Err(ArenaError::LayoutOverflow { size, align });
        }
        self.chunks.borrow_mut().alloc(size, align)
    }

    /// Reserve `size` bytes with [`DEFAULT_ALIGN`].
    pub fn allocate_default(&self, size: usize) -> Result<NonNull<u8>, ArenaError> {
        self.allocate(size, DEFAULT_ALIGN)
    }

    /// Reserve memory for `layout`.
    pub fn allocate_layout(&self, layout: Layout) -> Result<NonNull<u8>, ArenaError> {
        self.allocate(layout.size(), layout.align())
    }

    /// No-op. Bump allocation never frees or recycles individual regions;
    /// `ptr` stays valid until the next reset.
    pub fn deallocate(&self, _ptr: NonNull<u8>) {}

    /// Move `value` into the arena and return a reference to it.
    ///
    /// The value's destructor never runs.
    #[allow(clippy::mut_from_ref)]
    pub fn construct<T>(&self, value: T) -> Result<&mut T, ArenaError> {
        let slot = self.allocate_layout(Layout::new::<T>())?.cast::<T>();
        // SAFETY: `slot` is aligned for `T`, sized for `T`, and disjoint from
        // every other live allocation. It lives as long as `&self`.
        unsafe {
            slot.as_ptr().write(value);
            Ok(&mut *slot.as_ptr())
        }
    }

    /// Reserve space for a `T`, then build it in place with `init`.
    ///
    /// The space is reserved before `init` runs, so `init` may itself
    /// allocate from this arena. If `init` panics the reserved region is
    /// simply leaked inside the arena.
    #[allow(clippy::mut_from_ref)]
    pub fn construct_with<T, F>(&self, init: F) -> Result<&mut T, ArenaError>
    where
        F: FnOnce() -> T,
    {
        let slot = self.allocate_layout(Layout::new::<T>())?.cast::<T>();
        // SAFETY: as in `construct`.
        unsafe {
            slot.as_ptr().write(init());
            Ok(&mut *slot.as_ptr())
        }
    }

    /// Like [`construct_with`](Self::construct_with) for a fallible
    /// initializer.
    ///
    /// On `Err(ConstructError::Init(_))` the cursor stays advanced past the
    /// reserved region.
    #[allow(clippy::mut_from_ref)]
    pub fn try_construct_with<T, E, F>(&self, init: F) -> Result<&mut T, ConstructError<E>>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let slot = self.allocate_layout(Layout::new::<T>())?.cast::<T>();
        let value = init().map_err(ConstructError::Init)?;
        // SAFETY: as in `construct`.
        unsafe {
            slot.as_ptr().write(value);
            Ok(&mut *slot.as_ptr())
        }
    }

    /// Copy a slice into the arena.
    #[allow(clippy::mut_from_ref)]
    pub fn copy_slice<T: Copy>(&self, src: &[T]) -> Result<&mut [T], ArenaError> {
        let layout = Layout::array::<T>(src.len()).map_err(|_| ArenaError::LayoutOverflow {
            size: src.len().saturating_mul(size_of::<T>()),
            align: align_of::<T>(),
        })?;
        let dst = self.allocate_layout(layout)?.cast::<T>();
        // SAFETY: `dst` is a fresh region sized and aligned for `src.len()`
        // values of `T`, so it cannot overlap `src`.
        unsafe {
            ptr::copy_nonoverlapping(src.as_ptr(), dst.as_ptr(), src.len());
            Ok(std::slice::from_raw_parts_mut(dst.as_ptr(), src.len()))
        }
    }

    /// Copy a string into the arena.
    #[allow(clippy::mut_from_ref)]
    pub fn copy_str(&self, src: &str) -> Result<&mut str, ArenaError> {
        let bytes = self.copy_slice(src.as_bytes())?;
        // SAFETY: the bytes were copied verbatim from a `str`.
        Ok(unsafe { std::str::from_utf8_unchecked_mut(bytes) })
    }

    /// Discard every allocation.
    ///
    /// Chunks are retained or released according to the config's
    /// [`ResetPolicy`](crate::ResetPolicy). No destructors run. Requires
    /// `&mut self`, so no reference handed out by this allocator can be live.
    pub fn reset(&mut self) {
        self.chunks.get_mut().reset();
    }

    /// Bytes handed out since the last reset, alignment padding included.
    pub fn allocated_bytes(&self) -> usize {
        self.chunks.borrow().allocated_bytes()
    }

    /// Bytes currently held from the provider.
    pub fn reserved_bytes(&self) -> usize {
        self.chunks.borrow().reserved_bytes()
    }

    /// Number of chunks currently held.
    pub fn chunk_count(&self) -> usize {
        self.chunks.borrow().chunk_count()
    }

    /// Whether `ptr` points into memory owned by this allocator.
    pub fn owns(&self, ptr: NonNull<u8>) -> bool {
        self.chunks.borrow().owns(ptr)
    }

    /// The configuration this allocator was built with.
    pub fn config(&self) -> ArenaConfig {
        *self.chunks.borrow().config()
    }
}

impl<A: Allocator> fmt::Debug for BumpAllocator<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let chunks = self.chunks.borrow();
        f.debug_struct("BumpAllocator")
            .field("chunk_count", &chunks.chunk_count())
            .field("allocated_bytes", &chunks.allocated_bytes())
            .field("reserved_bytes", &chunks.reserved_bytes())
            .finish()
    }
}

// SAFETY: blocks returned by `allocate` stay valid until the allocator is
// reset or dropped, both of which need the `BumpAllocator` by value or by
// `&mut`, which cannot happen while this `&BumpAllocator` exists.
// `deallocate` never frees, so it cannot invalidate another block.
unsafe impl<A: Allocator> Allocator for &BumpAllocator<A> {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        let ptr = (**self).allocate_layout(layout).map_err(|_| AllocError)?;
        Ok(NonNull::slice_from_raw_parts(ptr, layout.size()))
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, _layout: Layout) {
        (**self).deallocate(ptr);
    }
}

fn check_align(align: usize) -> Result<(), ArenaError> {
    if align.is_power_of_two() && align <= MAX_ALIGN {
        Ok(())
    } else {
        Err(ArenaError::InvalidAlignment { align })
    }
}

fn dangling(align: usize) -> Result<NonNull<u8>, ArenaError> {
    NonNull::new(ptr::without_provenance_mut(align)).ok_or(ArenaError::InvalidAlignment { align })
}
