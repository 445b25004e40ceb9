//! The process-wide bump allocator.
//!
//! A single [`BumpAllocator`] lives behind a `Mutex` and is created lazily
//! on first use. [`reset`] drops it, and the next access builds a fresh one:
//!
//! ```text
//! Uninitialized ──first use──▶ Active ──reset()──▶ Uninitialized ──▶ …
//! ```
//!
//! Prefer an owned [`BumpAllocator`] passed by reference where the call
//! graph allows it. This module is for code that genuinely needs one arena
//! per process.
//!
//! # Raw pointers
//!
//! [`allocate`] and [`construct`] return raw pointers that are valid until
//! the next [`reset`]. Nothing tracks them: dereferencing one after a reset
//! is undefined behaviour, and values placed with [`construct`] are never
//! dropped. Callers must reach a point where no such pointer is in use
//! before calling [`reset`].

use std::ptr::NonNull;
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::debug;

use crate::bump::BumpAllocator;
use crate::config::ArenaConfig;
use crate::error::ArenaError;

struct GlobalState {
    /// Applied the next time an instance is created.
    config: Option<ArenaConfig>,
    instance: Option<BumpAllocator>,
    /// Number of resets that retired a live instance.
    generation: u64,
}

impl GlobalState {
    fn instance(&mut self) -> Result<&BumpAllocator, ArenaError> {
        let bump = match self.instance.take() {
            Some(bump) => bump,
            None => {
                let bump = BumpAllocator::new(self.config.unwrap_or_default())?;
                debug!("global arena created (generation {})", self.generation);
                bump
            }
        };
        Ok(self.instance.insert(bump))
    }
}

static GLOBAL: Mutex<GlobalState> = Mutex::new(GlobalState {
    config: None,
    instance: None,
    generation: 0,
});

// A panic inside `with_instance` cannot leave the chunk list half-updated,
// so a poisoned lock is still safe to use.
fn lock() -> MutexGuard<'static, GlobalState> {
    GLOBAL.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Run `f` with the process-wide allocator, creating it if needed.
///
/// The global lock is held while `f` runs; `f` must not call back into this
/// module or it will deadlock.
pub fn with_instance<R>(f: impl FnOnce(&BumpAllocator) -> R) -> Result<R, ArenaError> {
    let mut state = lock();
    Ok(f(state.instance()?))
}

/// Reserve `size` bytes aligned to `align` from the global arena.
///
/// The pointer is valid until the next [`reset`].
pub fn allocate(size: usize, align: usize) -> Result<NonNull<u8>, ArenaError> {
    with_instance(|bump| bump.allocate(size, align))?
}

/// No-op, for symmetry with [`allocate`].
pub fn deallocate(ptr: NonNull<u8>) {
    // Only forwards when an instance exists; never creates one.
    if let Some(bump) = lock().instance.as_ref() {
        bump.deallocate(ptr);
    }
}

/// Move `value` into the global arena.
///
/// Returns a raw pointer valid until the next [`reset`]. The value's
/// destructor never runs.
pub fn construct<T>(value: T) -> Result<NonNull<T>, ArenaError> {
    with_instance(|bump| bump.construct(value).map(NonNull::from))?
}

/// Retire the current instance. Its chunks are released without running
/// any destructor, and the next access creates a fresh instance.
///
/// Resetting an uninitialized arena is a no-op.
pub fn reset() {
    let retired = {
        let mut state = lock();
        let retired = state.instance.take();
        if retired.is_some() {
            state.generation += 1;
            debug!("global arena reset (generation {})", state.generation);
        }
        retired
    };
    // Release chunks outside the lock.
    drop(retired);
}

/// Set the config used the next time the global instance is created.
///
/// A live instance keeps its current config until [`reset`].
pub fn configure(config: ArenaConfig) -> Result<(), ArenaError> {
    config.validate()?;
    lock().config = Some(config);
    Ok(())
}

/// Whether a global instance is currently live.
pub fn is_initialized() -> bool {
    lock().instance.is_some()
}

/// Number of resets that have retired a live instance.
pub fn generation() -> u64 {
    lock().generation
}
