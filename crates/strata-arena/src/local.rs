//! One bump allocator per thread.
//!
//! Same lazy lifecycle as [`global`](crate::global) without the lock. The
//! thread's arena is torn down when the thread exits.

use std::cell::RefCell;

use log::debug;

use crate::bump::BumpAllocator;
use crate::config::ArenaConfig;
use crate::error::ArenaError;

thread_local! {
    static LOCAL: RefCell<Option<BumpAllocator>> = const { RefCell::new(None) };
}

/// Run `f` with this thread's allocator, creating it with the default
/// config if needed.
///
/// Calls may nest: `f` can call `with_local` again.
pub fn with_local<R>(f: impl FnOnce(&BumpAllocator) -> R) -> Result<R, ArenaError> {
    LOCAL.with(|cell| {
        if cell.borrow().is_none() {
            let bump = BumpAllocator::new(ArenaConfig::default())?;
            debug!("thread-local arena created");
            *cell.try_borrow_mut().map_err(|_| ArenaError::InUse)? = Some(bump);
        }
        match cell.borrow().as_ref() {
            Some(bump) => Ok(f(bump)),
            None => Err(ArenaError::InUse),
        }
    })
}

/// Drop this thread's allocator. The next [`with_local`] creates a fresh
/// one.
///
/// Returns `Err(ArenaError::InUse)` when called from inside [`with_local`],
/// since references into the arena may still be live there.
pub fn reset_local() -> Result<(), ArenaError> {
    let retired = LOCAL.with(|cell| {
        cell.try_borrow_mut()
            .map(|mut slot| slot.take())
            .map_err(|_| ArenaError::InUse)
    })?;
    if retired.is_some() {
        debug!("thread-local arena reset");
    }
    Ok(())
}

/// Whether this thread's allocator is live.
pub fn is_local_initialized() -> bool {
    LOCAL.with(|cell| cell.borrow().is_some())
}
