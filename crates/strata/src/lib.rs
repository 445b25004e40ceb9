//! Strata: bump allocation for objects that die together.
//!
//! This is the top-level facade crate that re-exports the public API of the
//! Strata sub-crates. For most users, adding `strata` as a single dependency
//! is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use strata::prelude::*;
//!
//! let mut bump = BumpAllocator::new(ArenaConfig::new(1024)).unwrap();
//!
//! // Raw bytes.
//! let first = bump.allocate(16, 8).unwrap();
//! let second = bump.allocate(3, 1).unwrap();
//! assert_eq!(second.as_ptr() as usize, first.as_ptr() as usize + 16);
//!
//! // Values built in place. Their destructors never run.
//! let name = bump.copy_str("heat").unwrap();
//! let total = bump.construct_with(|| name.len() * 2).unwrap();
//! assert_eq!(*total, 8);
//!
//! // Collections backed by the arena.
//! let mut v = strata::allocator_api2::vec::Vec::new_in(&bump);
//! v.extend([1u32, 2, 3]);
//! assert_eq!(v.len(), 3);
//! drop(v);
//!
//! bump.reset();
//! assert_eq!(bump.allocate(16, 8).unwrap(), first);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`arena`] | `strata-arena` | `BumpAllocator`, config, errors |
//! | [`global`] | `strata-arena` | Process-wide lazily created arena |
//! | [`local`] | `strata-arena` | Per-thread arena |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Bump allocator, configuration and errors (`strata-arena`).
pub use strata_arena as arena;

/// The process-wide arena.
pub use strata_arena::global;

/// The per-thread arena.
pub use strata_arena::local;

/// The allocator trait `BumpAllocator` plugs into, for `Vec::new_in` and
/// friends.
pub use allocator_api2;

/// Commonly used types, importable with `use strata::prelude::*`.
pub mod prelude {
    pub use strata_arena::{
        ArenaConfig, ArenaError, BumpAllocator, ConstructError, ResetPolicy, DEFAULT_ALIGN,
        MAX_ALIGN,
    };
}
