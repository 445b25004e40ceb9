//! Chunked bump allocation for Strata.
//!
//! Provides a bump allocator whose allocations are released all at once,
//! never individually. This crate is the only one in the workspace that
//! contains `unsafe` code, confined to `chunk.rs` and `bump.rs`.
//!
//! # Architecture
//!
//! ```text
//! global (Mutex<Option<BumpAllocator>>, lazy, process-wide)
//! local  (thread_local RefCell<Option<BumpAllocator>>)
//! └── BumpAllocator<A>  (facade: allocate / construct / reset)
//!     └── ChunkList<A>  (bump cursor over chained chunks)
//!         ├── Chunk[]   (blocks acquired from A)
//!         └── A: allocator_api2::Allocator (raw block provider, default Global)
//! ```
//!
//! # Lifetimes
//!
//! An owned [`BumpAllocator`] hands out references tied to `&self`, so
//! [`BumpAllocator::reset`] and drop cannot happen while any of them is
//! live. [`local`] scopes access to a closure the same way. [`global`]
//! hands out raw pointers instead, and using one after a reset is the
//! caller's bug, not a detected error.
//!
//! In every case destructors of arena-placed values are never run.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod bump;
mod chunk;
pub mod config;
pub mod error;
pub mod global;
pub mod local;

// Public re-exports for the primary API surface.
pub use bump::{BumpAllocator, DEFAULT_ALIGN, MAX_ALIGN};
pub use config::{ArenaConfig, ResetPolicy};
pub use error::{ArenaError, ConstructError};
