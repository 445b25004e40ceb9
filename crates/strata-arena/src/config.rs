//! Arena configuration parameters.

use std::alloc::Layout;

use crate::chunk::CHUNK_ALIGN;
use crate::error::ArenaError;

/// What [`BumpAllocator::reset`](crate::BumpAllocator::reset) does with the
/// chunks it has acquired.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResetPolicy {
    /// Keep the first chunk with its cursor rewound, release the rest.
    #[default]
    RetainFirst,
    /// Keep every chunk and rewind each cursor. Allocation walks the
    /// retained chunks in order before acquiring new ones.
    RetainAll,
    /// Release every chunk. The next allocation acquires a fresh one.
    ReleaseAll,
}

/// Configuration for the bump allocator.
///
/// Controls chunk sizing, growth, reset behaviour and an optional cap on
/// reserved memory. Validated at construction; immutable afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Size in bytes of the first chunk, and the size growth restarts
    /// from after a reset.
    ///
    /// Default: 4096. Must be at least [`ArenaConfig::MIN_CHUNK_SIZE`].
    pub chunk_size: usize,

    /// Upper bound for the doubling growth of regular chunks.
    ///
    /// Default: 1 MiB. A single request larger than this still gets a
    /// dedicated chunk sized to fit it.
    pub max_chunk_size: usize,

    /// Chunk retention on reset.
    pub reset_policy: ResetPolicy,

    /// Maximum number of bytes reserved from the provider across all
    /// chunks. `None` means unbounded.
    pub byte_limit: Option<usize>,
}

impl ArenaConfig {
    /// Default first-chunk size: 4 KiB.
    pub const DEFAULT_CHUNK_SIZE: usize = 4096;

    /// Default growth cap: 1 MiB.
    pub const DEFAULT_MAX_CHUNK_SIZE: usize = 1 << 20;

    /// Smallest accepted `chunk_size`.
    pub const MIN_CHUNK_SIZE: usize = 64;

    /// Create a config with the given first-chunk size.
    ///
    /// Uses default values for all other parameters.
    pub const fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            max_chunk_size: Self::DEFAULT_MAX_CHUNK_SIZE,
            reset_policy: ResetPolicy::RetainFirst,
            byte_limit: None,
        }
    }

    /// Set the growth cap.
    pub const fn with_max_chunk_size(mut self, max_chunk_size: usize) -> Self {
        self.max_chunk_size = max_chunk_size;
        self
    }

    /// Set the reset policy.
    pub const fn with_reset_policy(mut self, reset_policy: ResetPolicy) -> Self {
        self.reset_policy = reset_policy;
        self
    }

    /// Cap the total bytes reserved from the provider.
    pub const fn with_byte_limit(mut self, limit: usize) -> Self {
        self.byte_limit = Some(limit);
        self
    }

    /// Check the invariants documented on each field.
    pub fn validate(&self) -> Result<(), ArenaError> {
        if self.chunk_size < Self::MIN_CHUNK_SIZE {
            return Err(ArenaError::InvalidConfig {
                reason: format!(
                    "chunk_size must be >= {} (got {})",
                    Self::MIN_CHUNK_SIZE,
                    self.chunk_size,
                ),
            });
        }
        if self.max_chunk_size < self.chunk_size {
            return Err(ArenaError::InvalidConfig {
                reason: format!(
                    "max_chunk_size must be >= chunk_size (got {} < {})",
                    self.max_chunk_size, self.chunk_size,
                ),
            });
        }
        if Layout::from_size_align(self.max_chunk_size, CHUNK_ALIGN).is_err() {
            return Err(ArenaError::InvalidConfig {
                reason: format!(
                    "max_chunk_size {} does not fit in a memory layout",
                    self.max_chunk_size,
                ),
            });
        }
        // The first chunk is acquired eagerly, so it must fit under the cap.
        if let Some(limit) = self.byte_limit {
            if limit < self.chunk_size {
                return Err(ArenaError::InvalidConfig {
                    reason: format!(
                        "byte_limit must be >= chunk_size (got {limit} < {})",
                        self.chunk_size,
                    ),
                });
            }
        }
        Ok(())
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CHUNK_SIZE)
    }
}
