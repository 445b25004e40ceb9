//! Arena-specific error types.

use std::error::Error;
use std::fmt;

/// Errors that can occur during arena operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// Requested alignment is not a power of two, or exceeds
    /// [`MAX_ALIGN`](crate::MAX_ALIGN).
    InvalidAlignment {
        /// The rejected alignment.
        align: usize,
    },
    /// The raw block provider could not supply a new chunk.
    OutOfMemory {
        /// Size in bytes of the chunk that could not be acquired.
        requested: usize,
    },
    /// Growing would take the arena past its configured `byte_limit`.
    CapacityExceeded {
        /// Number of bytes requested.
        requested: usize,
        /// The configured limit on reserved bytes.
        limit: usize,
    },
    /// `size` plus alignment padding does not fit in `isize::MAX`.
    LayoutOverflow {
        /// Requested size in bytes.
        size: usize,
        /// Requested alignment.
        align: usize,
    },
    /// An [`ArenaConfig`](crate::ArenaConfig) failed validation.
    InvalidConfig {
        /// Human-readable description of the problem.
        reason: String,
    },
    /// A thread-local arena was reset while an operation still borrowed it.
    InUse,
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAlignment { align } => {
                write!(
                    f,
                    "invalid alignment {align}: must be a power of two no larger than {}",
                    crate::MAX_ALIGN
                )
            }
            Self::OutOfMemory { requested } => {
                write!(f, "out of memory: could not acquire a {requested} byte chunk")
            }
            Self::CapacityExceeded { requested, limit } => {
                write!(
                    f,
                    "arena capacity exceeded: requested {requested} bytes, limit {limit} bytes"
                )
            }
            Self::LayoutOverflow { size, align } => {
                write!(f, "layout overflow: size {size} with alignment {align}")
            }
            Self::InvalidConfig { reason } => {
                write!(f, "invalid arena config: {reason}")
            }
            Self::InUse => write!(f, "arena is borrowed by an in-flight operation"),
        }
    }
}

impl Error for ArenaError {}

/// Failure from [`BumpAllocator::try_construct_with`](crate::BumpAllocator::try_construct_with).
///
/// The allocation happens before the initializer runs, so an `Init` failure
/// still leaves the bump cursor advanced past the reserved region.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConstructError<E> {
    /// Reserving memory for the value failed.
    Arena(ArenaError),
    /// The initializer returned an error.
    Init(E),
}

impl<E: fmt::Display> fmt::Display for ConstructError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Arena(err) => write!(f, "arena allocation failed: {err}"),
            Self::Init(err) => write!(f, "initializer failed: {err}"),
        }
    }
}

impl<E: Error + 'static> Error for ConstructError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Arena(err) => Some(err),
            Self::Init(err) => Some(err),
        }
    }
}

impl<E> From<ArenaError> for ConstructError<E> {
    fn from(err: ArenaError) -> Self {
        Self::Arena(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_alignment() {
        let err = ArenaError::InvalidAlignment { align: 3 };
        assert_eq!(
            err.to_string(),
            "invalid alignment 3: must be a power of two no larger than 4096"
        );
    }

    #[test]
    fn construct_error_source_is_inner() {
        let err: ConstructError<ArenaError> =
            ConstructError::Init(ArenaError::OutOfMemory { requested: 64 });
        let source = err.source().unwrap();
        assert_eq!(
            source.to_string(),
            "out of memory: could not acquire a 64 byte chunk"
        );
    }

    #[test]
    fn arena_error_converts_into_construct_error() {
        let err: ConstructError<()> = ArenaError::InUse.into();
        assert_eq!(err, ConstructError::Arena(ArenaError::InUse));
    }
}
