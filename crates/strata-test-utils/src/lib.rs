//! Test utilities for Strata development.
//!
//! Provides raw block providers that count or cap what they hand out
//! ([`CountingAllocator`], [`BudgetAllocator`]), a [`Probe`] type that
//! records constructor and destructor calls, and [`init_logging`].

#![deny(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod alloc;
pub mod probe;

pub use alloc::{AllocStats, BudgetAllocator, CountingAllocator};
pub use probe::{Probe, ProbeCounters};

/// Route `log` output through `env_logger` for the current test binary.
///
/// Safe to call from every test; only the first call installs the logger.
/// Filter with `RUST_LOG`, e.g. `RUST_LOG=strata_arena=debug`.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_logging_is_idempotent() {
        init_logging();
        init_logging();
        log::debug!("logger installed");
    }
}
