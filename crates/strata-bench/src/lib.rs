//! Benchmark profiles for the Strata bump allocator.
//!
//! - [`mixed_requests`]: a fixed, repeating mix of small sizes and alignments
//! - [`reference_config`]: the arena config the benchmarks run against

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use strata_arena::ArenaConfig;

/// Size/alignment pairs cycled by [`mixed_requests`], loosely modelled on a
/// parser building small AST nodes and strings.
const MIX: [(usize, usize); 8] = [
    (16, 8),
    (3, 1),
    (24, 8),
    (40, 8),
    (7, 1),
    (64, 16),
    (12, 4),
    (128, 8),
];

/// `n` requests drawn cyclically from the reference mix.
pub fn mixed_requests(n: usize) -> Vec<(usize, usize)> {
    MIX.iter().copied().cycle().take(n).collect()
}

/// Total bytes `requests` would consume with no padding.
pub fn payload_bytes(requests: &[(usize, usize)]) -> usize {
    requests.iter().map(|&(size, _)| size).sum()
}

/// Arena config for benchmarks: 64 KiB first chunk, default growth.
pub fn reference_config() -> ArenaConfig {
    ArenaConfig::new(64 * 1024)
}
