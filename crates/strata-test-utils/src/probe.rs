//! Construction probes.
//!
//! A [`Probe`] bumps a shared counter when it is created and another when
//! it is dropped, so tests can assert that arena construction runs a
//! constructor exactly once and that reset runs no destructors.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counters shared by every [`Probe`] made from them.
#[derive(Debug, Default)]
pub struct ProbeCounters {
    constructed: AtomicUsize,
    dropped: AtomicUsize,
}

impl ProbeCounters {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Construct a probe. This is the observable side effect.
    pub fn probe(self: &Arc<Self>, id: u32) -> Probe {
        self.constructed.fetch_add(1, Ordering::Relaxed);
        Probe {
            id,
            counters: Arc::clone(self),
        }
    }

    pub fn constructed(&self) -> usize {
        self.constructed.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// A value whose construction and destruction are counted.
#[derive(Debug)]
pub struct Probe {
    id: u32,
    counters: Arc<ProbeCounters>,
}

impl Probe {
    pub fn id(&self) -> u32 {
        self.id
    }
}

impl Drop for Probe {
    fn drop(&mut self) {
        self.counters.dropped.fetch_add(1, Ordering::Relaxed);
    }
}
