//! Cooperative cancellation primitives
//!
//! Each long-running sequence (a step reveal, a speech queue) is issued a
//! [`CancelToken`] at start. Every suspension-resumption point checks
//! whether the token is still current before proceeding; superseding work
//! issues a new token and thereby invalidates the old one. A stale token's
//! continuation is a no-op. Cancellation is cooperative, never preemptive:
//! partially-applied state (already-revealed steps) is not rolled back.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Issues generation-stamped tokens; owned by whoever supersedes work
#[derive(Debug, Default)]
pub struct CancelSource {
    generation: Arc<AtomicU64>,
}

impl CancelSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a token for a new run, invalidating all previously issued
    /// tokens
    pub fn issue(&self) -> CancelToken {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        CancelToken {
            generation,
            current: Arc::clone(&self.generation),
        }
    }

    /// Invalidate every outstanding token without starting a new run
    pub fn cancel_all(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }
}

/// Handle held by one run; cheap to clone and check
#[derive(Debug, Clone)]
pub struct CancelToken {
    generation: u64,
    current: Arc<AtomicU64>,
}

impl CancelToken {
    /// True once a newer token has been issued or `cancel_all` was called
    pub fn is_cancelled(&self) -> bool {
        self.current.load(Ordering::Acquire) != self.generation
    }
}
