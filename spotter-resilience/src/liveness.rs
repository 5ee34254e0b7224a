//! Liveness token for call consumers
//!
//! A consumer that may go away while a call is still retrying holds a
//! [`Liveness`] and releases it when it does. The executor checks the token
//! before every state write; the underlying call is not aborted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared alive flag, cloned into every call that writes consumer state
#[derive(Debug, Clone)]
pub struct Liveness {
    alive: Arc<AtomicBool>,
}

impl Liveness {
    pub fn new() -> Self {
        Self {
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Mark the consumer as gone. Irreversible.
    pub fn release(&self) {
        self.alive.store(false, Ordering::Release);
    }

    /// Guard that releases this token when dropped
    pub fn guard(&self) -> LivenessGuard {
        LivenessGuard {
            liveness: self.clone(),
        }
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

/// Releases its [`Liveness`] on drop
#[derive(Debug)]
pub struct LivenessGuard {
    liveness: Liveness,
}

impl LivenessGuard {
    pub fn liveness(&self) -> &Liveness {
        &self.liveness
    }
}

impl Drop for LivenessGuard {
    fn drop(&mut self) {
        self.liveness.release();
    }
}
