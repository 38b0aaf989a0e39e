//! Cooperative cancellation, polled at stage boundaries and inside long
//! inner loops (spec §5). No suspension points otherwise exist: generation
//! is one synchronous call.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::WorldgenError;

#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Check the token, returning `Err(Cancelled)` if it has fired. Call at
    /// stage boundaries and every `K` iterations of long inner loops.
    pub fn check(&self) -> Result<(), WorldgenError> {
        if self.is_cancelled() {
            Err(WorldgenError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_is_not_cancelled() {
        let t = CancelToken::new();
        assert!(t.check().is_ok());
    }

    #[test]
    fn cancel_is_observed() {
        let t = CancelToken::new();
        t.cancel();
        assert!(matches!(t.check(), Err(WorldgenError::Cancelled)));
    }

    #[test]
    fn clone_shares_state() {
        let t = CancelToken::new();
        let t2 = t.clone();
        t2.cancel();
        assert!(t.is_cancelled());
    }
}
