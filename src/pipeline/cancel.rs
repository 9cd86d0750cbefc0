//! Cooperative cancellation for the aggregation pipeline
//!
//! Stages and batch boundaries are the only safe suspension points, so the
//! pipeline checks the token there rather than interrupting in-flight
//! requests.

use crate::{BidscopeError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag a caller can flip to stop the pipeline at the next checkpoint
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation; the pipeline stops at its next checkpoint
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Errors with `Cancelled` once cancellation has been requested
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(BidscopeError::Cancelled)
        } else {
            Ok(())
        }
    }
}
