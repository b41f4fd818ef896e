//! Cooperative cancellation for pipeline runs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::core::{CoreError, CoreResult};

/// Shared cancel flag. Clones observe the same flag.
///
/// The orchestrator polls it between stages only; an in-flight external
/// call always runs to completion or timeout.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns [`CoreError::Cancelled`] once cancellation was requested
    pub fn check(&self) -> CoreResult<()> {
        if self.is_cancelled() {
            Err(CoreError::Cancelled)
        } else {
            Ok(())
        }
    }
}
