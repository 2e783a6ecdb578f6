//! Cooperative cancellation between backend calls.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::errors::VcsError;

/// Shared cancellation flag supplied by the caller's long-running-operation
/// wrapper. Checked before every backend call; an in-flight call is never
/// interrupted.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        debug!("cancellation requested");
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// `Err(VcsError::Cancelled)` once [`cancel`](Self::cancel) was called.
    pub fn check(&self) -> Result<(), VcsError> {
        if self.is_cancelled() {
            Err(VcsError::Cancelled)
        } else {
            Ok(())
        }
    }
}
