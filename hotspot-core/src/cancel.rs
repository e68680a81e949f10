//! Cooperative cancellation token threaded through every `GitClient` call.
//!
//! Global invariant: callers must honor cancellation promptly. Workers check
//! the token between units of work, never mid-subprocess.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::HotspotError;

/// A cheaply-cloneable flag. Cloning shares the same underlying cell, so
/// calling `.cancel()` on any clone is visible to all holders.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Returns `Err(HotspotError::Cancelled)` if cancellation has been requested.
    pub fn check(&self) -> Result<(), HotspotError> {
        if self.is_cancelled() {
            Err(HotspotError::Cancelled)
        } else {
            Ok(())
        }
    }
}
