use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::core::error::{StoreError, StoreResult};

/// Cooperative cancellation flag checked by store operations.
///
/// Clones share the same flag. Store writes check it immediately before
/// mutating, so a cancelled request never leaves a partial write behind.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    cancelled: Arc<AtomicBool>,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn ensure_active(&self) -> StoreResult<()> {
        if self.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        Ok(())
    }
}
