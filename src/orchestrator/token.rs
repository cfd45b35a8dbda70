//! Scan tokens: monotonically numbered, cancellable operation handles.
//!
//! Every folder scan (and every rescan after a cache clear) begins by
//! asking the [`ScanController`] for a new [`ScanToken`]. Beginning a scan
//! cancels the previous token, so work still draining from an older scan
//! observes that it is stale at its next check and stops producing output.
//!
//! # Example
//!
//! ```
//! use docsift::orchestrator::ScanController;
//!
//! let controller = ScanController::new();
//! let first = controller.begin();
//! assert!(first.is_live());
//!
//! let second = controller.begin();
//! assert!(!first.is_live());
//! assert!(second.is_live());
//! assert!(second.id() > first.id());
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Handle for one scan operation.
///
/// Cheap to clone; clones share the cancellation flag.
#[derive(Debug, Clone)]
pub struct ScanToken {
    id: u64,
    cancelled: Arc<AtomicBool>,
    generation: Arc<AtomicU64>,
}

impl ScanToken {
    /// A token not tied to any controller. Live until cancelled.
    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        Self {
            id: 1,
            cancelled: Arc::new(AtomicBool::new(false)),
            generation: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Operation id; strictly increasing across scans of one controller.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether this scan may still produce observable results.
    #[must_use]
    pub fn is_live(&self) -> bool {
        !self.cancelled.load(Ordering::SeqCst) && self.generation.load(Ordering::SeqCst) == self.id
    }

    /// Cancel this scan.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

/// Issues [`ScanToken`]s and tracks which one is current.
#[derive(Debug, Clone, Default)]
pub struct ScanController {
    generation: Arc<AtomicU64>,
    current: Arc<Mutex<Option<ScanToken>>>,
}

impl ScanController {
    /// Create a controller with no scan in progress.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new scan, cancelling the previous one.
    #[must_use]
    pub fn begin(&self) -> ScanToken {
        let id = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let token = ScanToken {
            id,
            cancelled: Arc::new(AtomicBool::new(false)),
            generation: Arc::clone(&self.generation),
        };

        let previous = match self.current.lock() {
            Ok(mut current) => current.replace(token.clone()),
            Err(poisoned) => poisoned.into_inner().replace(token.clone()),
        };
        if let Some(previous) = previous {
            previous.cancel();
            log::debug!("Scan {} superseded by scan {}", previous.id, id);
        }
        token
    }

    /// Cancel the current scan, if any.
    pub fn cancel_current(&self) {
        let current = match self.current.lock() {
            Ok(current) => current.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        if let Some(token) = current {
            token.cancel();
        }
    }
}
