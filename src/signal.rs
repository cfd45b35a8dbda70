//! Ctrl+C handling that cancels the live scan.
//!
//! The process installs one Ctrl+C hook. When it fires, the shutdown flag
//! is set and the current scan of the attached [`ScanController`] is
//! cancelled, so the orchestrator stops at its next check and the binary
//! exits with code 130.
//!
//! ```rust,no_run
//! use docsift::orchestrator::ScanController;
//! use docsift::signal::install_handler;
//!
//! let controller = ScanController::new();
//! let handler = install_handler(&controller).expect("Failed to install signal handler");
//! let token = controller.begin();
//! // ... run the scan with `token` ...
//! if handler.is_shutdown_requested() {
//!     eprintln!("cancelled");
//! }
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use crate::orchestrator::ScanController;

/// Shared shutdown state.
///
/// `Send` and `Sync`; clones share the flag and the attached controller.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandler {
    flag: Arc<AtomicBool>,
    controller: Arc<Mutex<Option<ScanController>>>,
}

impl ShutdownHandler {
    /// Handler with no shutdown requested and no controller attached.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether Ctrl+C was pressed or [`ShutdownHandler::request_shutdown`] called.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Set the flag and cancel the attached controller's current scan.
    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
        let controller = match self.controller.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        if let Some(controller) = controller {
            controller.cancel_current();
        }
    }

    /// Route shutdown requests to `controller`.
    pub fn attach(&self, controller: &ScanController) {
        match self.controller.lock() {
            Ok(mut guard) => *guard = Some(controller.clone()),
            Err(poisoned) => *poisoned.into_inner() = Some(controller.clone()),
        }
    }

    /// Clear the flag.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Error type for signal handler installation.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Failed to install the Ctrl+C handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

static GLOBAL_HANDLER: OnceLock<ShutdownHandler> = OnceLock::new();

/// Install the process Ctrl+C hook and attach `controller` to it.
///
/// The hook is registered once per process; later calls reuse it, reset
/// the flag and re-attach the given controller. If another hook is
/// already registered (e.g. by a test harness) an unhooked handler is
/// returned that still honours [`ShutdownHandler::request_shutdown`].
///
/// # Errors
///
/// Currently always succeeds.
pub fn install_handler(controller: &ScanController) -> Result<ShutdownHandler, SignalError> {
    if let Some(handler) = GLOBAL_HANDLER.get() {
        handler.reset();
        handler.attach(controller);
        return Ok(handler.clone());
    }

    let handler = ShutdownHandler::new();
    handler.attach(controller);
    let hooked = handler.clone();

    let result = ctrlc::set_handler(move || {
        hooked.request_shutdown();
        let _ = writeln!(std::io::stderr(), "\nInterrupted. Cancelling scan...");
        let _ = std::io::stderr().flush();
        log::info!("Shutdown signal received");
    });

    match result {
        Ok(()) => {
            let _ = GLOBAL_HANDLER.set(handler.clone());
            Ok(handler)
        }
        Err(e) => {
            log::debug!("Ctrl+C handler unavailable ({}), using unhooked handler", e);
            let fallback = GLOBAL_HANDLER.get_or_init(ShutdownHandler::new).clone();
            fallback.reset();
            fallback.attach(controller);
            Ok(fallback)
        }
    }
}
