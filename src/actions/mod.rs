//! File actions module.
//!
//! This module is the shell adapter of the application:
//! - Move documents to the platform trash ([`trash`])
//! - Reveal documents in the platform file browser ([`shell`])
//! - Open a document with its default application ([`shell`])
//!
//! Trash operations report per-path results. Reveal and open are
//! best-effort and only report overall success.
//!
//! ```no_run
//! use docsift::actions::{open_path, reveal_in_folder};
//! use std::path::{Path, PathBuf};
//!
//! let shown = reveal_in_folder(&[PathBuf::from("/scans/a.png")]);
//! let opened = open_path(Path::new("/scans/a.png"));
//! ```

pub mod shell;
pub mod trash;

use std::path::PathBuf;

use thiserror::Error;

pub use shell::{open_path, reveal_in_folder, reveal_targets};
pub use trash::{trash_path, trash_paths, TrashReport, TrashResult};

/// Error type for shell actions.
#[derive(Debug, Error)]
pub enum ActionError {
    /// The path does not exist.
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// The platform trash refused the path.
    #[error("trash operation failed for {path}: {message}")]
    TrashFailed {
        /// Path that could not be trashed
        path: PathBuf,
        /// Message from the trash backend
        message: String,
    },

    /// A helper program could not be started.
    #[error("failed to launch {program}: {source}")]
    Launch {
        /// Program name
        program: String,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A helper program exited unsuccessfully.
    #[error("{program} exited with status {code:?}")]
    LaunchFailed {
        /// Program name
        program: String,
        /// Exit code, if any
        code: Option<i32>,
    },

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path involved
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}
