//! Typed error definitions for unfolder.
//! Only `Usage` and `IpcSetup` are process-fatal; per-folder problems are
//! recorded as `FolderStatus` values instead of errors.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UnfolderError {
    #[error("Usage: unfolder <FOLDER>... (drag folders onto the program or call it from the context menu)")]
    Usage,

    #[error("Failed to set up single-instance coordination ({context}): {source}")]
    IpcSetup {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("Invalid path '{0}'")]
    InvalidPath(String),

    #[error("Folder has no parent directory: {0}")]
    NoParent(PathBuf),

    #[error("Could not hand request to the running instance: {0}")]
    Relay(String),
}

impl UnfolderError {
    /// Adapter for `.map_err(...)` on the IPC setup path.
    pub(crate) fn ipc(context: impl Into<String>) -> impl FnOnce(io::Error) -> UnfolderError {
        let context = context.into();
        move |source| UnfolderError::IpcSetup { context, source }
    }
}
