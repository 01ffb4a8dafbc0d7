//! Filesystem collaborators used by the flatten engine.
//!
//! Each collaborator is a trait so the engine can be driven by fakes in tests;
//! the `Fs*` types are the real implementations.

mod batch_move;
mod conflict;
mod copy;
mod delete;
mod helpers;
mod list;

pub use batch_move::{FsBatchMover, move_one};
pub use conflict::{
    ConflictAction, ConflictChoice, ConflictPolicy, ConflictPrompt, ConflictResolver,
    TerminalPrompt, unique_destination,
};
pub use copy::copy_then_remove;
pub use delete::{FsDeleter, RemovalStep, apply_removal, removal_plan, remove_tree};
pub use helpers::io_error_with_help_io;
pub use list::FsLister;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::flatten::MovePlanEntry;

/// Lists one directory level.
pub trait DirLister {
    /// True for an existing directory that is not a symlink.
    fn is_folder(&self, path: &Path) -> bool {
        fs::symlink_metadata(path)
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    /// Direct children of `path` (non-recursive).
    fn list_children(&self, path: &Path) -> io::Result<Vec<PathBuf>>;
}

/// Options for a batch move request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOptions {
    /// Prefer undo-capable operations (replaced entries go to the trash)
    pub allow_undo: bool,
    /// Each entry names its own destination path
    pub multi_destination: bool,
    /// Let an `Ask` conflict policy prompt the user
    pub prompt_on_conflict: bool,
}

/// A single entry the mover could not relocate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveFailure {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub error: String,
}

/// Outcome of one batch move request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchMoveResult {
    /// No entry failed
    pub overall_ok: bool,
    /// At least one entry was skipped (declined conflict, shutdown)
    pub any_aborted: bool,
    pub moved: usize,
    pub skipped: usize,
    pub failures: Vec<MoveFailure>,
}

/// Moves a whole plan as one operation.
pub trait BatchMover {
    fn move_batch(&mut self, entries: &[MovePlanEntry], options: &MoveOptions) -> BatchMoveResult;

    /// Move an item parked under a temporary name to `destination`. A missing
    /// parked item is `NotFound`; an occupied destination is `AlreadyExists`
    /// and is never replaced.
    fn complete_staged(&mut self, staged: &Path, destination: &Path) -> io::Result<()> {
        if !conflict::exists_no_follow(staged) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("'{}' does not exist", staged.display()),
            ));
        }
        if conflict::exists_no_follow(destination) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("'{}' already exists", destination.display()),
            ));
        }
        move_one(staged, destination)
    }
}

/// Options for deleting a single folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOptions {
    /// Send to the trash where the platform has one
    pub allow_undo: bool,
    /// Never ask before deleting
    pub no_confirmation: bool,
}

/// Deletes one folder.
pub trait Deleter {
    fn delete(&mut self, path: &Path, options: &DeleteOptions) -> io::Result<()>;
}
