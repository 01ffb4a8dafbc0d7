//! Folder deletion.
//!
//! Permanent removal is split into a post-order plan (children before their
//! directory) and a step-by-step application that records every failing
//! entry instead of stopping at the first one.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::conflict::read_answer;
use super::helpers::io_error_with_help_io;
use super::{DeleteOptions, Deleter};
use crate::output::stdin_is_interactive;

/// One removal in a post-order plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalStep {
    /// Regular file or symlink (links are removed, never followed)
    File(PathBuf),
    /// Directory, scheduled after all of its entries
    Dir(PathBuf),
}

impl RemovalStep {
    pub fn path(&self) -> &Path {
        match self {
            RemovalStep::File(p) | RemovalStep::Dir(p) => p,
        }
    }
}

/// Post-order removal plan for `root` (root itself last).
pub fn removal_plan(root: &Path) -> io::Result<Vec<RemovalStep>> {
    let meta = fs::symlink_metadata(root)?;
    if !meta.is_dir() {
        return Ok(vec![RemovalStep::File(root.to_path_buf())]);
    }
    let mut steps = Vec::new();
    for entry in WalkDir::new(root).follow_links(false).contents_first(true) {
        let entry = entry.map_err(io::Error::other)?;
        let path = entry.path().to_path_buf();
        if entry.file_type().is_dir() {
            steps.push(RemovalStep::Dir(path));
        } else {
            steps.push(RemovalStep::File(path));
        }
    }
    Ok(steps)
}

/// Apply a removal plan, continuing past failures. Returns every failed step.
pub fn apply_removal(steps: &[RemovalStep]) -> Vec<(PathBuf, io::Error)> {
    let mut failures = Vec::new();
    for step in steps {
        let res = match step {
            RemovalStep::File(p) => fs::remove_file(p),
            RemovalStep::Dir(p) => fs::remove_dir(p),
        };
        if let Err(e) = res {
            let e = io_error_with_help_io("remove", step.path())(e);
            debug!(error = %e, "removal step failed");
            failures.push((step.path().to_path_buf(), e));
        }
    }
    failures
}

/// Remove `root` and everything below it; fails with the first recorded error.
pub fn remove_tree(root: &Path) -> io::Result<()> {
    let steps = removal_plan(root)?;
    let mut failures = apply_removal(&steps);
    if failures.is_empty() {
        return Ok(());
    }
    let count = failures.len();
    let (_, first) = failures.remove(0);
    Err(io::Error::new(
        first.kind(),
        format!("{count} entr(ies) could not be removed; first: {first}"),
    ))
}

/// Filesystem-backed deleter; trash first when undo is allowed, otherwise
/// remove the (empty) folder itself.
#[derive(Debug, Default)]
pub struct FsDeleter;

impl FsDeleter {
    pub fn new() -> Self {
        Self
    }
}

impl Deleter for FsDeleter {
    fn delete(&mut self, path: &Path, options: &DeleteOptions) -> io::Result<()> {
        if !options.no_confirmation && stdin_is_interactive() {
            let question = format!("Delete folder '{}'? [y/N] ", path.display());
            if !matches!(read_answer(&question).as_deref(), Some("y" | "yes")) {
                return Err(io::Error::new(
                    io::ErrorKind::Interrupted,
                    "deletion declined by user",
                ));
            }
        }

        if options.allow_undo {
            match trash::delete(path) {
                Ok(()) => {
                    info!(path = %path.display(), "Moved folder to trash");
                    return Ok(());
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Trash unavailable; removing permanently");
                }
            }
        }

        // Only an empty folder: anything that appeared since the emptiness
        // check makes this fail instead of being lost.
        fs::remove_dir(path).map_err(io_error_with_help_io("remove folder", path))?;
        info!(path = %path.display(), "Removed folder");
        Ok(())
    }
}
