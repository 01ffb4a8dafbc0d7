//! Runs a batch plan: one batch move, then per-folder cleanup.
//!
//! A folder is only deleted when the whole batch moved cleanly and the folder
//! is verified empty afterwards. An aborted or failed batch keeps every folder.
//!
//! A child whose destination is itself a folder of the batch (`P/A/A` moving
//! to `P/A`) is parked under a temporary sibling name and renamed once that
//! folder is gone, so conflict handling never sees the folder being flattened.

use std::collections::HashSet;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::model::{FolderOutcome, FolderStatus, MovePlanEntry};
use crate::fs_ops::{
    BatchMoveResult, BatchMover, DeleteOptions, Deleter, DirLister, MoveOptions, unique_destination,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecuteOptions {
    pub allow_undo: bool,
    pub prompt_on_conflict: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            allow_undo: true,
            prompt_on_conflict: true,
        }
    }
}

pub struct FlattenExecutor<'a> {
    pub lister: &'a dyn DirLister,
    pub mover: &'a mut dyn BatchMover,
    pub deleter: &'a mut dyn Deleter,
    pub options: ExecuteOptions,
}

impl FlattenExecutor<'_> {
    /// One outcome per folder in `deletable`, in the same order.
    pub fn execute(&mut self, entries: &[MovePlanEntry], deletable: &[PathBuf]) -> Vec<FolderOutcome> {
        if deletable.is_empty() {
            return Vec::new();
        }

        let move_opts = MoveOptions {
            allow_undo: self.options.allow_undo,
            multi_destination: true,
            prompt_on_conflict: self.options.prompt_on_conflict,
        };
        let (planned, staged) = stage_entries(entries, deletable);
        let result = self.mover.move_batch(&planned, &move_opts);
        info!(
            moved = result.moved,
            skipped = result.skipped,
            failed = result.failures.len(),
            aborted = result.any_aborted,
            "Batch move finished"
        );

        if result.any_aborted || !result.overall_ok {
            warn!("Batch move incomplete; no folder will be deleted");
            let mut outcomes: Vec<FolderOutcome> = deletable
                .iter()
                .map(|folder| {
                    FolderOutcome::new(folder, FolderStatus::MoveFailed)
                        .with_detail(move_failure_detail(folder, &result))
                })
                .collect();
            self.restore_staged(&staged, deletable, &mut outcomes);
            return outcomes;
        }

        let delete_opts = DeleteOptions {
            allow_undo: self.options.allow_undo,
            no_confirmation: true,
        };
        let mut outcomes: Vec<FolderOutcome> = deletable
            .iter()
            .map(|folder| self.finish_folder(folder, &delete_opts))
            .collect();
        self.settle_staged(&staged, deletable, &mut outcomes);
        outcomes
    }

    /// Give parked items their real name where the folder holding it was
    /// removed; otherwise leave them parked and say where.
    fn settle_staged(&mut self, staged: &[Staged], deletable: &[PathBuf], outcomes: &mut [FolderOutcome]) {
        for s in staged {
            let freed = position(deletable, &s.destination)
                .is_some_and(|i| outcomes[i].status == FolderStatus::Success);
            let note = if freed {
                match self.mover.complete_staged(&s.staged, &s.destination) {
                    Ok(()) => {
                        debug!(dest = %s.destination.display(), "parked item renamed into place");
                        continue;
                    }
                    Err(e) => format!("{} left at {}: {e}", s.source.display(), s.staged.display()),
                }
            } else {
                format!("{} left at {}", s.source.display(), s.staged.display())
            };
            warn!(staged = %s.staged.display(), dest = %s.destination.display(), "parked item kept");
            if let Some(i) = s.source.parent().and_then(|f| position(deletable, f)) {
                outcomes[i].add_note(&note);
            }
        }
    }

    /// Aborted batch: put parked items back where they came from.
    fn restore_staged(&mut self, staged: &[Staged], deletable: &[PathBuf], outcomes: &mut [FolderOutcome]) {
        for s in staged {
            match self.mover.complete_staged(&s.staged, &s.source) {
                Ok(()) => debug!(src = %s.source.display(), "parked item restored"),
                // Never parked: the entry was skipped or failed before moving.
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(staged = %s.staged.display(), error = %e, "could not restore parked item");
                    if let Some(i) = s.source.parent().and_then(|f| position(deletable, f)) {
                        outcomes[i].add_note(&format!(
                            "{} left at {}: {e}",
                            s.source.display(),
                            s.staged.display()
                        ));
                    }
                }
            }
        }
    }

    fn finish_folder(&mut self, folder: &Path, opts: &DeleteOptions) -> FolderOutcome {
        match self.lister.list_children(folder) {
            Ok(children) if children.is_empty() => {}
            Ok(children) => {
                warn!(folder = %folder.display(), left = children.len(), "Folder not empty after move");
                return FolderOutcome::new(folder, FolderStatus::NotEmptyAfterMove)
                    .with_detail(format!("{} item(s) remain", children.len()));
            }
            Err(e) => {
                return FolderOutcome::new(folder, FolderStatus::NotEmptyAfterMove)
                    .with_detail(format!("could not verify contents: {e}"));
            }
        }

        match self.deleter.delete(folder, opts) {
            Ok(()) => {
                info!(folder = %folder.display(), "Folder flattened");
                FolderOutcome::new(folder, FolderStatus::Success)
            }
            Err(e) => {
                warn!(folder = %folder.display(), error = %e, "Delete failed");
                FolderOutcome::new(folder, FolderStatus::DeleteFailed).with_detail(e.to_string())
            }
        }
    }
}

/// An entry parked under `staged` until `destination` is free.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Staged {
    source: PathBuf,
    staged: PathBuf,
    destination: PathBuf,
}

/// Redirect entries whose destination is a folder of this batch.
fn stage_entries(entries: &[MovePlanEntry], deletable: &[PathBuf]) -> (Vec<MovePlanEntry>, Vec<Staged>) {
    let folders: HashSet<&Path> = deletable.iter().map(PathBuf::as_path).collect();
    let mut staged = Vec::new();
    let planned = entries
        .iter()
        .map(|entry| {
            if !folders.contains(entry.destination.as_path()) {
                return entry.clone();
            }
            let parked = staging_path(&entry.destination, staged.len());
            debug!(src = %entry.source.display(), parked = %parked.display(), "destination is a folder being flattened");
            staged.push(Staged {
                source: entry.source.clone(),
                staged: parked.clone(),
                destination: entry.destination.clone(),
            });
            MovePlanEntry::new(entry.source.clone(), parked)
        })
        .collect();
    (planned, staged)
}

/// `<name>.unfolder-<pid>-<n>` next to `destination`.
fn staging_path(destination: &Path, n: usize) -> PathBuf {
    let mut name = destination.file_name().map(OsString::from).unwrap_or_default();
    name.push(format!(".unfolder-{}-{n}", std::process::id()));
    unique_destination(&destination.with_file_name(name))
}

fn position(folders: &[PathBuf], path: &Path) -> Option<usize> {
    folders.iter().position(|f| f == path)
}

/// The first failure that came out of `folder`, or a batch-level reason.
fn move_failure_detail(folder: &Path, result: &BatchMoveResult) -> String {
    if let Some(f) = result.failures.iter().find(|f| f.source.parent() == Some(folder)) {
        return format!("{}: {}", f.source.display(), f.error);
    }
    if result.any_aborted {
        "some items in the batch were skipped".to_string()
    } else {
        "other items in the batch failed to move".to_string()
    }
}
