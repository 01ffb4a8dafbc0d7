//! Filesystem batch mover.
//!
//! Moves every entry of a plan in order. Existing destinations go through the
//! injected `ConflictResolver`; a skipped conflict marks the batch as
//! aborted while the remaining entries are still attempted.

use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::conflict::{ConflictAction, ConflictPolicy, ConflictResolver, exists_no_follow};
use super::copy::copy_then_remove;
use super::delete::remove_tree;
use super::helpers::io_error_with_help_io;
use super::{BatchMoveResult, BatchMover, MoveFailure, MoveOptions};
use crate::flatten::MovePlanEntry;
use crate::platform::is_cross_device;
use crate::shutdown;

pub struct FsBatchMover {
    resolver: ConflictResolver,
}

impl FsBatchMover {
    pub fn new(policy: ConflictPolicy) -> Self {
        Self::with_resolver(ConflictResolver::new(policy))
    }

    pub fn with_resolver(resolver: ConflictResolver) -> Self {
        Self { resolver }
    }
}

impl BatchMover for FsBatchMover {
    fn move_batch(&mut self, entries: &[MovePlanEntry], options: &MoveOptions) -> BatchMoveResult {
        self.resolver.reset();
        let mut result = BatchMoveResult::default();

        for (idx, entry) in entries.iter().enumerate() {
            if shutdown::is_requested() {
                let rest = entries.len() - idx;
                warn!(remaining = rest, "Shutdown requested; not moving remaining entries");
                result.any_aborted = true;
                result.skipped += rest;
                break;
            }

            let mut dest = target_for(entry, options.multi_destination);
            if exists_no_follow(&dest) {
                match self
                    .resolver
                    .resolve(&entry.source, &dest, options.prompt_on_conflict)
                {
                    ConflictAction::Skip => {
                        info!(src = %entry.source.display(), dest = %dest.display(), "Destination exists; skipped");
                        result.any_aborted = true;
                        result.skipped += 1;
                        continue;
                    }
                    ConflictAction::Replace => {
                        if let Err(e) = clear_destination(&dest, options.allow_undo) {
                            result.record_failure(entry, &dest, e);
                            continue;
                        }
                    }
                    ConflictAction::KeepBoth(alt) => dest = alt,
                }
            }

            match move_one(&entry.source, &dest) {
                Ok(()) => {
                    debug!(src = %entry.source.display(), dest = %dest.display(), "moved");
                    result.moved += 1;
                }
                Err(e) => result.record_failure(entry, &dest, e),
            }
        }

        result.overall_ok = result.failures.is_empty();
        result
    }
}

impl BatchMoveResult {
    fn record_failure(&mut self, entry: &MovePlanEntry, dest: &Path, e: io::Error) {
        warn!(src = %entry.source.display(), dest = %dest.display(), error = %e, "Move failed");
        self.failures.push(MoveFailure {
            source: entry.source.clone(),
            destination: dest.to_path_buf(),
            error: e.to_string(),
        });
    }
}

/// With multi-destination semantics each entry names its own target;
/// otherwise the destination is a directory receiving the source by name.
fn target_for(entry: &MovePlanEntry, multi_destination: bool) -> PathBuf {
    if multi_destination {
        return entry.destination.clone();
    }
    match entry.source.file_name() {
        Some(name) => entry.destination.join(name),
        None => entry.destination.clone(),
    }
}

/// Rename, falling back to copy + remove across filesystems.
pub fn move_one(src: &Path, dest: &Path) -> io::Result<()> {
    match std::fs::rename(src, dest) {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device(&e) => {
            debug!(src = %src.display(), "cross-device rename; copying instead");
            copy_then_remove(src, dest)
        }
        Err(e) => Err(io_error_with_help_io("move", src)(e)),
    }
}

/// Make room for a replacing move: trash the old entry when undo is allowed,
/// otherwise remove it permanently.
fn clear_destination(dest: &Path, allow_undo: bool) -> io::Result<()> {
    if allow_undo {
        match trash::delete(dest) {
            Ok(()) => {
                info!(dest = %dest.display(), "Replaced entry moved to trash");
                return Ok(());
            }
            Err(e) => {
                warn!(dest = %dest.display(), error = %e, "Trash unavailable; replacing permanently");
            }
        }
    }
    remove_tree(dest)
}
