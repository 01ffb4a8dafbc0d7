//! Folder flattening: normalize requests, plan one batch of moves, execute
//! it and report one outcome per requested folder.

pub mod executor;
pub mod model;
pub mod path;
pub mod planner;
pub mod summary;

pub use executor::{ExecuteOptions, FlattenExecutor};
pub use model::{FolderOutcome, FolderRequest, FolderStatus, MovePlanEntry};
pub use path::{flatten_target, normalize, parent_of};
pub use planner::{BatchPlan, plan};
pub use summary::{Summary, aggregate};

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use tracing::debug;

use crate::config::Config;
use crate::fs_ops::{BatchMover, Deleter, DirLister, FsBatchMover, FsDeleter, FsLister};

/// Normalize requests in order. Invalid ones become `InvalidPath` outcomes;
/// a folder requested twice keeps only its first occurrence.
pub fn resolve_requests(requests: &[FolderRequest]) -> Vec<Result<PathBuf, FolderOutcome>> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(requests.len());
    for req in requests {
        match normalize(&req.raw, &req.cwd) {
            Ok(folder) => {
                if seen.insert(folder.clone()) {
                    out.push(Ok(folder));
                } else {
                    debug!(folder = %folder.display(), "Duplicate request ignored");
                }
            }
            Err(e) => out.push(Err(
                FolderOutcome::new(&req.raw, FolderStatus::InvalidPath).with_detail(e.to_string()),
            )),
        }
    }
    out
}

/// Planner, executor and collaborators wired together.
pub struct FlattenEngine {
    lister: Box<dyn DirLister + Sync>,
    mover: Box<dyn BatchMover>,
    deleter: Box<dyn Deleter>,
    options: ExecuteOptions,
}

impl FlattenEngine {
    pub fn new(
        lister: Box<dyn DirLister + Sync>,
        mover: Box<dyn BatchMover>,
        deleter: Box<dyn Deleter>,
        options: ExecuteOptions,
    ) -> Self {
        Self {
            lister,
            mover,
            deleter,
            options,
        }
    }

    /// Filesystem-backed engine honouring the configured conflict policy
    /// and undo preference.
    pub fn from_config(cfg: &Config) -> Self {
        Self::new(
            Box::new(FsLister),
            Box::new(FsBatchMover::new(cfg.conflict_policy)),
            Box::new(FsDeleter::new()),
            ExecuteOptions {
                allow_undo: cfg.allow_undo,
                prompt_on_conflict: true,
            },
        )
    }

    /// Plan without touching the filesystem. Invalid requests are listed
    /// first among the rejections.
    pub fn preview(&self, requests: &[FolderRequest]) -> BatchPlan {
        let (folders, invalid) = split_resolved(resolve_requests(requests));
        let mut plan = plan(&folders, self.lister.as_ref());
        plan.rejected.splice(0..0, invalid);
        plan
    }

    /// Flatten every requested folder. Returns exactly one outcome per
    /// distinct request, in request order.
    pub fn run(&mut self, requests: &[FolderRequest]) -> Vec<FolderOutcome> {
        let resolved = resolve_requests(requests);
        let folders: Vec<PathBuf> = resolved
            .iter()
            .filter_map(|r| r.as_ref().ok().cloned())
            .collect();

        let batch = plan(&folders, self.lister.as_ref());
        let executed = FlattenExecutor {
            lister: self.lister.as_ref(),
            mover: self.mover.as_mut(),
            deleter: self.deleter.as_mut(),
            options: self.options,
        }
        .execute(&batch.entries, &batch.deletable);

        let mut by_folder: HashMap<PathBuf, FolderOutcome> = batch
            .rejected
            .into_iter()
            .chain(
                batch
                    .empty
                    .into_iter()
                    .map(|f| FolderOutcome::new(f, FolderStatus::Empty)),
            )
            .chain(executed)
            .map(|o| (o.folder_path.clone(), o))
            .collect();

        resolved
            .into_iter()
            .map(|r| match r {
                Err(outcome) => outcome,
                Ok(folder) => by_folder.remove(&folder).unwrap_or_else(|| {
                    FolderOutcome::new(folder, FolderStatus::MoveFailed)
                        .with_detail("no result recorded")
                }),
            })
            .collect()
    }
}

fn split_resolved(
    resolved: Vec<Result<PathBuf, FolderOutcome>>,
) -> (Vec<PathBuf>, Vec<FolderOutcome>) {
    let mut folders = Vec::new();
    let mut invalid = Vec::new();
    for r in resolved {
        match r {
            Ok(f) => folders.push(f),
            Err(o) => invalid.push(o),
        }
    }
    (folders, invalid)
}
