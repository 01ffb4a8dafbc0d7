//! Batch planning: turn requested folders into one list of moves.
//!
//! Folders are inspected in parallel (rayon) but results are collected in
//! input order, and children keep the order the lister returned them in.

use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::model::{FolderOutcome, FolderStatus, MovePlanEntry};
use super::path::flatten_target;
use crate::fs_ops::DirLister;

/// Moves for a whole batch plus the folders they empty.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    pub entries: Vec<MovePlanEntry>,
    /// Folders with at least one child; deleted once their children moved
    pub deletable: Vec<PathBuf>,
    pub rejected: Vec<FolderOutcome>,
    /// Folders with no children, left untouched
    pub empty: Vec<PathBuf>,
}

impl BatchPlan {
    /// Destinations claimed by more than one entry. The mover's conflict
    /// handling settles these; the plan only reports them.
    pub fn colliding_destinations(&self) -> Vec<&Path> {
        let mut seen = HashSet::new();
        let mut dupes = Vec::new();
        for entry in &self.entries {
            if !seen.insert(entry.destination.as_path()) && !dupes.contains(&entry.destination.as_path()) {
                dupes.push(entry.destination.as_path());
            }
        }
        dupes
    }
}

enum FolderPlan {
    Rejected(FolderOutcome),
    Empty(PathBuf),
    Children(PathBuf, Vec<MovePlanEntry>),
}

pub fn plan<L>(folders: &[PathBuf], lister: &L) -> BatchPlan
where
    L: DirLister + Sync + ?Sized,
{
    let per_folder: Vec<FolderPlan> = folders
        .par_iter()
        .map(|folder| plan_folder(folder, lister))
        .collect();

    let mut out = BatchPlan::default();
    for fp in per_folder {
        match fp {
            FolderPlan::Rejected(o) => out.rejected.push(o),
            FolderPlan::Empty(folder) => out.empty.push(folder),
            FolderPlan::Children(folder, entries) => {
                out.entries.extend(entries);
                out.deletable.push(folder);
            }
        }
    }

    for dest in out.colliding_destinations() {
        warn!(dest = %dest.display(), "Several folders move an item to the same destination");
    }
    debug!(
        entries = out.entries.len(),
        deletable = out.deletable.len(),
        rejected = out.rejected.len(),
        empty = out.empty.len(),
        "Batch planned"
    );
    out
}

fn plan_folder<L>(folder: &Path, lister: &L) -> FolderPlan
where
    L: DirLister + ?Sized,
{
    let parent = match flatten_target(folder) {
        Ok(p) => p,
        Err(e) => {
            return FolderPlan::Rejected(
                FolderOutcome::new(folder, FolderStatus::NoParent).with_detail(e.to_string()),
            );
        }
    };
    if !lister.is_folder(folder) {
        return FolderPlan::Rejected(FolderOutcome::new(folder, FolderStatus::NotAFolder));
    }

    let children = match lister.list_children(folder) {
        Ok(c) => c,
        Err(e) => {
            return FolderPlan::Rejected(
                FolderOutcome::new(folder, FolderStatus::ListFailed).with_detail(e.to_string()),
            );
        }
    };
    if children.is_empty() {
        return FolderPlan::Empty(folder.to_path_buf());
    }

    let entries = children
        .into_iter()
        .filter_map(|child| {
            let name = child.file_name()?.to_owned();
            Some(MovePlanEntry::new(child, parent.join(name)))
        })
        .collect();
    FolderPlan::Children(folder.to_path_buf(), entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io;

    /// In-memory tree: folder -> children, missing key = not a folder.
    #[derive(Default)]
    struct FakeLister {
        dirs: HashMap<PathBuf, Vec<PathBuf>>,
        unreadable: Vec<PathBuf>,
    }

    impl FakeLister {
        fn dir(mut self, path: &str, children: &[&str]) -> Self {
            let p = PathBuf::from(path);
            let kids = children.iter().map(|c| p.join(c)).collect();
            self.dirs.insert(p, kids);
            self
        }
    }

    impl DirLister for FakeLister {
        fn is_folder(&self, path: &Path) -> bool {
            self.dirs.contains_key(path) || self.unreadable.iter().any(|p| p == path)
        }

        fn list_children(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
            if self.unreadable.iter().any(|p| p == path) {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
            }
            Ok(self.dirs.get(path).cloned().unwrap_or_default())
        }
    }

    #[test]
    fn entries_target_the_parent_in_listing_order() {
        let lister = FakeLister::default().dir("/P/A", &["y", "x"]);
        let plan = plan(&[PathBuf::from("/P/A")], &lister);
        assert_eq!(
            plan.entries,
            vec![
                MovePlanEntry::new("/P/A/y", "/P/y"),
                MovePlanEntry::new("/P/A/x", "/P/x"),
            ]
        );
        assert_eq!(plan.deletable, vec![PathBuf::from("/P/A")]);
        assert!(plan.rejected.is_empty());
    }

    #[test]
    fn rejections_keep_input_order() {
        let mut lister = FakeLister::default().dir("/P/ok", &["f"]);
        lister.unreadable.push(PathBuf::from("/P/locked"));
        let folders = vec![
            PathBuf::from("/P/missing"),
            PathBuf::from("/"),
            PathBuf::from("/P/locked"),
            PathBuf::from("/P/ok"),
        ];
        let plan = plan(&folders, &lister);
        let statuses: Vec<_> = plan.rejected.iter().map(|o| o.status).collect();
        assert_eq!(
            statuses,
            vec![FolderStatus::NotAFolder, FolderStatus::NoParent, FolderStatus::ListFailed]
        );
        assert_eq!(plan.deletable, vec![PathBuf::from("/P/ok")]);
    }

    #[test]
    fn empty_folder_is_neither_planned_nor_deletable() {
        let lister = FakeLister::default().dir("/P/E", &[]);
        let plan = plan(&[PathBuf::from("/P/E")], &lister);
        assert!(plan.entries.is_empty());
        assert!(plan.deletable.is_empty());
        assert_eq!(plan.empty, vec![PathBuf::from("/P/E")]);
    }

    #[test]
    fn sibling_folders_with_same_child_name_are_reported() {
        let lister = FakeLister::default()
            .dir("/P/A", &["x", "a"])
            .dir("/P/B", &["x"]);
        let plan = plan(&[PathBuf::from("/P/A"), PathBuf::from("/P/B")], &lister);
        assert_eq!(plan.entries.len(), 3);
        assert_eq!(plan.colliding_destinations(), vec![Path::new("/P/x")]);
    }
}
