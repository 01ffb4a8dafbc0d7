use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use assert_fs::TempDir;

use unfolder::flatten::{ExecuteOptions, FlattenEngine, FolderRequest, FolderStatus, MovePlanEntry, aggregate};
use unfolder::fs_ops::{
    BatchMoveResult, BatchMover, ConflictPolicy, DeleteOptions, Deleter, FsBatchMover, FsDeleter, FsLister,
    MoveOptions,
};

/// Records the batch it was handed and reports a declined overwrite.
struct AbortingMover(Arc<Mutex<Vec<MovePlanEntry>>>);

impl BatchMover for AbortingMover {
    fn move_batch(&mut self, entries: &[MovePlanEntry], _options: &MoveOptions) -> BatchMoveResult {
        self.0.lock().unwrap().extend_from_slice(entries);
        BatchMoveResult {
            overall_ok: true,
            any_aborted: true,
            skipped: entries.len(),
            ..Default::default()
        }
    }
}

struct PanickingDeleter;

impl Deleter for PanickingDeleter {
    fn delete(&mut self, path: &Path, _options: &DeleteOptions) -> io::Result<()> {
        panic!("must not delete {}", path.display());
    }
}

fn root() -> (TempDir, PathBuf) {
    let td = TempDir::new().unwrap();
    let root = dunce::canonicalize(td.path()).unwrap();
    (td, root)
}

#[test]
fn whole_batch_goes_to_the_mover_once_and_abort_keeps_folders() {
    let (_td, root) = root();
    for (folder, child) in [("A", "x"), ("B", "y")] {
        fs::create_dir_all(root.join(folder)).unwrap();
        fs::write(root.join(folder).join(child), child).unwrap();
    }

    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut engine = FlattenEngine::new(
        Box::new(FsLister),
        Box::new(AbortingMover(Arc::clone(&seen))),
        Box::new(PanickingDeleter),
        ExecuteOptions::default(),
    );
    let outcomes = engine.run(&[FolderRequest::new("A", &root), FolderRequest::new("B", &root)]);

    assert_eq!(seen.lock().unwrap().len(), 2);
    assert!(outcomes.iter().all(|o| o.status == FolderStatus::MoveFailed));
    let summary = aggregate(&outcomes);
    assert_eq!((summary.success_count, summary.failure_count), (0, 2));
}

#[test]
fn one_outcome_per_request_in_order() {
    let (_td, root) = root();
    fs::create_dir_all(root.join("A")).unwrap();
    fs::write(root.join("A").join("x"), "x").unwrap();
    fs::write(root.join("file"), "f").unwrap();

    let mut engine = FlattenEngine::new(
        Box::new(FsLister),
        Box::new(FsBatchMover::new(ConflictPolicy::Skip)),
        Box::new(FsDeleter::new()),
        ExecuteOptions {
            allow_undo: false,
            prompt_on_conflict: false,
        },
    );
    let outcomes = engine.run(&[
        FolderRequest::new("file", &root),
        FolderRequest::new("", &root),
        FolderRequest::new("A", &root),
        FolderRequest::new("./A", &root),
    ]);
    let statuses: Vec<_> = outcomes.iter().map(|o| o.status).collect();
    assert_eq!(
        statuses,
        vec![FolderStatus::NotAFolder, FolderStatus::InvalidPath, FolderStatus::Success]
    );
    assert!(!root.join("A").exists());
}

#[cfg(unix)]
#[test]
fn symlinked_folder_is_not_flattened() {
    let (_td, root) = root();
    fs::create_dir_all(root.join("real")).unwrap();
    fs::write(root.join("real").join("x"), "x").unwrap();
    std::os::unix::fs::symlink(root.join("real"), root.join("link")).unwrap();

    let mut engine = FlattenEngine::new(
        Box::new(FsLister),
        Box::new(FsBatchMover::new(ConflictPolicy::Skip)),
        Box::new(FsDeleter::new()),
        ExecuteOptions::default(),
    );
    let outcomes = engine.run(&[FolderRequest::new("link", &root)]);
    assert_eq!(outcomes[0].status, FolderStatus::NotAFolder);
    assert!(root.join("real").join("x").exists());
}

#[test]
fn same_named_children_of_sibling_folders_conflict_in_the_mover() {
    let (_td, root) = root();
    for folder in ["A", "B"] {
        fs::create_dir_all(root.join(folder)).unwrap();
        fs::write(root.join(folder).join("x"), folder).unwrap();
    }

    let mut engine = FlattenEngine::new(
        Box::new(FsLister),
        Box::new(FsBatchMover::new(ConflictPolicy::Skip)),
        Box::new(FsDeleter::new()),
        ExecuteOptions {
            allow_undo: false,
            prompt_on_conflict: false,
        },
    );
    let outcomes = engine.run(&[FolderRequest::new("A", &root), FolderRequest::new("B", &root)]);
    assert!(outcomes.iter().all(|o| o.status == FolderStatus::MoveFailed));
    assert_eq!(fs::read_to_string(root.join("x")).unwrap(), "A");
    assert!(root.join("B").join("x").exists());
}

fn fs_engine(policy: ConflictPolicy) -> FlattenEngine {
    FlattenEngine::new(
        Box::new(FsLister),
        Box::new(FsBatchMover::new(policy)),
        Box::new(FsDeleter::new()),
        ExecuteOptions {
            allow_undo: false,
            prompt_on_conflict: false,
        },
    )
}

fn names(dir: &Path) -> Vec<String> {
    let mut v: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    v.sort();
    v
}

#[test]
fn folder_holding_its_own_name_flattens_under_every_policy() {
    for policy in [
        ConflictPolicy::Ask,
        ConflictPolicy::Skip,
        ConflictPolicy::Replace,
        ConflictPolicy::KeepBoth,
    ] {
        let (_td, root) = root();
        fs::create_dir_all(root.join("A").join("A")).unwrap();
        fs::write(root.join("A").join("A").join("inner.txt"), "inner").unwrap();
        fs::write(root.join("A").join("other.txt"), "other").unwrap();

        let outcomes = fs_engine(policy).run(&[FolderRequest::new("A", &root)]);
        assert_eq!(outcomes[0].status, FolderStatus::Success, "{policy}: {:?}", outcomes[0]);
        assert_eq!(fs::read_to_string(root.join("A").join("inner.txt")).unwrap(), "inner");
        assert_eq!(fs::read_to_string(root.join("other.txt")).unwrap(), "other");
        assert_eq!(names(&root), vec!["A", "other.txt"], "{policy}");
    }
}

#[test]
fn child_named_after_a_sibling_folder_in_the_batch_waits_for_it() {
    let (_td, root) = root();
    fs::create_dir_all(root.join("A")).unwrap();
    fs::write(root.join("A").join("x"), "x").unwrap();
    fs::create_dir_all(root.join("B").join("A")).unwrap();
    fs::write(root.join("B").join("A").join("y"), "y").unwrap();

    let outcomes = fs_engine(ConflictPolicy::Replace)
        .run(&[FolderRequest::new("B", &root), FolderRequest::new("A", &root)]);
    assert!(outcomes.iter().all(|o| o.status == FolderStatus::Success), "{outcomes:?}");
    assert_eq!(fs::read_to_string(root.join("x")).unwrap(), "x");
    assert_eq!(fs::read_to_string(root.join("A").join("y")).unwrap(), "y");
    assert_eq!(names(&root), vec!["A", "x"]);
}

#[test]
fn aborted_batch_puts_a_parked_child_back() {
    let (_td, root) = root();
    fs::create_dir_all(root.join("A").join("A")).unwrap();
    fs::write(root.join("A").join("A").join("inner.txt"), "inner").unwrap();
    fs::write(root.join("A").join("x"), "new").unwrap();
    fs::write(root.join("x"), "old").unwrap();

    let outcomes = fs_engine(ConflictPolicy::Skip).run(&[FolderRequest::new("A", &root)]);
    assert_eq!(outcomes[0].status, FolderStatus::MoveFailed);
    assert_eq!(fs::read_to_string(root.join("A").join("A").join("inner.txt")).unwrap(), "inner");
    assert_eq!(fs::read_to_string(root.join("A").join("x")).unwrap(), "new");
    assert_eq!(names(&root), vec!["A", "x"]);
}
