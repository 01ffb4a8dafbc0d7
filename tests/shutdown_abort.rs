// Own test binary: the shutdown flag is process-wide and never cleared.
use std::fs;
use tempfile::tempdir;

use unfolder::flatten::MovePlanEntry;
use unfolder::fs_ops::{BatchMover, ConflictPolicy, FsBatchMover, MoveOptions};
use unfolder::shutdown;

#[test]
fn shutdown_stops_the_batch_before_the_next_entry() {
    let td = tempdir().unwrap();
    let folder = td.path().join("A");
    fs::create_dir_all(&folder).unwrap();
    fs::write(folder.join("x"), "x").unwrap();
    fs::write(folder.join("y"), "y").unwrap();

    shutdown::request();
    let entries = vec![
        MovePlanEntry::new(folder.join("x"), td.path().join("x")),
        MovePlanEntry::new(folder.join("y"), td.path().join("y")),
    ];
    let res = FsBatchMover::new(ConflictPolicy::Skip).move_batch(
        &entries,
        &MoveOptions {
            allow_undo: false,
            multi_destination: true,
            prompt_on_conflict: false,
        },
    );
    assert!(res.any_aborted);
    assert_eq!((res.moved, res.skipped), (0, 2));
    assert!(folder.join("x").exists() && folder.join("y").exists());
}
