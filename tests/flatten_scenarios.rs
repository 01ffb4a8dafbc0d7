mod common;

use common::{Sandbox, read};
use std::fs;

#[test]
fn flattens_files_into_parent_and_removes_folder() {
    let sb = Sandbox::new();
    let a = sb.folder("A", &[("x", "1"), ("y", "2")]);

    let out = sb
        .cmd()
        .args(["--standalone", "--success-popup"])
        .arg(&a)
        .output()
        .expect("spawn binary");
    assert!(out.status.success());
    assert_eq!(read(&sb.root.join("x")), "1");
    assert_eq!(read(&sb.root.join("y")), "2");
    assert!(!a.exists());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("1 folder flattened"), "stdout: {stdout}");
}

#[test]
fn nested_directories_move_as_a_whole() {
    let sb = Sandbox::new();
    let a = sb.folder("A", &[("top", "t")]);
    fs::create_dir_all(a.join("sub").join("deep")).unwrap();
    fs::write(a.join("sub").join("deep").join("f"), "f").unwrap();

    let out = sb.cmd().args(["--standalone", "A"]).output().expect("spawn binary");
    assert!(out.status.success());
    assert_eq!(read(&sb.root.join("sub").join("deep").join("f")), "f");
    assert!(!a.exists());
}

#[test]
fn skipped_conflict_keeps_folder_and_reports() {
    let sb = Sandbox::new();
    let a = sb.folder("A", &[("x", "new")]);
    fs::write(sb.root.join("x"), "old").unwrap();

    let out = sb.cmd().args(["--standalone", "A"]).output().expect("spawn binary");
    assert!(out.status.success());
    assert_eq!(read(&sb.root.join("x")), "old");
    assert_eq!(read(&a.join("x")), "new");
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("1 failed"), "stderr: {stderr}");
    assert!(stderr.contains("folder kept"), "stderr: {stderr}");
}

#[test]
fn aborted_batch_keeps_every_folder() {
    let sb = Sandbox::new();
    let a = sb.folder("A", &[("x", "new")]);
    let b = sb.folder("B", &[("z", "z")]);
    fs::write(sb.root.join("x"), "old").unwrap();

    let out = sb
        .cmd()
        .args(["--standalone", "A", "B"])
        .output()
        .expect("spawn binary");
    assert!(out.status.success());
    // B's child moved, but B is kept because the batch was not clean.
    assert!(sb.root.join("z").exists());
    assert!(b.is_dir());
    assert!(a.join("x").exists());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("2 failed"), "stderr: {stderr}");
}

#[test]
fn replace_policy_overwrites_existing_items() {
    let sb = Sandbox::new();
    let a = sb.folder("A", &[("x", "new")]);
    fs::write(sb.root.join("x"), "old").unwrap();

    let out = sb
        .cmd()
        .args(["--standalone", "--conflict", "replace", "A"])
        .output()
        .expect("spawn binary");
    assert!(out.status.success());
    assert_eq!(read(&sb.root.join("x")), "new");
    assert!(!a.exists());
}

#[test]
fn second_run_reports_not_a_folder() {
    let sb = Sandbox::new();
    sb.folder("A", &[("x", "1")]);

    let first = sb.cmd().args(["--standalone", "A"]).output().expect("spawn binary");
    assert!(first.status.success());
    let second = sb.cmd().args(["--standalone", "A"]).output().expect("spawn binary");
    assert!(second.status.success());
    let stderr = String::from_utf8_lossy(&second.stderr);
    assert!(stderr.contains("not a folder"), "stderr: {stderr}");
    assert_eq!(read(&sb.root.join("x")), "1");
}

#[test]
fn empty_folder_is_left_alone() {
    let sb = Sandbox::new();
    let e = sb.folder("E", &[]);

    let out = sb
        .cmd()
        .args(["--standalone", "--success-popup", "E"])
        .output()
        .expect("spawn binary");
    assert!(out.status.success());
    assert!(e.is_dir());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("1 already empty"), "stdout: {stdout}");
}

#[test]
fn quoted_and_backslashed_arguments_are_normalized() {
    let sb = Sandbox::new();
    sb.folder("A", &[("x", "1")]);

    #[cfg(unix)]
    let arg = format!("\"{}\\A\\\"", sb.root.display());
    #[cfg(windows)]
    let arg = format!("\"{}/A/\"", sb.root.display());

    let out = sb.cmd().arg("--standalone").arg(arg).output().expect("spawn binary");
    assert!(out.status.success());
    assert!(sb.root.join("x").exists());
    assert!(!sb.root.join("A").exists());
}

#[test]
fn dry_run_prints_plan_and_changes_nothing() {
    let sb = Sandbox::new();
    let a = sb.folder("A", &[("x", "1")]);

    let out = sb.cmd().args(["--dry-run", "A"]).output().expect("spawn binary");
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("would move"), "stdout: {stdout}");
    assert!(stdout.contains("would remove"), "stdout: {stdout}");
    assert!(a.join("x").exists());
    assert!(!sb.root.join("x").exists());
}
