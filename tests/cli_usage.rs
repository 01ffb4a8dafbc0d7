mod common;

use common::Sandbox;

#[test]
fn no_folders_is_a_usage_error() {
    let sb = Sandbox::new();
    let out = sb.cmd().output().expect("spawn binary");
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Usage"), "stderr: {stderr}");
    assert!(!sb.runtime.exists(), "usage errors must not touch IPC state");
}

#[test]
fn print_config_reports_env_override() {
    let sb = Sandbox::new();
    let out = sb.cmd().arg("--print-config").output().expect("spawn binary");
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains(&sb.config.display().to_string()), "stdout: {stdout}");
}

#[test]
fn missing_explicit_config_fails() {
    let sb = Sandbox::new();
    let out = sb
        .cmd()
        .env("UNFOLDER_CONFIG", sb.root.join("nope.xml"))
        .arg("A")
        .output()
        .expect("spawn binary");
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn unknown_conflict_policy_is_rejected_by_clap() {
    let sb = Sandbox::new();
    let out = sb
        .cmd()
        .args(["--conflict", "sometimes", "A"])
        .output()
        .expect("spawn binary");
    assert!(!out.status.success());
}

#[test]
fn unusable_runtime_dir_is_fatal_before_any_move() {
    let sb = Sandbox::new();
    let a = sb.folder("A", &[("x", "1")]);
    let blocker = sb.root.join("not-a-dir");
    std::fs::write(&blocker, "file").unwrap();

    let out = sb
        .cmd()
        .env("UNFOLDER_RUNTIME_DIR", &blocker)
        .arg("A")
        .output()
        .expect("spawn binary");
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("single-instance coordination"), "stderr: {stderr}");
    assert!(a.join("x").exists());
    assert!(!sb.root.join("x").exists());
}
