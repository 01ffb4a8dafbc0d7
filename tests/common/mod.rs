#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Temp parent folder plus an isolated config file and runtime dir, so the
/// binary never sees the user's real config or a running instance.
pub struct Sandbox {
    _dir: TempDir,
    pub root: PathBuf,
    pub config: PathBuf,
    pub runtime: PathBuf,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let base = dunce::canonicalize(dir.path()).unwrap();
        let root = base.join("P");
        let runtime = base.join("run");
        fs::create_dir_all(&root).unwrap();
        let config = base.join("config.xml");
        fs::write(
            &config,
            "<config>\n  <allow_undo>false</allow_undo>\n  <conflict_policy>skip</conflict_policy>\n</config>\n",
        )
        .unwrap();
        Self {
            _dir: dir,
            root,
            config,
            runtime,
        }
    }

    /// Create `root/<folder>` holding the given files.
    pub fn folder(&self, folder: &str, files: &[(&str, &str)]) -> PathBuf {
        let dir = self.root.join(folder);
        fs::create_dir_all(&dir).unwrap();
        for (name, body) in files {
            fs::write(dir.join(name), body).unwrap();
        }
        dir
    }

    pub fn cmd(&self) -> Command {
        let mut c = Command::new(assert_cmd::cargo::cargo_bin!("unfolder"));
        c.current_dir(&self.root)
            .env("UNFOLDER_CONFIG", &self.config)
            .env("UNFOLDER_RUNTIME_DIR", &self.runtime);
        c
    }
}

pub fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}
