//! Default path helpers and symlink checks.
//! Determines OS-appropriate config/log/runtime paths and detects symlinked
//! ancestors for safety.

use dirs::{config_dir, data_dir};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::{CONFIG_ENV, RUNTIME_DIR_ENV};

/// Config path in use: `UNFOLDER_CONFIG` if set, else the OS default.
pub fn default_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(p));
    }
    if let Some(mut base) = config_dir() {
        base.push("unfolder");
        base.push("config.xml");
        Some(base)
    } else {
        env::var("HOME").ok().map(|h| {
            PathBuf::from(h)
                .join(".config")
                .join("unfolder")
                .join("config.xml")
        })
    }
}

/// OS-appropriate default log file path (data dir).
pub fn default_log_path() -> Option<PathBuf> {
    data_dir().map(|base| base.join("unfolder").join("unfolder.log"))
}

/// Directory holding the singleton lock and relay endpoint.
///
/// Precedence: explicit override, `UNFOLDER_RUNTIME_DIR`, the platform runtime
/// dir, then a per-user folder under the temp dir.
pub fn runtime_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    if let Some(p) = env::var_os(RUNTIME_DIR_ENV) {
        return PathBuf::from(p);
    }
    if let Some(base) = dirs::runtime_dir() {
        return base.join("unfolder");
    }
    let user = env::var("USER")
        .or_else(|_| env::var("USERNAME"))
        .unwrap_or_else(|_| "user".into());
    env::temp_dir().join(format!("unfolder-{user}"))
}

/// Return true if any existing ancestor of `path` is a symlink.
pub fn path_has_symlink_ancestor(path: &Path) -> io::Result<bool> {
    let mut p = path.parent();
    while let Some(anc) = p {
        if anc.exists() {
            let meta = fs::symlink_metadata(anc)?;
            if meta.file_type().is_symlink() {
                return Ok(true);
            }
        }
        p = anc.parent();
    }
    Ok(false)
}
