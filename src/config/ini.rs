//! Legacy `config.ini` support.
//!
//! Older installs ship a `config.ini` next to the executable holding simple
//! `Key=value` lines, e.g. `SuccessPopup=1`. Only boolean options are read.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Read a boolean `key=value` option. Missing file, missing key or an
/// unparseable value all yield `false`.
///
/// Integers are true when non-zero; `true/yes/on` and `false/no/off` are
/// accepted case-insensitively. The first line carrying `key` decides.
pub fn read_bool_option(config_path: &Path, key: &str) -> bool {
    let content = match fs::read_to_string(config_path) {
        Ok(c) => c,
        Err(e) => {
            debug!(path = %config_path.display(), error = %e, "legacy config not readable");
            return false;
        }
    };

    for line in content.lines() {
        let Some((k, v)) = line.split_once('=') else {
            continue;
        };
        if k.trim() != key {
            continue;
        }
        return parse_bool(v.trim()).unwrap_or(false);
    }
    false
}

fn parse_bool(v: &str) -> Option<bool> {
    // Leading integer wins ("1", "0", "2 ; comment").
    let digits: String = v
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '-')
        .collect();
    if let Ok(n) = digits.parse::<i64>() {
        return Some(n != 0);
    }
    match v.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" => Some(true),
        "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// `config.ini` beside the running executable, if the executable path is known.
pub fn legacy_ini_path() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    Some(exe.parent()?.join("config.ini"))
}
