//! CLI definition and parsing.
//! Defines Args and provides parse() for command-line handling.
//!
//! Notes:
//! - Folders are optional for clap so `--print-config`/`--init-config` work
//!   alone; the app reports a usage error when none are given.
//! - --debug is a shorthand for --log-level debug.

use clap::{Parser, ValueHint};
use std::ffi::OsString;
use std::time::Duration;

use crate::config::types::{Config, LogLevel};
use crate::fs_ops::ConflictPolicy;

/// Flatten folders into their parent directory.
/// CLI flags override config values (which are loaded from XML if present).
#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Move the contents of each folder into its parent, then remove the emptied folder"
)]
pub struct Args {
    /// Folders to flatten.
    #[arg(value_name = "FOLDER", value_hint = ValueHint::DirPath)]
    pub folders: Vec<OsString>,

    /// Enable debug logging (equivalent to `--log-level debug`).
    #[arg(
        short = 'd',
        long,
        help = "Enable debug logging (shorthand for --log-level debug)"
    )]
    pub debug: bool,

    /// Set log level. One of: quiet, normal, info, debug.
    #[arg(long, help = "Set log level: quiet, normal, info, debug")]
    pub log_level: Option<String>,

    /// Emit logs in structured JSON (includes timestamp, level, and structured fields).
    #[arg(long, help = "Emit logs in structured JSON")]
    pub json: bool,

    #[arg(long, help = "Report success too, not only failures")]
    pub success_popup: bool,

    /// What to do when an item with the same name already exists in the parent.
    #[arg(long = "conflict", value_name = "POLICY", help = "On name conflicts: ask, skip, replace, keep-both")]
    pub conflict: Option<ConflictPolicy>,

    #[arg(long, help = "Delete permanently instead of using the trash")]
    pub no_undo: bool,

    #[arg(long, value_name = "MS", help = "Wait this long for more folders before starting")]
    pub quiet_period_ms: Option<u64>,

    #[arg(long, value_name = "NAME", help = "Name of the instance that batches requests")]
    pub instance_name: Option<String>,

    #[arg(long, help = "Do not batch with other running instances")]
    pub standalone: bool,

    /// Dry-run: print the plan but do not modify the filesystem.
    #[arg(
        long,
        help = "Show what would be done, but do not modify files/directories"
    )]
    pub dry_run: bool,

    /// Print where unfolder will look for the config file (or UNFOLDER_CONFIG if set), then exit.
    #[arg(long, help = "Print the config file location used by unfolder and exit")]
    pub print_config: bool,

    #[arg(long, help = "Write a template config file to the default location and exit")]
    pub init_config: bool,
}

impl Args {
    /// Folder arguments with surrounding quotes removed, in order.
    pub fn sanitized_folders(&self) -> Vec<String> {
        self.folders
            .iter()
            .map(|f| Self::sanitize_str(&f.to_string_lossy()))
            .collect()
    }

    #[inline]
    fn sanitize_str(s: &str) -> String {
        // Shell and Explorer quoting can leave surrounding single/double quotes.
        let trimmed = s.trim();
        if trimmed.len() >= 2
            && ((trimmed.starts_with('"') && trimmed.ends_with('"'))
                || (trimmed.starts_with('\'') && trimmed.ends_with('\'')))
        {
            return trimmed[1..trimmed.len() - 1].to_string();
        }
        trimmed.trim_matches(|c| c == '\'' || c == '"').to_string()
    }

    /// Effective log level derived from flags.
    /// Precedence: --debug > --log-level value > None (use config default).
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        if self.debug {
            return Some(LogLevel::Debug);
        }
        self.log_level.as_deref().and_then(LogLevel::parse)
    }

    /// Apply CLI overrides to a loaded Config (in-place). No-ops for unset flags.
    pub fn apply_overrides(&self, cfg: &mut Config) {
        if let Some(level) = self.effective_log_level() {
            cfg.log_level = level;
        }
        if self.success_popup {
            cfg.success_popup = true;
        }
        if let Some(policy) = self.conflict {
            cfg.conflict_policy = policy;
        }
        if self.no_undo {
            cfg.allow_undo = false;
        }
        if let Some(ms) = self.quiet_period_ms {
            cfg.quiet_period = Duration::from_millis(ms);
        }
        if let Some(name) = &self.instance_name {
            cfg.instance_name = name.clone();
        }
        if self.standalone {
            cfg.standalone = true;
        }
        if self.dry_run {
            cfg.dry_run = true;
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}
