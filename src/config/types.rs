//! Core configuration types.
//! - Config holds runtime settings with sensible defaults.
//! - LogLevel represents verbosity with simple parsing helpers.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::fs_ops::ConflictPolicy;

use super::{
    DEFAULT_INSTANCE_NAME, DEFAULT_POLL_INTERVAL_MS, DEFAULT_QUIET_PERIOD_MS,
    DEFAULT_RELAY_TIMEOUT_MS,
};

/// Program-defined verbosity levels exposed to users/config.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Only errors
    Quiet,
    /// Informational output (default)
    #[default]
    Normal,
    /// More info (like verbose)
    Info,
    /// Debug/trace
    Debug,
}

impl LogLevel {
    /// Parse common string names into our LogLevel (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "quiet" | "error" | "none" => Some(LogLevel::Quiet),
            "normal" => Some(LogLevel::Normal),
            "info" | "verbose" | "detailed" => Some(LogLevel::Info),
            "debug" | "trace" => Some(LogLevel::Debug),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        };
        f.write_str(s)
    }
}

impl FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid log level: '{s}'"))
    }
}

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Show a success line when every folder was flattened
    pub success_popup: bool,
    /// Console verbosity
    pub log_level: LogLevel,
    /// Optional path to a log file
    pub log_file: Option<PathBuf>,
    /// Quiet period after the last relayed request before the batch runs
    pub quiet_period: Duration,
    /// How long the collecting loop blocks per wait
    pub poll_interval: Duration,
    /// How long a secondary keeps trying to reach the primary
    pub relay_timeout: Duration,
    /// What to do when a destination already exists
    pub conflict_policy: ConflictPolicy,
    /// Prefer trash/undo-capable operations where the platform has them
    pub allow_undo: bool,
    /// Name of the singleton lock and relay endpoint
    pub instance_name: String,
    /// Where lock and relay files live (None = platform runtime dir)
    pub runtime_dir: Option<PathBuf>,
    /// If true, print the plan but do not modify the filesystem
    pub dry_run: bool,
    /// If true, skip single-instance coordination entirely
    pub standalone: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            success_popup: false,
            log_level: LogLevel::Normal,
            log_file: None,
            quiet_period: Duration::from_millis(DEFAULT_QUIET_PERIOD_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            relay_timeout: Duration::from_millis(DEFAULT_RELAY_TIMEOUT_MS),
            conflict_policy: ConflictPolicy::default(),
            allow_undo: true,
            instance_name: DEFAULT_INSTANCE_NAME.to_string(),
            runtime_dir: None,
            dry_run: false,
            standalone: false,
        }
    }
}
