//! Destination conflict handling for batch moves.
//!
//! A `ConflictPolicy` is injected into the mover. `Ask` defers to a
//! `ConflictPrompt`; answering "replace all" / "skip all" makes the choice
//! sticky for the rest of the batch.

use std::ffi::OsString;
use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::SystemTime;
use tracing::debug;

use crate::output::stdin_is_interactive;

/// What to do when a move destination already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Ask per conflict (falls back to Skip without a terminal)
    #[default]
    Ask,
    /// Leave both source and destination untouched
    Skip,
    /// Remove the existing destination, then move
    Replace,
    /// Move under a unique sibling name
    KeepBoth,
}

impl ConflictPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ask" | "prompt" => Some(ConflictPolicy::Ask),
            "skip" | "skip-all" | "skip_all" => Some(ConflictPolicy::Skip),
            "replace" | "overwrite" | "replace-all" | "replace_all" => {
                Some(ConflictPolicy::Replace)
            }
            "keep-both" | "keep_both" | "rename" => Some(ConflictPolicy::KeepBoth),
            _ => None,
        }
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConflictPolicy::Ask => "ask",
            ConflictPolicy::Skip => "skip",
            ConflictPolicy::Replace => "replace",
            ConflictPolicy::KeepBoth => "keep-both",
        })
    }
}

impl FromStr for ConflictPolicy {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            format!("invalid conflict policy: '{s}' (expected ask, skip, replace or keep-both)")
        })
    }
}

/// An answer to a single conflict prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictChoice {
    Replace,
    Skip,
    ReplaceAll,
    SkipAll,
    KeepBoth,
}

/// Resolved action for one conflicting entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictAction {
    Replace,
    Skip,
    /// Move to this alternative destination instead
    KeepBoth(PathBuf),
}

/// Asks the user how to resolve one conflict.
pub trait ConflictPrompt {
    fn ask(&mut self, source: &Path, destination: &Path) -> ConflictChoice;
}

/// Prompt on stderr, answer on stdin. Without a terminal every conflict is skipped.
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl ConflictPrompt for TerminalPrompt {
    fn ask(&mut self, source: &Path, destination: &Path) -> ConflictChoice {
        if !stdin_is_interactive() {
            return ConflictChoice::Skip;
        }
        let question = format!(
            "'{}' already exists (moving '{}').\n  [r]eplace, [s]kip, replace [a]ll, skip a[l]l, [k]eep both? [s] ",
            destination.display(),
            source.display()
        );
        match read_answer(&question).as_deref() {
            Some("r") => ConflictChoice::Replace,
            Some("a") => ConflictChoice::ReplaceAll,
            Some("l") => ConflictChoice::SkipAll,
            Some("k") => ConflictChoice::KeepBoth,
            _ => ConflictChoice::Skip,
        }
    }
}

/// Print `question` to stderr and read one trimmed, lowercased line from stdin.
pub(crate) fn read_answer(question: &str) -> Option<String> {
    let mut stderr = io::stderr();
    let _ = write!(stderr, "{question}");
    let _ = stderr.flush();
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim().to_ascii_lowercase()),
    }
}

/// Turns the configured policy (plus prompt answers) into per-entry actions.
pub struct ConflictResolver {
    policy: ConflictPolicy,
    sticky: Option<ConflictPolicy>,
    prompt: Box<dyn ConflictPrompt + Send>,
}

impl ConflictResolver {
    pub fn new(policy: ConflictPolicy) -> Self {
        Self::with_prompt(policy, Box::new(TerminalPrompt))
    }

    pub fn with_prompt(policy: ConflictPolicy, prompt: Box<dyn ConflictPrompt + Send>) -> Self {
        Self {
            policy,
            sticky: None,
            prompt,
        }
    }

    /// Forget "all" answers from a previous batch.
    pub fn reset(&mut self) {
        self.sticky = None;
    }

    /// Decide what to do with `source` whose `destination` already exists.
    pub fn resolve(&mut self, source: &Path, destination: &Path, prompt_enabled: bool) -> ConflictAction {
        let effective = self.sticky.unwrap_or(self.policy);
        let policy = match effective {
            ConflictPolicy::Ask if !prompt_enabled => ConflictPolicy::Skip,
            ConflictPolicy::Ask => match self.prompt.ask(source, destination) {
                ConflictChoice::Replace => ConflictPolicy::Replace,
                ConflictChoice::Skip => ConflictPolicy::Skip,
                ConflictChoice::KeepBoth => ConflictPolicy::KeepBoth,
                ConflictChoice::ReplaceAll => {
                    self.sticky = Some(ConflictPolicy::Replace);
                    ConflictPolicy::Replace
                }
                ConflictChoice::SkipAll => {
                    self.sticky = Some(ConflictPolicy::Skip);
                    ConflictPolicy::Skip
                }
            },
            other => other,
        };
        debug!(dest = %destination.display(), %policy, "conflict resolved");
        match policy {
            ConflictPolicy::Replace => ConflictAction::Replace,
            ConflictPolicy::KeepBoth => ConflictAction::KeepBoth(unique_destination(destination)),
            ConflictPolicy::Skip | ConflictPolicy::Ask => ConflictAction::Skip,
        }
    }
}

/// Return a unique destination by appending timestamp+pid when candidate exists.
/// - Preserves non-UTF8 names (uses OsString).
/// - Format: "<stem>-<millis>-<pid>[-<n>].<ext?>"
pub fn unique_destination(candidate: &Path) -> PathBuf {
    if !exists_no_follow(candidate) {
        return candidate.to_path_buf();
    }

    let epoch_ms = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let pid = std::process::id();

    let stem = candidate
        .file_stem()
        .map(|s| s.to_owned())
        .unwrap_or_else(|| OsString::from("file"));
    let ext = candidate.extension().map(|e| e.to_owned());

    let build = |suffix: String| {
        let mut name = OsString::new();
        name.push(&stem);
        name.push(suffix);
        if let Some(ref e) = ext {
            name.push(".");
            name.push(e);
        }
        candidate.with_file_name(name)
    };

    let dest = build(format!("-{epoch_ms}-{pid}"));
    if !exists_no_follow(&dest) {
        return dest;
    }
    for n in 2u32..=99 {
        let alt = build(format!("-{epoch_ms}-{pid}-{n}"));
        if !exists_no_follow(&alt) {
            return alt;
        }
    }
    build(format!("-{epoch_ms}-{pid}-final"))
}

/// Existence check that also sees dangling symlinks.
pub(crate) fn exists_no_follow(p: &Path) -> bool {
    std::fs::symlink_metadata(p).is_ok()
}
