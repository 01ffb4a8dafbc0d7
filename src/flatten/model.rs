//! Value types shared by the planner, executor and coordinator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// A raw folder argument from one invocation, plus the working directory
/// it is relative to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FolderRequest {
    pub raw: String,
    pub cwd: PathBuf,
}

impl FolderRequest {
    pub fn new(raw: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            raw: raw.into(),
            cwd: cwd.into(),
        }
    }
}

/// One child to relocate: `destination = parent_of(folder) / file_name(source)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovePlanEntry {
    pub source: PathBuf,
    pub destination: PathBuf,
}

impl MovePlanEntry {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }

    /// Folder this entry is being moved out of.
    pub fn folder(&self) -> Option<&Path> {
        self.source.parent()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FolderStatus {
    /// Children moved and the folder was removed
    Success,
    /// Folder had no children and was left untouched
    Empty,
    InvalidPath,
    NoParent,
    NotAFolder,
    ListFailed,
    MoveFailed,
    NotEmptyAfterMove,
    DeleteFailed,
}

impl FolderStatus {
    pub fn is_failure(self) -> bool {
        !matches!(self, FolderStatus::Success | FolderStatus::Empty)
    }

    pub fn describe(self) -> &'static str {
        match self {
            FolderStatus::Success => "flattened",
            FolderStatus::Empty => "already empty, left untouched",
            FolderStatus::InvalidPath => "invalid path",
            FolderStatus::NoParent => "has no parent folder",
            FolderStatus::NotAFolder => "not a folder",
            FolderStatus::ListFailed => "could not list contents",
            FolderStatus::MoveFailed => "not all items were moved; folder kept",
            FolderStatus::NotEmptyAfterMove => "still not empty after moving; folder kept",
            FolderStatus::DeleteFailed => "items moved but the folder could not be deleted",
        }
    }
}

impl fmt::Display for FolderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Final result for one requested folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderOutcome {
    pub folder_path: PathBuf,
    pub status: FolderStatus,
    pub detail: Option<String>,
}

impl FolderOutcome {
    pub fn new(folder_path: impl Into<PathBuf>, status: FolderStatus) -> Self {
        Self {
            folder_path: folder_path.into(),
            status,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Add a note after any existing detail.
    pub fn add_note(&mut self, note: &str) {
        self.detail = Some(match self.detail.take() {
            Some(d) => format!("{d}; {note}"),
            None => note.to_string(),
        });
    }
}

impl fmt::Display for FolderOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.folder_path.display(), self.status)?;
        if let Some(d) = &self.detail {
            write!(f, " ({d})")?;
        }
        Ok(())
    }
}
