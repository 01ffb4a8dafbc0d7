//! Path normalization for folder requests.
//!
//! Requests are relayed between processes with different working
//! directories, so every request is made absolute against the directory of
//! the process that received it, then cleaned lexically (no filesystem
//! access, symlinks are not resolved).

use std::path::{Component, MAIN_SEPARATOR, Path, PathBuf};

use crate::errors::UnfolderError;
use crate::platform::{FOREIGN_SEPARATOR, MAX_PATH_LEN};

/// Canonicalize a raw folder argument.
///
/// Foreign separators become native ones, relative paths are joined onto
/// `base_dir`, `.`/`..` are resolved lexically and trailing separators drop
/// away. Empty input, NUL bytes and over-long results are `InvalidPath`.
pub fn normalize(raw: &str, base_dir: &Path) -> Result<PathBuf, UnfolderError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.contains('\0') {
        return Err(UnfolderError::InvalidPath(raw.to_string()));
    }

    let native = trimmed.replace(FOREIGN_SEPARATOR, &MAIN_SEPARATOR.to_string());
    let p = Path::new(&native);
    let joined = if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    };

    let cleaned = dunce::simplified(&lexical_clean(&joined)).to_path_buf();
    if cleaned.as_os_str().is_empty() || cleaned.as_os_str().len() > MAX_PATH_LEN {
        return Err(UnfolderError::InvalidPath(raw.to_string()));
    }
    Ok(cleaned)
}

/// The path with its final segment removed; a root is returned unchanged.
pub fn parent_of(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => path.to_path_buf(),
    }
}

/// True when `path` has no parent to flatten into.
pub fn is_root(path: &Path) -> bool {
    parent_of(path) == path
}

/// Parent that children of `folder` move into; roots are `NoParent`.
pub fn flatten_target(folder: &Path) -> Result<PathBuf, UnfolderError> {
    let parent = parent_of(folder);
    if parent == folder {
        return Err(UnfolderError::NoParent(folder.to_path_buf()));
    }
    Ok(parent)
}

fn lexical_clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                // `..` at the root stays at the root.
                if out.file_name().is_some() {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
