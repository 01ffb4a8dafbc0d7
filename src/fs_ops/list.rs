//! Directory-listing collaborator backed by `std::fs::read_dir`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::DirLister;
use super::helpers::io_error_with_help_io;

/// Lists direct children in the order the OS returns them.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsLister;

impl DirLister for FsLister {
    fn list_children(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        fs::read_dir(path)
            .map_err(io_error_with_help_io("list directory", path))?
            .map(|entry| {
                entry
                    .map(|e| e.path())
                    .map_err(io_error_with_help_io("read directory entry", path))
            })
            .collect()
    }
}
