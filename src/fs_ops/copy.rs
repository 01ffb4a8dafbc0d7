//! Cross-filesystem fallback for moves: copy, then remove the source.
//! Used only when `rename` reports a cross-device link error.

use std::fs;
use std::io;
use std::path::Path;
use tracing::info;
use walkdir::WalkDir;

use super::delete::remove_tree;
use super::helpers::io_error_with_help_io;

/// Copy `src` (file, symlink or directory tree) to `dst`, then remove `src`.
/// On copy failure the partial destination is removed and `src` is left intact.
pub fn copy_then_remove(src: &Path, dst: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(src).map_err(io_error_with_help_io("stat", src))?;
    if fs::symlink_metadata(dst).is_ok() {
        return Err(io_error_with_help_io("copy", dst)(io::Error::from(
            io::ErrorKind::AlreadyExists,
        )));
    }

    let copied = if meta.is_dir() {
        copy_tree(src, dst)
    } else {
        copy_entry(src, dst, &meta)
    };
    if let Err(e) = copied {
        let _ = remove_tree(dst);
        return Err(e);
    }

    if meta.is_dir() {
        remove_tree(src)?;
    } else {
        fs::remove_file(src).map_err(io_error_with_help_io("remove source", src))?;
    }
    info!(src = %src.display(), dest = %dst.display(), "Copied across filesystems and removed source");
    Ok(())
}

fn copy_tree(src: &Path, dst: &Path) -> io::Result<()> {
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(io::Error::other)?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(io::Error::other)?;
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(io_error_with_help_io("create directory", &target))?;
        } else {
            let meta = entry.metadata().map_err(io::Error::other)?;
            copy_entry(entry.path(), &target, &meta)?;
        }
    }
    Ok(())
}

fn copy_entry(src: &Path, dst: &Path, meta: &fs::Metadata) -> io::Result<()> {
    if meta.file_type().is_symlink() {
        let link = fs::read_link(src).map_err(io_error_with_help_io("read link", src))?;
        #[cfg(unix)]
        {
            std::os::unix::fs::symlink(&link, dst).map_err(io_error_with_help_io("create link", dst))
        }
        #[cfg(not(unix))]
        {
            let _ = link;
            fs::copy(src, dst)
                .map(|_| ())
                .map_err(io_error_with_help_io("copy file to destination", dst))
        }
    } else {
        fs::copy(src, dst)
            .map(|_| ())
            .map_err(io_error_with_help_io("copy file to destination", dst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn copies_tree_and_removes_source() {
        let td = tempdir().unwrap();
        let src = td.path().join("src");
        fs::create_dir_all(src.join("sub")).unwrap();
        fs::write(src.join("one.txt"), b"one").unwrap();
        fs::write(src.join("sub").join("two.txt"), b"two").unwrap();
        let dst = td.path().join("dst");

        copy_then_remove(&src, &dst).unwrap();
        assert!(!src.exists());
        assert_eq!(fs::read_to_string(dst.join("one.txt")).unwrap(), "one");
        assert_eq!(fs::read_to_string(dst.join("sub").join("two.txt")).unwrap(), "two");
    }

    #[test]
    fn copies_single_file() {
        let td = tempdir().unwrap();
        let src = td.path().join("a.bin");
        fs::write(&src, b"abc").unwrap();
        let dst = td.path().join("b.bin");
        copy_then_remove(&src, &dst).unwrap();
        assert!(!src.exists());
        assert_eq!(fs::read(&dst).unwrap(), b"abc");
    }
}
