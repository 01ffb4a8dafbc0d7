//! Process-external singleton lock.
//!
//! An advisory exclusive lock (fs2) on `<runtime_dir>/<name>.lock`. The OS
//! drops the lock when the holder exits, crashed or not, so there is no stale
//! lock to clean up. The file itself is never unlinked: removing it while a
//! contender has it open would let two processes lock different inodes.

use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

use crate::errors::UnfolderError;
use crate::platform::set_dir_mode_0700;

/// Held for as long as this process is the primary instance.
#[derive(Debug)]
pub struct SingletonLock {
    file: File,
    path: PathBuf,
}

#[derive(Debug)]
pub enum LockState {
    Acquired(SingletonLock),
    AlreadyHeld,
}

pub fn lock_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.lock"))
}

impl SingletonLock {
    /// Try once, without blocking. Failure to create or open the lock file is
    /// an IPC setup error; contention is `AlreadyHeld`.
    pub fn try_acquire(dir: &Path, name: &str) -> Result<LockState, UnfolderError> {
        fs::create_dir_all(dir).map_err(UnfolderError::ipc(format!(
            "create runtime directory {}",
            dir.display()
        )))?;
        let _ = set_dir_mode_0700(dir);

        let path = lock_path(dir, name);
        let mut opts = OpenOptions::new();
        opts.read(true).write(true).create(true).truncate(false);
        #[cfg(unix)]
        opts.mode(0o600).custom_flags(libc::O_CLOEXEC | libc::O_NOFOLLOW);
        let mut file = opts
            .open(&path)
            .map_err(UnfolderError::ipc(format!("open lock file {}", path.display())))?;

        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => {}
            Err(e) if is_contended(&e) => {
                trace!(path = %path.display(), "singleton lock already held");
                return Ok(LockState::AlreadyHeld);
            }
            Err(e) => {
                return Err(UnfolderError::IpcSetup {
                    context: format!("lock {}", path.display()),
                    source: e,
                });
            }
        }

        // Owner pid is diagnostic only; a failed write does not give up the lock.
        let _ = file
            .set_len(0)
            .and_then(|_| writeln!(file, "{}", std::process::id()))
            .and_then(|_| file.flush());
        debug!(path = %path.display(), "singleton lock acquired");
        Ok(LockState::Acquired(SingletonLock { file, path }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SingletonLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        debug!(path = %self.path.display(), "singleton lock released");
    }
}

/// Pid recorded by the current holder, when readable.
pub fn holder_pid(dir: &Path, name: &str) -> Option<u32> {
    let mut f = File::open(lock_path(dir, name)).ok()?;
    let mut s = String::new();
    f.seek(SeekFrom::Start(0)).ok()?;
    f.read_to_string(&mut s).ok()?;
    s.trim().parse().ok()
}

fn is_contended(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::WouldBlock
        || e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
