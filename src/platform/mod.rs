//! Platform-specific helpers.
//! This module hides OS differences (Unix/Windows) behind a uniform API so
//! the rest of the codebase can remain platform-agnostic.

#[cfg(unix)]
mod unix;
#[cfg(not(unix))]
mod windows;

#[cfg(unix)]
pub use unix::{
    FOREIGN_SEPARATOR, MAX_PATH_LEN, is_cross_device, open_log_file_secure_append,
    set_dir_mode_0700, write_new_file_0600,
};

#[cfg(not(unix))]
pub use windows::{
    FOREIGN_SEPARATOR, MAX_PATH_LEN, is_cross_device, open_log_file_secure_append,
    set_dir_mode_0700, write_new_file_0600,
};
