//! Core library for `unfolder`.
//!
//! Flattens folders into their parent directory: every direct child is moved
//! up one level in a single batch, and a folder is deleted only once it is
//! verified empty. Near-simultaneous invocations (one per selected folder in
//! a file manager) are merged by a single primary instance into one batch.
//!
//! Layout:
//! - `flatten`: path normalization, batch planning, execution, summaries
//! - `fs_ops`: filesystem collaborators (listing, batch move, delete)
//! - `coordinator`: singleton lock, relay channel and the debounce loop
//! - `config`, `cli`, `output`, `shutdown`, `platform`: ambient plumbing

pub mod cli;
pub mod config;
pub mod coordinator;
pub mod errors;
pub mod flatten;
pub mod fs_ops;
pub mod output;
pub mod platform;
pub mod shutdown;

pub use config::types::{Config, LogLevel};
pub use config::{default_config_path, default_log_path, load_config, path_has_symlink_ancestor};
pub use coordinator::{CoordinatorOptions, Finish, InstanceCoordinator, PrimaryReport, Role};
pub use errors::UnfolderError;
pub use flatten::{
    FlattenEngine, FolderOutcome, FolderRequest, FolderStatus, MovePlanEntry, Summary, aggregate,
};
pub use fs_ops::ConflictPolicy;
