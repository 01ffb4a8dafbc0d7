//! Config module.
//! Provides configuration types, default paths, XML loading and the legacy
//! `config.ini` reader.

pub mod ini;
pub mod paths;
pub mod types;
pub mod xml;

pub use ini::{legacy_ini_path, read_bool_option};
pub use paths::{default_config_path, default_log_path, path_has_symlink_ancestor, runtime_dir};
pub use types::{Config, LogLevel};
pub use xml::{create_template_config, load_config, load_config_from_xml_path};

/// Environment variable naming an explicit XML config file.
pub const CONFIG_ENV: &str = "UNFOLDER_CONFIG";
/// Environment variable overriding where lock and relay files live.
pub const RUNTIME_DIR_ENV: &str = "UNFOLDER_RUNTIME_DIR";

pub const DEFAULT_INSTANCE_NAME: &str = "unfolder";
pub const DEFAULT_QUIET_PERIOD_MS: u64 = 1000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
pub const DEFAULT_RELAY_TIMEOUT_MS: u64 = 2000;

/// Key read from the legacy `config.ini` next to the executable.
pub const SUCCESS_POPUP_KEY: &str = "SuccessPopup";
