//! XML configuration support.
//! - Loads settings from config.xml (quick_xml).
//! - Falls back to the legacy `config.ini` beside the executable.
//! - Writes a commented template on request.
//!
//! Notes:
//! - Unknown XML fields are a hard error to surface misconfigurations early.

use anyhow::{Context, Result, anyhow, bail};
use quick_xml::de::from_str as from_xml_str;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use super::ini::{legacy_ini_path, read_bool_option};
use super::paths::{default_config_path, path_has_symlink_ancestor};
use super::types::{Config, LogLevel};
use super::{
    CONFIG_ENV, DEFAULT_INSTANCE_NAME, DEFAULT_POLL_INTERVAL_MS, DEFAULT_QUIET_PERIOD_MS,
    DEFAULT_RELAY_TIMEOUT_MS, SUCCESS_POPUP_KEY,
};

use crate::fs_ops::ConflictPolicy;
use crate::platform::{set_dir_mode_0700, write_new_file_0600};

/// Struct mirroring the XML config for deserialization.
#[derive(Debug, Deserialize)]
#[serde(rename = "config")]
#[serde(deny_unknown_fields)]
struct XmlConfig {
    success_popup: Option<bool>,
    log_level: Option<String>,
    log_file: Option<String>,
    #[serde(default, deserialize_with = "de_u64_trimmed_opt")]
    quiet_period_ms: Option<u64>,
    #[serde(default, deserialize_with = "de_u64_trimmed_opt")]
    poll_interval_ms: Option<u64>,
    #[serde(default, deserialize_with = "de_u64_trimmed_opt")]
    relay_timeout_ms: Option<u64>,
    conflict_policy: Option<String>,
    allow_undo: Option<bool>,
    instance_name: Option<String>,
}

// Custom deserializer that trims surrounding whitespace for optional u64
fn de_u64_trimmed_opt<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| s.trim().parse::<u64>().ok()))
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

// Map XmlConfig -> Config
fn xml_to_config(parsed: XmlConfig) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(b) = parsed.success_popup {
        cfg.success_popup = b;
    }
    if let Some(s) = non_empty(parsed.log_level.as_deref())
        && let Ok(level) = s.parse::<LogLevel>()
    {
        cfg.log_level = level;
    }
    cfg.log_file = non_empty(parsed.log_file.as_deref()).map(PathBuf::from);

    cfg.quiet_period =
        Duration::from_millis(parsed.quiet_period_ms.unwrap_or(DEFAULT_QUIET_PERIOD_MS));
    cfg.poll_interval = Duration::from_millis(
        parsed
            .poll_interval_ms
            .unwrap_or(DEFAULT_POLL_INTERVAL_MS)
            .max(1),
    );
    cfg.relay_timeout =
        Duration::from_millis(parsed.relay_timeout_ms.unwrap_or(DEFAULT_RELAY_TIMEOUT_MS));

    if let Some(s) = non_empty(parsed.conflict_policy.as_deref()) {
        cfg.conflict_policy = s.parse::<ConflictPolicy>().map_err(|e| anyhow!(e))?;
    }
    if let Some(b) = parsed.allow_undo {
        cfg.allow_undo = b;
    }
    cfg.instance_name = non_empty(parsed.instance_name.as_deref())
        .unwrap_or(DEFAULT_INSTANCE_NAME)
        .to_string();

    Ok(cfg)
}

/// Load a Config from a specific XML file path.
pub fn load_config_from_xml_path(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read config xml '{}'", path.display()))?;
    let parsed: XmlConfig = from_xml_str(&contents)
        .with_context(|| format!("parse config xml '{}'", path.display()))?;
    xml_to_config(parsed).with_context(|| format!("invalid value in '{}'", path.display()))
}

/// Load the effective file configuration.
///
/// Search order:
///  - `UNFOLDER_CONFIG` (must exist when set)
///  - the platform default `config.xml`
///  - legacy `config.ini` beside the executable (only `SuccessPopup`)
///  - built-in defaults
pub fn load_config() -> Result<Config> {
    let env_set = env::var_os(CONFIG_ENV).is_some();
    if let Some(path) = default_config_path() {
        if path.exists() {
            return load_config_from_xml_path(&path);
        }
        if env_set {
            bail!("{CONFIG_ENV} points to a missing file: {}", path.display());
        }
    }

    let mut cfg = Config::default();
    if let Some(ini) = legacy_ini_path() {
        cfg.success_popup = read_bool_option(&ini, SUCCESS_POPUP_KEY);
    }
    Ok(cfg)
}

/// Create a commented template config file (0600, parent 0700).
/// Refuses to write through a symlinked ancestor or over an existing file.
pub fn create_template_config(path: &Path) -> Result<()> {
    if path_has_symlink_ancestor(path)? {
        bail!(
            "Refusing to create config: ancestor of {} is a symlink",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
        let _ = set_dir_mode_0700(parent);
    }

    let content = format!(
        "<!--\n  unfolder configuration (XML)\n\n    success_popup     -> print a success line when every folder was flattened (true/false)\n    log_level         -> quiet | normal | info | debug\n    log_file          -> path to log file (optional; console logging still used)\n    quiet_period_ms   -> wait this long after the last request before running the batch\n    poll_interval_ms  -> how often the waiting instance wakes up\n    relay_timeout_ms  -> how long later launches try to reach the waiting instance\n    conflict_policy   -> ask | skip | replace | keep-both\n    allow_undo        -> send deleted folders/replaced files to the trash (true/false)\n    instance_name     -> name of the lock/relay endpoint shared by launches\n\n  CLI flags override XML values.\n-->\n<config>\n  <success_popup>false</success_popup>\n  <log_level>normal</log_level>\n  <log_file></log_file>\n  <quiet_period_ms>{}</quiet_period_ms>\n  <poll_interval_ms>{}</poll_interval_ms>\n  <relay_timeout_ms>{}</relay_timeout_ms>\n  <conflict_policy>ask</conflict_policy>\n  <allow_undo>true</allow_undo>\n  <instance_name>{}</instance_name>\n</config>\n",
        DEFAULT_QUIET_PERIOD_MS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_RELAY_TIMEOUT_MS, DEFAULT_INSTANCE_NAME
    );

    write_new_file_0600(path, content.as_bytes())
        .with_context(|| format!("write template config '{}'", path.display()))?;
    info!("Created template config at {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn template_parses_back_to_defaults() {
        let td = tempdir().unwrap();
        let base = fs::canonicalize(td.path()).unwrap();
        let path = base.join("nested").join("config.xml");
        create_template_config(&path).unwrap();

        let cfg = load_config_from_xml_path(&path).unwrap();
        assert!(!cfg.success_popup);
        assert_eq!(cfg.log_level, LogLevel::Normal);
        assert_eq!(cfg.log_file, None);
        assert_eq!(cfg.quiet_period, Duration::from_millis(DEFAULT_QUIET_PERIOD_MS));
        assert_eq!(cfg.conflict_policy, ConflictPolicy::Ask);
        assert!(cfg.allow_undo);
        assert_eq!(cfg.instance_name, DEFAULT_INSTANCE_NAME);
    }

    #[test]
    fn template_refuses_existing_file() {
        let td = tempdir().unwrap();
        let base = fs::canonicalize(td.path()).unwrap();
        let path = base.join("config.xml");
        fs::write(&path, "<config/>").unwrap();
        assert!(create_template_config(&path).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "<config/>");
    }
}
