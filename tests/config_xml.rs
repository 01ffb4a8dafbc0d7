use serial_test::serial;
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

use unfolder::config::{CONFIG_ENV, load_config, load_config_from_xml_path, read_bool_option};
use unfolder::{ConflictPolicy, LogLevel};

#[test]
fn trims_whitespace_in_xml_values() {
    let td = tempdir().unwrap();
    let cfg_path = td.path().join("config.xml");
    let log_file = td.path().join("unfolder.log");
    let xml = format!(
        r#"<config>
  <log_level>  info  </log_level>
  <log_file>  {}  </log_file>
  <quiet_period_ms>
    250
  </quiet_period_ms>
  <conflict_policy> keep-both </conflict_policy>
  <instance_name>  shell  </instance_name>
</config>"#,
        log_file.display()
    );
    fs::write(&cfg_path, xml).unwrap();

    let cfg = load_config_from_xml_path(&cfg_path).unwrap();
    assert_eq!(cfg.log_level, LogLevel::Info);
    assert_eq!(cfg.log_file.as_deref(), Some(log_file.as_path()));
    assert_eq!(cfg.quiet_period, Duration::from_millis(250));
    assert_eq!(cfg.conflict_policy, ConflictPolicy::KeepBoth);
    assert_eq!(cfg.instance_name, "shell");
}

#[test]
fn unknown_field_is_an_error() {
    let td = tempdir().unwrap();
    let cfg_path = td.path().join("config.xml");
    fs::write(&cfg_path, "<config><download_base>/x</download_base></config>").unwrap();
    let err = load_config_from_xml_path(&cfg_path).unwrap_err();
    assert!(format!("{err}").contains("parse config xml"));
}

#[test]
fn invalid_conflict_policy_is_an_error() {
    let td = tempdir().unwrap();
    let cfg_path = td.path().join("config.xml");
    fs::write(&cfg_path, "<config><conflict_policy>maybe</conflict_policy></config>").unwrap();
    assert!(load_config_from_xml_path(&cfg_path).is_err());
}

#[test]
fn empty_config_keeps_defaults() {
    let td = tempdir().unwrap();
    let cfg_path = td.path().join("config.xml");
    fs::write(&cfg_path, "<config>\n</config>").unwrap();
    let cfg = load_config_from_xml_path(&cfg_path).unwrap();
    assert!(cfg.allow_undo);
    assert!(!cfg.success_popup);
    assert_eq!(cfg.poll_interval, Duration::from_millis(100));
}

#[test]
#[serial]
fn env_override_is_used() {
    let td = tempdir().unwrap();
    let cfg_path = td.path().join("custom.xml");
    fs::write(&cfg_path, "<config><success_popup>true</success_popup></config>").unwrap();

    unsafe {
        std::env::set_var(CONFIG_ENV, &cfg_path);
    }
    let loaded = load_config();
    unsafe {
        std::env::remove_var(CONFIG_ENV);
    }
    assert!(loaded.unwrap().success_popup);
}

#[test]
fn legacy_ini_values() {
    let td = tempdir().unwrap();
    let ini = td.path().join("config.ini");
    fs::write(&ini, "[General]\nSuccessPopup=1\nOther=0\n").unwrap();
    assert!(read_bool_option(&ini, "SuccessPopup"));
    assert!(!read_bool_option(&ini, "Other"));
    assert!(!read_bool_option(&ini, "Missing"));
    assert!(!read_bool_option(&td.path().join("nope.ini"), "SuccessPopup"));
}
