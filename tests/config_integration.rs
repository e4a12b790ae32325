//! Integration tests for config loading and validation
//!
//! These tests go through real TOML files on disk rather than constructing
//! Config structs directly.

use std::fs;
use tempfile::TempDir;

/// Helper to create a temporary config path
fn setup_temp_config() -> (TempDir, std::path::PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_dir = temp_dir.path().join("dasw");
    fs::create_dir_all(&config_dir).expect("Failed to create config dir");
    let config_path = config_dir.join("config.toml");
    (temp_dir, config_path)
}

#[test]
fn test_config_load_full_toml() {
    let (_temp, config_path) = setup_temp_config();

    let toml_content = r#"
[settings]
proxy_device = "Proxy Audio Device"
max_displays = 32
settle_ms = 500
apply_on_startup = false
notify_switch = false
notify_errors = true
notify_daemon = true
log_level = "debug"
"#;
    fs::write(&config_path, toml_content).expect("Failed to write TOML");

    let loaded = dasw::config::Config::load_from_path(&config_path).expect("Failed to load config");

    assert_eq!(loaded.settings.proxy_device, "Proxy Audio Device");
    assert_eq!(loaded.settings.max_displays, 32);
    assert_eq!(loaded.settings.settle_ms, 500);
    assert!(!loaded.settings.apply_on_startup);
    assert!(!loaded.settings.notify_switch);
    assert!(loaded.settings.notify_errors);
    assert!(loaded.settings.notify_daemon);
    assert_eq!(loaded.settings.log_level, "debug");
}

#[test]
fn test_config_missing_settings_table_uses_defaults() {
    let (_temp, config_path) = setup_temp_config();
    fs::write(&config_path, "# nothing configured\n").expect("Failed to write TOML");

    let loaded = dasw::config::Config::load_from_path(&config_path).expect("Failed to load config");
    assert_eq!(loaded, dasw::config::Config::default());
}

#[test]
fn test_config_error_names_the_file() {
    let (_temp, config_path) = setup_temp_config();
    fs::write(&config_path, "[settings]\nmax_displays = 0\n").expect("Failed to write TOML");

    let err = dasw::config::Config::load_from_path(&config_path).unwrap_err();
    let err_msg = format!("{err:#}");
    assert!(err_msg.contains("config.toml"), "Error should name the file: {err_msg}");
    assert!(err_msg.contains("max_displays"), "Error should name the field: {err_msg}");
}

#[test]
fn test_config_malformed_toml() {
    let (_temp, config_path) = setup_temp_config();
    fs::write(&config_path, "[settings\nproxy_device = ").expect("Failed to write TOML");

    assert!(dasw::config::Config::load_from_path(&config_path).is_err());
}

#[test]
fn test_config_missing_file_is_read_error() {
    let (temp, _config_path) = setup_temp_config();
    let missing = temp.path().join("nope.toml");

    let err = dasw::config::Config::load_from_path(&missing).unwrap_err();
    assert!(format!("{err:#}").contains("Failed to read config"));
}
