//! Unit tests for config module
//!
//! Tests settings defaults, parsing and default-file creation.

use std::time::Duration;

use crate::MediaDetectError;
use crate::config::{Config, ConfigPaths, LogLevel};
use crate::detector::WorkingMode;

#[test]
fn defaults_match_documented_values() {
    let config = Config::default();

    assert_eq!(config.general.log_level, LogLevel::Info);
    assert_eq!(config.detector.poll_interval_ms, 1000);
    assert_eq!(config.detector.working_mode, WorkingMode::Auto);
    assert_eq!(config.detector.mount_attempts, 3);
    assert_eq!(config.detector.mount_backoff_ms, 1000);
    assert_eq!(config.dispatch.key_delay_ms, 500);
    assert!(config.detector.rules_file.is_none());
}

#[test]
fn empty_toml_is_all_defaults() {
    let config = Config::from_toml_str("").unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn partial_sections_keep_other_defaults() {
    let config = Config::from_toml_str(
        r#"
        [general]
        log_level = "debug"

        [detector]
        working_mode = "manual"
        mount_attempts = 5
        "#,
    )
    .unwrap();

    assert_eq!(config.general.log_level, LogLevel::Debug);
    assert_eq!(config.detector.working_mode, WorkingMode::ManualStart);
    assert_eq!(config.detector.mount_attempts, 5);
    assert_eq!(config.detector.poll_interval_ms, 1000);
    assert_eq!(config.dispatch.key_delay_ms, 500);
}

#[test]
fn detector_settings_are_derived() {
    let config = Config::from_toml_str(
        r#"
        [detector]
        poll_interval_ms = 250
        mount_attempts = 0
        mount_backoff_ms = 20
        fstab = "/tmp/fstab"
        "#,
    )
    .unwrap();

    let settings = config.detector.settings();

    assert_eq!(settings.poll_interval, Duration::from_millis(250));
    assert_eq!(settings.mount_retry.attempts, 1);
    assert_eq!(settings.mount_retry.backoff, Duration::from_millis(20));
    assert_eq!(settings.fstab, std::path::PathBuf::from("/tmp/fstab"));
}

#[test]
fn explicit_rules_file_wins() {
    let config = Config::from_toml_str(
        r#"
        [detector]
        rules_file = "/etc/mediadetect.conf"
        "#,
    )
    .unwrap();

    assert_eq!(
        config.detector.rules_path().unwrap(),
        std::path::PathBuf::from("/etc/mediadetect.conf")
    );
}

#[test]
fn unknown_working_mode_is_rejected() {
    let result = Config::from_toml_str(
        r#"
        [detector]
        working_mode = "sometimes"
        "#,
    );

    assert!(matches!(
        result,
        Err(MediaDetectError::SettingsParse { .. })
    ));
}

#[test]
fn invalid_toml_is_rejected() {
    let result = Config::from_toml_str("[general\nlog_level = ");
    assert!(result.is_err());
}

#[test]
fn missing_file_is_created_with_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let config = Config::load(&path).unwrap();

    assert!(path.exists());
    assert_eq!(config, Config::default());

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("[detector]"));
    assert!(written.contains("key_delay_ms = 500"));
}

#[test]
fn existing_file_is_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[dispatch]\nkey_delay_ms = 100\n").unwrap();

    let config = Config::load(&path).unwrap();

    assert_eq!(config.dispatch.key_delay(), Duration::from_millis(100));
}

#[test]
fn default_files_live_in_the_config_dir() {
    if std::env::var("HOME").is_err() && std::env::var("XDG_CONFIG_HOME").is_err() {
        return;
    }

    let dir = ConfigPaths::config_dir().unwrap();
    let main = ConfigPaths::main_config().unwrap();
    let rules = ConfigPaths::rules_file().unwrap();

    assert!(dir.ends_with("mediadetect"));
    assert_eq!(main.parent(), Some(dir.as_path()));
    assert_eq!(rules.parent(), Some(dir.as_path()));
    assert!(rules.to_string_lossy().ends_with("mediadetect.conf"));
}
