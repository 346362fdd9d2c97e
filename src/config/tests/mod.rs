//! Unit tests for config module
//!
//! Tests configuration types, defaults, and parsing.

#![allow(clippy::unwrap_used)]

use std::fs;

use tempfile::TempDir;

use crate::{
    ObserveError,
    config::{Config, LogFormat, LogLevel, RegistryConfig},
};

#[test]
fn config_default() {
    let config = Config::default();

    assert_eq!(config.general.log_level, LogLevel::Info);
    assert_eq!(config.general.log_format, LogFormat::Pretty);
    assert_eq!(config.registry, RegistryConfig::default());
    assert!(config.registry.report_callback_failures);
}

#[test]
fn config_serialize_toml() {
    let config = Config::default();

    let toml_str = toml::to_string(&config).unwrap();
    assert!(toml_str.contains("[general]"));
    assert!(toml_str.contains("[registry]"));
    assert!(toml_str.contains("failure_channel_capacity = 64"));
}

#[test]
fn config_deserialize_toml() {
    let config = Config::from_toml_str(
        r#"
        [general]
        log_level = "debug"
        log_format = "json"

        [registry]
        failure_channel_capacity = 8
        report_callback_failures = false
    "#,
    )
    .unwrap();

    assert_eq!(config.general.log_level, LogLevel::Debug);
    assert_eq!(config.general.log_format, LogFormat::Json);
    assert_eq!(config.registry.failure_channel_capacity, 8);
    assert!(!config.registry.report_callback_failures);
}

#[test]
fn config_minimal_toml() {
    let config = Config::from_toml_str("[registry]\n").unwrap();

    assert_eq!(config, Config::default());
}

#[test]
fn config_rejects_zero_capacity() {
    let error = Config::from_toml_str("[registry]\nfailure_channel_capacity = 0\n").unwrap_err();

    assert!(matches!(error, ObserveError::Config { .. }));
}

#[test]
fn config_rejects_unknown_log_level() {
    let error = Config::from_toml_str("[general]\nlog_level = \"loud\"\n").unwrap_err();

    assert!(matches!(error, ObserveError::TomlParse { ref location, .. } if location == "string"));
}

#[test]
fn config_loads_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("observe.toml");
    fs::write(&path, "[general]\nlog_level = \"trace\"\n").unwrap();

    let config = Config::load(&path).unwrap();

    assert_eq!(config.general.log_level, LogLevel::Trace);
}

#[test]
fn config_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");

    let error = Config::load(&path).unwrap_err();

    assert!(matches!(error, ObserveError::Io { .. }));
}

#[test]
fn log_level_display() {
    assert_eq!(LogLevel::Warn.to_string(), "warn");
    assert_eq!(LogFormat::Json.to_string(), "json");
}
