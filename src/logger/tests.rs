use std::io::Write;
use std::path::PathBuf;

use tempfile::tempdir;

use super::*;

#[test]
fn test_default_config_is_valid() {
    assert!(LoggerConfig::default().validate().is_ok());
}

#[test]
fn test_invalid_level_rejected() {
    let config = LoggerConfig {
        level: "loud".to_string(),
        ..Default::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_level_parse_case_insensitive() {
    let config = LoggerConfig {
        level: "WARN".to_string(),
        ..Default::default()
    };
    assert_eq!(config.parse_level().unwrap(), tracing::Level::WARN);
}

#[test]
fn test_no_output_rejected() {
    let result = LoggerConfig::new(
        ConsoleConfig::new(false, false),
        FileConfig::default(),
        "info".to_string(),
    );
    assert!(result.is_err());
}

#[test]
fn test_enabled_file_needs_path() {
    let result = FileConfig::new(true, PathBuf::new(), true, LogFormat::Json);
    assert!(result.is_err());
}

#[test]
fn test_log_format_from_str() {
    assert_eq!("full".parse::<LogFormat>().unwrap(), LogFormat::Full);
    assert_eq!("Compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
    assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
    assert!("xml".parse::<LogFormat>().is_err());
}

#[test]
fn test_open_log_file_creates_parent_and_appends() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("cache.log");
    let config = FileConfig::new(true, path.clone(), true, LogFormat::Full).unwrap();

    writeln!(open_log_file(&config).unwrap(), "first").unwrap();
    writeln!(open_log_file(&config).unwrap(), "second").unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
}

#[test]
fn test_open_log_file_truncates_without_append() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cache.log");
    std::fs::write(&path, "stale\n").unwrap();
    let config = FileConfig::new(true, path.clone(), false, LogFormat::Compact).unwrap();

    writeln!(open_log_file(&config).unwrap(), "fresh").unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "fresh\n");
}

#[test]
fn test_init_logger_twice_fails() {
    let dir = tempdir().unwrap();
    let mut config = LoggerConfig {
        level: "error".to_string(),
        ..Default::default()
    };
    config.console.enabled = false;
    config.file = FileConfig::new(true, dir.path().join("cache.log"), true, LogFormat::Json).unwrap();

    init_logger(config.clone()).unwrap();
    assert!(init_logger(config).is_err());
}
