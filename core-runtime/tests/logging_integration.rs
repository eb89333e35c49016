//! Integration tests for logging system

use bridge_traits::time::LogLevel;
use core_runtime::logging::{init_logging, redact_if_sensitive, LogFormat, LoggingConfig};

#[test]
fn test_config_chaining() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Warn)
        .with_redaction(true)
        .with_spans(false)
        .with_target(false);

    assert_eq!(config.format, LogFormat::Compact);
    assert_eq!(config.level, LogLevel::Warn);
    assert!(config.redact_sensitive);
    assert!(!config.enable_spans);
    assert!(!config.display_target);
    assert!(config.logger_sink.is_none());
}

#[test]
fn test_credentials_are_redacted() {
    assert_eq!(redact_if_sensitive("lgpassword", "bot@secret"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("logintoken", "abc+\\"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("Cookie", "session=1"), "[REDACTED]");
}

#[test]
fn test_ordinary_fields_pass_through() {
    assert_eq!(redact_if_sensitive("title", "电解水箱"), "电解水箱");
    assert_eq!(redact_if_sensitive("kind", "module"), "module");
    assert_eq!(redact_if_sensitive("run_id", "42"), "42");
}

#[test]
fn test_format_selection() {
    #[cfg(debug_assertions)]
    assert_eq!(LoggingConfig::default().format, LogFormat::Pretty);

    #[cfg(not(debug_assertions))]
    assert_eq!(LoggingConfig::default().format, LogFormat::Json);
}

#[test]
fn test_second_initialization_fails() {
    let config = || LoggingConfig::default().with_format(LogFormat::Compact);

    // Only one global subscriber per process.
    let first = init_logging(config());
    assert!(first.is_ok());
    assert!(init_logging(config()).is_err());
}
