use pagesync::binding::ListOptions;
use pagesync::{Config, PagesyncError};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

#[test]
fn loads_partial_file_over_defaults() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "debounce_ms = 150").unwrap();
    writeln!(file, "items_per_page = 25").unwrap();
    writeln!(file, "trace_level = \"pagesync=debug\"").unwrap();

    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.debounce_ms, 150);
    assert_eq!(config.items_per_page, 25);
    assert_eq!(config.stale_time_ms, 30_000);
    assert_eq!(config.trace_level.as_deref(), Some("pagesync=debug"));
    assert_eq!(config.trace_file, None);

    let options = ListOptions::from_config(&config);
    assert_eq!(options.debounce, Duration::from_millis(150));
    assert_eq!(options.items_per_page, 25);
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = Config::from_file(dir.path().join("absent.toml"));
    assert!(matches!(result, Err(PagesyncError::Io(_))));
}

#[test]
fn invalid_file_is_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "items_per_page = 0").unwrap();
    assert!(matches!(
        Config::from_file(file.path()),
        Err(PagesyncError::Config(_))
    ));

    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "debounce_ms = [").unwrap();
    assert!(matches!(
        Config::from_file(file.path()),
        Err(PagesyncError::Parse(_))
    ));
}
