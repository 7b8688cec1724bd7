//! Configuration loaded from disk plus environment

use mab_core::RunType;
use mab_engine::{ConfigError, EngineConfig};
use std::io::Write;
use std::path::PathBuf;

fn env(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
    move |key| {
        pairs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| (*v).to_string())
    }
}

#[test]
fn file_then_environment() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[portal]
base_url = "https://portal.example.co.uk"
max_steps = 20

[browser]
headless = false
keystroke_delay_ms = 10

[batch]
run_type = "credit"
accept_partials = true
limit = 4

[store]
dir = "/var/lib/mab/runs"
"#
    )
    .unwrap();

    let config = EngineConfig::load_with(
        Some(file.path()),
        env(&[
            ("PORTAL_USERNAME", "broker@example.co.uk"),
            ("PORTAL_PASSWORD", "s3cret"),
            ("HEADLESS", "true"),
        ]),
    )
    .unwrap();

    assert_eq!(config.portal.max_steps, 20);
    assert_eq!(config.batch.run_type, RunType::Credit);
    assert_eq!(config.batch.limit, Some(4));
    assert!(config.success_policy().accept_partials);
    assert_eq!(config.store.dir, PathBuf::from("/var/lib/mab/runs"));
    // environment beats the file
    assert!(config.headless());
    assert_eq!(config.writer_config().keystroke_delay.as_millis(), 10);
    config.validate_for_run().unwrap();
}

#[test]
fn missing_file_is_a_read_error() {
    let err = EngineConfig::load_with(Some(std::path::Path::new("/nonexistent/mab.toml")), env(&[]))
        .unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn malformed_file_is_a_parse_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[batch]\nrun_type = 3").unwrap();
    let err = EngineConfig::load_with(Some(file.path()), env(&[])).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}
