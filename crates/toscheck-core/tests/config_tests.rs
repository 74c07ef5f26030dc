use tempfile::TempDir;
use toscheck_core::config::{DEFAULT_LOG_LEVEL, ENV_NO_COMMONS, ENV_SEARCH_PATH, PROJECT_CONFIG_FILE};
use toscheck_core::{Config, ConfigError, OutputFormat};

#[test]
fn test_default_config_round_trips_through_toml() {
    let text = Config::default_config_string();
    let config = Config::from_toml(&text).unwrap();
    assert_eq!(config.checker.search_paths, vec!["."]);
    assert!(config.checker.use_commons);
    assert_eq!(config.logging.level, DEFAULT_LOG_LEVEL);
    assert_eq!(config.report.output_format().unwrap(), OutputFormat::Text);
}

// Environment overrides are process-wide, so file loading and overrides
// share one test.
#[test]
fn test_config_file_with_env_overrides() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join(PROJECT_CONFIG_FILE);
    std::fs::write(
        &file,
        "[checker]\nsearch_paths = [\"profiles\"]\n\n[logging]\nlevel = \"debug\"\n",
    )
    .unwrap();

    std::env::set_var(ENV_SEARCH_PATH, "/opt/tosca:/srv/tosca");
    std::env::set_var(ENV_NO_COMMONS, "1");
    let config = Config::from_file(&file).unwrap();
    std::env::remove_var(ENV_SEARCH_PATH);
    std::env::remove_var(ENV_NO_COMMONS);

    assert_eq!(config.checker.search_paths, vec!["profiles", "/opt/tosca", "/srv/tosca"]);
    assert!(!config.checker.use_commons);
    assert_eq!(config.logging.level, "debug");

    let missing = Config::from_file(dir.path().join("absent.toml"));
    assert!(matches!(missing, Err(ConfigError::ReadError(_))));
}

#[test]
fn test_invalid_report_format_rejected() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("bad.toml");
    std::fs::write(&file, "[report]\nformat = \"yaml\"\n").unwrap();
    assert!(matches!(Config::from_file(&file), Err(ConfigError::Invalid(_))));
}
