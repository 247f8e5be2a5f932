//! Tests for bootstrap configuration and graceful degradation
//!
//! Tests that manipulate PWZ_ROOT_FOLDER or PWZ_CONFIG are marked with
//! #[serial] so they never race on process environment.

use pwz_common::config::{
    database_path, default_root_folder, resolve_bind_addr, resolve_root_folder, StaleClientPolicy,
    StorageBackend, TomlConfig, CONFIG_FILE_ENV, DEFAULT_BIND_ADDR, ROOT_FOLDER_ENV,
};
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};

#[test]
fn test_defaults_when_toml_is_empty() {
    let config = TomlConfig::from_toml_str("").unwrap();

    assert!(config.root_folder.is_none());
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.engine.storage, StorageBackend::Sqlite);
    assert_eq!(config.engine.max_conflict_attempts, 3);
    assert_eq!(config.engine.stale_client_policy, StaleClientPolicy::Remerge);
    assert!(config.engine.allow_unknown_sections);
}

#[test]
fn test_partial_engine_table_keeps_other_defaults() {
    let config = TomlConfig::from_toml_str(
        r#"
        bind_addr = "0.0.0.0:8080"

        [engine]
        storage = "memory"
        stale_client_policy = "reject"
        max_conflict_attempts = 5
        "#,
    )
    .unwrap();

    assert_eq!(config.bind_addr.as_deref(), Some("0.0.0.0:8080"));
    assert_eq!(config.engine.storage, StorageBackend::Memory);
    assert_eq!(config.engine.stale_client_policy, StaleClientPolicy::Reject);
    assert_eq!(config.engine.max_conflict_attempts, 5);
    assert_eq!(config.engine.storage_timeout_ms, 5000);
    assert_eq!(config.engine.max_section_depth, 32);
}

#[test]
fn test_invalid_toml_is_config_error() {
    let err = TomlConfig::from_toml_str("[engine]\nstorage = \"postgres\"").unwrap_err();
    assert!(err.to_string().starts_with("Configuration error"));
}

#[test]
#[serial]
fn test_cli_root_folder_wins() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/from-env");
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/from-toml")),
        ..Default::default()
    };

    let resolved = resolve_root_folder(Some(Path::new("/tmp/from-cli")), &toml);
    assert_eq!(resolved, PathBuf::from("/tmp/from-cli"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_env_root_folder_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/from-env");
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/from-toml")),
        ..Default::default()
    };

    assert_eq!(resolve_root_folder(None, &toml), PathBuf::from("/tmp/from-env"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_toml_root_folder_then_default() {
    env::remove_var(ROOT_FOLDER_ENV);
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/from-toml")),
        ..Default::default()
    };
    assert_eq!(resolve_root_folder(None, &toml), PathBuf::from("/tmp/from-toml"));

    let resolved = resolve_root_folder(None, &TomlConfig::default());
    assert_eq!(resolved, default_root_folder());
}

#[test]
#[serial]
fn test_load_from_explicit_env_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pwz-drafts.toml");
    std::fs::write(&path, "database_file = \"custom.db\"\n").unwrap();

    env::set_var(CONFIG_FILE_ENV, &path);
    let config = TomlConfig::load(None).unwrap();
    env::remove_var(CONFIG_FILE_ENV);

    assert_eq!(config.database_file.as_deref(), Some("custom.db"));
    assert_eq!(
        database_path(Path::new("/data"), &config),
        PathBuf::from("/data/custom.db")
    );
}

#[test]
#[serial]
fn test_explicit_missing_file_is_error() {
    env::remove_var(CONFIG_FILE_ENV);
    let result = TomlConfig::load(Some(Path::new("/nonexistent/pwz-drafts.toml")));
    assert!(result.is_err());
}

#[test]
fn test_bind_addr_resolution() {
    let toml = TomlConfig {
        bind_addr: Some("0.0.0.0:9000".to_string()),
        ..Default::default()
    };
    assert_eq!(resolve_bind_addr(Some("127.0.0.1:1"), &toml), "127.0.0.1:1");
    assert_eq!(resolve_bind_addr(None, &toml), "0.0.0.0:9000");
    assert_eq!(resolve_bind_addr(None, &TomlConfig::default()), DEFAULT_BIND_ADDR);
}
