//! Configuration loading and root folder resolution
//!
//! Tests that touch CPC_ROOT_FOLDER are marked #[serial] so they never race
//! on the process environment.

use cpc_common::config::{
    get_default_root_folder, RootFolderInitializer, RootFolderResolver, TomlConfig, ROOT_FOLDER_ENV,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
#[serial]
fn test_resolver_with_no_overrides_uses_default() {
    env::remove_var(ROOT_FOLDER_ENV);

    let resolver = RootFolderResolver::new(None, &TomlConfig::default());
    assert_eq!(resolver.resolve(), get_default_root_folder());
}

#[test]
#[serial]
fn test_resolver_env_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/cpc-test-env-folder");

    let config = TomlConfig::from_toml_str(r#"root_folder = "/tmp/cpc-test-toml-folder""#).unwrap();
    let resolver = RootFolderResolver::new(None, &config);
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/cpc-test-env-folder"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_resolver_cli_beats_env() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/cpc-test-env-folder");

    let resolver = RootFolderResolver::new(
        Some(PathBuf::from("/tmp/cpc-test-cli-folder")),
        &TomlConfig::default(),
    );
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/cpc-test-cli-folder"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_resolver_blank_env_is_ignored() {
    env::set_var(ROOT_FOLDER_ENV, "   ");

    let config = TomlConfig::from_toml_str(r#"root_folder = "/tmp/cpc-test-toml-folder""#).unwrap();
    let resolver = RootFolderResolver::new(None, &config);
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/cpc-test-toml-folder"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
fn test_load_missing_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let config = TomlConfig::load(Some(&dir.path().join("absent.toml")));
    assert_eq!(config.port, 5780);
    assert!(config.root_folder.is_none());
}

#[test]
fn test_load_malformed_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "port = \"not a number").unwrap();

    let config = TomlConfig::load(Some(&path));
    assert_eq!(config.port, 5780);
}

#[test]
fn test_load_full_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
        root_folder = "/srv/cpc"
        port = 8080
        bind_address = "0.0.0.0"

        [logging]
        level = "debug"

        [import]
        max_rows = 50
        max_file_bytes = 1024

        [bootstrap_admin]
        email = "root@example.edu"
        password = "changeme123"
        username = "root"
        first_name = "Root"
        last_name = "Admin"
        department = "Information Technology"
        "#,
    )
    .unwrap();

    let config = TomlConfig::load(Some(&path));
    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/cpc")));
    assert_eq!(config.port, 8080);
    assert_eq!(config.bind_address, "0.0.0.0");
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.import.max_rows, 50);
    assert_eq!(config.import.max_file_bytes, 1024);
    assert!(config.import.precheck_emails);

    let admin = config.bootstrap_admin.unwrap();
    assert_eq!(admin.username, "root");
    assert!(admin.phone.is_none());
}

#[test]
fn test_initializer_creates_directory() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("a").join("b");

    let init = RootFolderInitializer::new(root.clone());
    assert!(!init.database_exists());
    init.ensure_directory_exists().unwrap();
    init.ensure_directory_exists().unwrap();

    assert!(root.is_dir());
    assert_eq!(init.database_path(), root.join("cpc.db"));
}
