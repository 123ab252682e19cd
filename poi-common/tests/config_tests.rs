//! Tests for configuration loading and priority order
//!
//! Tests that touch POI_* environment variables are marked #[serial] so they
//! never race each other.

use poi_common::config::{
    resolve_database_path, resolve_root_folder, TomlConfig, DEFAULT_DATABASE_FILE, ENV_CONFIG,
    ENV_DATABASE, ENV_ROOT_FOLDER,
};
use poi_common::Error;
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn clear_env() {
    env::remove_var(ENV_CONFIG);
    env::remove_var(ENV_ROOT_FOLDER);
    env::remove_var(ENV_DATABASE);
}

#[test]
#[serial]
fn test_env_overrides_toml_root_folder() {
    clear_env();
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..Default::default()
    };

    env::set_var(ENV_ROOT_FOLDER, "/from/env");
    let root = resolve_root_folder(None, &config);
    assert_eq!(root, PathBuf::from("/from/env"));

    clear_env();
    let root = resolve_root_folder(None, &config);
    assert_eq!(root, PathBuf::from("/from/toml"));
}

#[test]
#[serial]
fn test_database_defaults_to_root_folder() {
    clear_env();
    let config = TomlConfig::default();

    let db = resolve_database_path(None, Path::new("/data/poi"), &config);
    assert_eq!(db, Path::new("/data/poi").join(DEFAULT_DATABASE_FILE));
}

#[test]
#[serial]
fn test_database_env_then_toml() {
    clear_env();
    let config = TomlConfig {
        database_path: Some(PathBuf::from("/toml/pois.db")),
        ..Default::default()
    };

    env::set_var(ENV_DATABASE, "/env/pois.db");
    assert_eq!(
        resolve_database_path(None, Path::new("/root"), &config),
        PathBuf::from("/env/pois.db")
    );

    clear_env();
    assert_eq!(
        resolve_database_path(None, Path::new("/root"), &config),
        PathBuf::from("/toml/pois.db")
    );
}

#[test]
#[serial]
fn test_load_explicit_file() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "database_path = \"/x/y.db\"\n[logging]\nlevel = \"warn\"\n").unwrap();

    let config = TomlConfig::load(Some(&path)).unwrap();
    assert_eq!(config.database_path, Some(PathBuf::from("/x/y.db")));
    assert_eq!(config.logging.level, "warn");
    assert!(config.import.show_progress);
}

#[test]
#[serial]
fn test_load_from_env_var() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("env.toml");
    std::fs::write(&path, "[import]\nshow_progress = false\n").unwrap();

    env::set_var(ENV_CONFIG, &path);
    let config = TomlConfig::load(None).unwrap();
    clear_env();

    assert!(!config.import.show_progress);
}

#[test]
#[serial]
fn test_missing_explicit_file_is_error() {
    clear_env();
    let result = TomlConfig::load(Some(Path::new("/definitely/not/here/config.toml")));
    assert!(matches!(result, Err(Error::Config(_))));
}
