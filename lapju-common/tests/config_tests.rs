//! Tests for root folder resolution

use lapju_common::config::{database_path, resolve_root_folder, ROOT_ENV_VAR};
use serial_test::serial;
use std::path::PathBuf;

#[test]
#[serial]
fn test_cli_argument_wins() {
    std::env::set_var(ROOT_ENV_VAR, "/tmp/lapju-env");
    let root = resolve_root_folder(Some("/tmp/lapju-cli"));
    std::env::remove_var(ROOT_ENV_VAR);

    assert_eq!(root, PathBuf::from("/tmp/lapju-cli"));
}

#[test]
#[serial]
fn test_env_var_when_no_cli_argument() {
    std::env::set_var(ROOT_ENV_VAR, "/tmp/lapju-env");
    let root = resolve_root_folder(None);
    std::env::remove_var(ROOT_ENV_VAR);

    assert_eq!(root, PathBuf::from("/tmp/lapju-env"));
}

#[test]
#[serial]
fn test_empty_env_var_is_ignored() {
    std::env::set_var(ROOT_ENV_VAR, "");
    let root = resolve_root_folder(None);
    std::env::remove_var(ROOT_ENV_VAR);

    assert_ne!(root, PathBuf::from(""));
}

#[test]
#[serial]
fn test_fallback_produces_a_path() {
    std::env::remove_var(ROOT_ENV_VAR);
    let root = resolve_root_folder(None);
    assert!(!root.as_os_str().is_empty());
}

#[test]
fn test_database_path_is_inside_root() {
    let db = database_path(&PathBuf::from("/data/lapju"));
    assert_eq!(db, PathBuf::from("/data/lapju/lapju.db"));
}
