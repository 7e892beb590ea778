/*!
 * Tests for configuration loading and validation
 */

use std::collections::HashMap;
use std::path::PathBuf;
use vault_translator::app_config::{Config, ENV_API_KEY, ENV_MODEL, ENV_VAULT_NAME, ENV_VAULT_PATH, LogLevel};

use crate::common::TestVault;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_load_missing_file_should_give_defaults() {
    let vault = TestVault::new().unwrap();
    let config = Config::load(vault.path("absent.json")).unwrap();
    assert_eq!(config.backup_retention_days, 30);
    assert_eq!(config.provider.model, "claude-3-5-sonnet-20241022");
    assert_eq!(config.provider.endpoint, "https://api.anthropic.com");
}

#[test]
fn test_load_should_read_json_and_env_should_win() {
    let vault = TestVault::new().unwrap();
    let path = vault
        .write(
            "conf.json",
            r#"{
                "vault_path": "/data/Notes",
                "backup_retention_days": 10,
                "log_level": "debug",
                "provider": { "api_key": "from-file", "model": "file-model" }
            }"#,
        )
        .unwrap();

    let config = Config::load(&path)
        .unwrap()
        .apply_overrides(env(&[(ENV_API_KEY, "from-env"), (ENV_VAULT_NAME, "Work")]))
        .unwrap();

    assert_eq!(config.vault_path, PathBuf::from("/data/Notes"));
    assert_eq!(config.provider.api_key, "from-env");
    assert_eq!(config.provider.model, "file-model");
    assert_eq!(config.backup_retention_days, 10);
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.collection_name(), "Work");
}

#[test]
fn test_invalid_json_should_fail() {
    let vault = TestVault::new().unwrap();
    let path = vault.write("conf.json", "{ not json").unwrap();
    assert!(Config::load(&path).is_err());
}

#[test]
fn test_validate_should_accept_complete_config() {
    let vault = TestVault::new().unwrap();
    let config = Config::default()
        .apply_overrides(env(&[
            (ENV_VAULT_PATH, vault.root().to_str().unwrap()),
            (ENV_API_KEY, "key"),
            (ENV_MODEL, "other-model"),
        ]))
        .unwrap();

    assert!(config.validate().is_ok());
    assert_eq!(config.provider.model, "other-model");
    assert!(!config.collection_name().is_empty());
}

#[test]
fn test_validate_should_reject_missing_vault_and_zero_window() {
    assert!(Config::default().validate().is_err());

    let vault = TestVault::new().unwrap();
    let mut config = Config {
        vault_path: vault.root().to_path_buf(),
        batch_concurrency: 0,
        ..Config::default()
    };
    config.provider.api_key = "key".to_string();
    assert!(config.validate().is_err());
}
