//! Tests for loading account configuration.

use marble_thread::AccountConfig;
use std::fs;
use tempfile::TempDir;

fn write_config(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("account.toml");
    fs::write(&path, content).expect("Failed to write TOML");
    path
}

const VALID: &str = r#"consumer_key = "ck"
consumer_secret = "cs-secret"
access_token = "at"
access_token_secret = "ats-secret"
account = "@marbles"
"#;

#[test]
fn test_from_file_loads_all_fields() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_config(&dir, VALID);

    let config = AccountConfig::from_file(&path).expect("Load failed");

    assert_eq!(config.consumer_key(), "ck");
    assert_eq!(config.consumer_secret(), "cs-secret");
    assert_eq!(config.access_token(), "at");
    assert_eq!(config.access_token_secret(), "ats-secret");
}

#[test]
fn test_account_handle_drops_leading_at() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_config(&dir, VALID);

    let config = AccountConfig::from_file(&path).expect("Load failed");

    assert_eq!(config.account(), "marbles");
}

#[test]
fn test_credentials_carry_all_four_values() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = AccountConfig::from_file(write_config(&dir, VALID)).expect("Load failed");

    let credentials = config.credentials();

    assert_eq!(credentials.consumer_key(), "ck");
    assert_eq!(credentials.consumer_secret(), "cs-secret");
    assert_eq!(credentials.access_token(), "at");
    assert_eq!(credentials.access_token_secret(), "ats-secret");
}

#[test]
fn test_missing_field_fails() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_config(&dir, "consumer_key = \"ck\"\naccount = \"marbles\"\n");

    let err = AccountConfig::from_file(&path).unwrap_err();

    assert!(err.message.contains("Failed to parse config"), "{}", err);
}

#[test]
fn test_empty_secret_fails() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_config(&dir, &VALID.replace("cs-secret", ""));

    let err = AccountConfig::from_file(&path).unwrap_err();

    assert_eq!(err.message, "consumer_secret must not be empty");
}

#[test]
fn test_bare_at_sign_is_not_an_account() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_config(&dir, &VALID.replace("@marbles", "@"));

    let err = AccountConfig::from_file(&path).unwrap_err();

    assert_eq!(err.message, "account must not be empty");
}

#[test]
fn test_nonexistent_file_fails() {
    let err = AccountConfig::from_file("/this/path/does/not/exist/account.toml").unwrap_err();

    assert!(err.message.contains("Failed to read config file"));
}

#[test]
fn test_load_prefers_existing_file() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_config(&dir, VALID);

    let config = AccountConfig::load(&path).expect("Load failed");

    assert_eq!(config.account(), "marbles");
}

#[test]
fn test_debug_redacts_secrets() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = AccountConfig::from_file(write_config(&dir, VALID)).expect("Load failed");

    let rendered = format!("{:?}", config);

    assert!(rendered.contains("marbles"));
    assert!(!rendered.contains("cs-secret"));
    assert!(!rendered.contains("ats-secret"));
}

#[test]
fn test_new_validates() {
    let result = AccountConfig::new(
        "ck".to_string(),
        "cs".to_string(),
        "at".to_string(),
        " ".to_string(),
        "marbles".to_string(),
    );

    assert!(result.is_err());
}
