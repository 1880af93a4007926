//! Configuration resolution tests
//!
//! Covers the priority order CLI > environment > TOML > compiled default and
//! graceful fallback when no config file exists.
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate TRIBE_* variables are marked with #[serial].

use serial_test::serial;
use std::env;
use std::io::Write;
use tribe_common::config::{
    load_toml_config, resolve_base_url, resolve_csrf_token, TomlConfig, BASE_URL_ENV,
    CONFIG_PATH_ENV, CSRF_TOKEN_ENV, DEFAULT_BASE_URL,
};
use tribe_common::Error;

#[test]
#[serial]
fn test_base_url_falls_back_to_default() {
    env::remove_var(BASE_URL_ENV);
    let url = resolve_base_url(None, &TomlConfig::default());
    assert_eq!(url, DEFAULT_BASE_URL);
}

#[test]
#[serial]
fn test_env_overrides_toml() {
    env::set_var(BASE_URL_ENV, "https://env.tribe.dev");
    let config = TomlConfig {
        base_url: Some("https://toml.tribe.dev".into()),
        ..Default::default()
    };
    assert_eq!(resolve_base_url(None, &config), "https://env.tribe.dev");
    env::remove_var(BASE_URL_ENV);
}

#[test]
#[serial]
fn test_cli_overrides_env() {
    env::set_var(BASE_URL_ENV, "https://env.tribe.dev");
    let url = resolve_base_url(Some("https://cli.tribe.dev"), &TomlConfig::default());
    assert_eq!(url, "https://cli.tribe.dev");
    env::remove_var(BASE_URL_ENV);
}

#[test]
#[serial]
fn test_toml_used_when_no_env() {
    env::remove_var(BASE_URL_ENV);
    let config = TomlConfig {
        base_url: Some("https://toml.tribe.dev/".into()),
        ..Default::default()
    };
    assert_eq!(resolve_base_url(None, &config), "https://toml.tribe.dev");
}

#[test]
#[serial]
fn test_csrf_token_resolution() {
    env::remove_var(CSRF_TOKEN_ENV);
    assert_eq!(resolve_csrf_token(None, &TomlConfig::default()), None);

    let config = TomlConfig {
        csrf_token: Some("from-toml".into()),
        ..Default::default()
    };
    assert_eq!(resolve_csrf_token(None, &config).as_deref(), Some("from-toml"));

    env::set_var(CSRF_TOKEN_ENV, "from-env");
    assert_eq!(resolve_csrf_token(None, &config).as_deref(), Some("from-env"));
    assert_eq!(resolve_csrf_token(Some("from-cli"), &config).as_deref(), Some("from-cli"));
    env::remove_var(CSRF_TOKEN_ENV);

    // Empty tokens count as absent
    assert_eq!(resolve_csrf_token(Some(""), &TomlConfig::default()), None);
}

#[test]
#[serial]
fn test_explicit_config_file_is_loaded() {
    env::remove_var(CONFIG_PATH_ENV);
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "base_url = \"https://file.tribe.dev\"").unwrap();
    writeln!(file, "[viewer]").unwrap();
    writeln!(file, "tick_interval_ms = 100").unwrap();

    let config = load_toml_config(Some(file.path())).unwrap();
    assert_eq!(config.base_url.as_deref(), Some("https://file.tribe.dev"));
    assert!(config.section("viewer").is_some());
}

#[test]
#[serial]
fn test_config_path_from_env() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "csrf_token = \"tok\"").unwrap();
    env::set_var(CONFIG_PATH_ENV, file.path());

    let config = load_toml_config(None).unwrap();
    assert_eq!(config.csrf_token.as_deref(), Some("tok"));
    env::remove_var(CONFIG_PATH_ENV);
}

#[test]
#[serial]
fn test_missing_explicit_config_is_an_error() {
    env::remove_var(CONFIG_PATH_ENV);
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    let err = load_toml_config(Some(&missing)).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}
