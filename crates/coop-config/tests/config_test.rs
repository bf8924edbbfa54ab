// Loading and saving profile files on disk.
#![allow(clippy::unwrap_used)]

use std::time::Duration;

use pretty_assertions::assert_eq;

use coop_config::{Config, ConfigError, Profile, load_config_from, profile_to_controller_config, save_config_to};
use coop_core::{BackoffStrategy, FallbackMode};

const SAMPLE: &str = r#"
default_profile = "barn"

[defaults]
output = "json"

[profiles.barn]
api_url = "https://coop.example.net/api"
status_url = "wss://coop.example.net/status"
keyring = false
token = "s3cret"
operator = "keeper@example.net"
fallback_mode = "clock"
fallback_interval_ms = 5000
reconnect_delay_ms = 1500
max_retries = 4
page_size = 30
window_cap = 60
"#;

#[test]
fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_config_from(&dir.path().join("absent.toml")).unwrap();

    assert_eq!(config, Config::default());
    assert_eq!(config.defaults.output, "table");
}

#[test]
fn profile_file_maps_onto_controller_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, SAMPLE).unwrap();

    let config = load_config_from(&path).unwrap();
    assert_eq!(config.default_profile.as_deref(), Some("barn"));
    assert_eq!(config.defaults.output, "json");

    let profile = config.profile("barn").unwrap();
    assert_eq!(profile.operator.as_deref(), Some("keeper@example.net"));

    let controller = profile_to_controller_config(profile, "barn").unwrap();
    assert_eq!(controller.api_url.as_str(), "https://coop.example.net/api");
    assert_eq!(controller.status_url.as_str(), "wss://coop.example.net/status");
    assert!(controller.token.is_some());
    assert_eq!(controller.fallback_mode, FallbackMode::Clock);
    assert_eq!(controller.fallback_interval, Duration::from_secs(5));
    assert_eq!(
        controller.reconnect.strategy,
        BackoffStrategy::Fixed(Duration::from_millis(1500))
    );
    assert_eq!(controller.reconnect.max_retries, Some(4));
    assert_eq!(controller.initial_page_size, 30);
    assert_eq!(controller.extend_page_size, 25);
    assert_eq!(controller.window_cap, 60);
}

#[test]
fn unknown_profile_is_reported_by_name() {
    let config = Config::default();
    match config.profile("attic") {
        Err(ConfigError::UnknownProfile { name }) => assert_eq!(name, "attic"),
        other => panic!("expected unknown profile, got {other:?}"),
    }
}

#[test]
fn saved_config_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = Config::default();
    config.profiles.insert(
        "default".into(),
        Profile {
            operator: Some("hen@example.net".into()),
            max_retries: Some(2),
            ..Profile::default()
        },
    );
    save_config_to(&path, &config).unwrap();

    assert_eq!(load_config_from(&path).unwrap(), config);
}

#[test]
fn malformed_file_is_a_load_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "profiles = 3").unwrap();

    assert!(matches!(
        load_config_from(&path),
        Err(ConfigError::Figment(_))
    ));
}
