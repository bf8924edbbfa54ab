//! Configuration for the coop CLI.
//!
//! TOML profiles, token resolution (env + keyring + plaintext), and
//! translation to `coop_core::ControllerConfig`. The CLI layers its flag
//! overrides on top of what this crate produces.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use coop_core::{ControllerConfig, FallbackMode, ReconnectPolicy, TlsVerification};

/// Keyring service name for stored tokens.
const KEYRING_SERVICE: &str = "coopctl";

const DEFAULT_TIMEOUT_SECS: u64 = 10;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    UnknownProfile { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named controller profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Look up a profile by name.
    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    /// Output format: table, json, json-compact, yaml, plain.
    #[serde(default = "default_output")]
    pub output: String,

    /// Color mode: auto, always, never.
    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

/// A named controller profile.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// Backend API root (e.g., "http://192.168.1.40:3001/api").
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Status stream endpoint (e.g., "ws://192.168.1.40:3001").
    #[serde(default = "default_status_url")]
    pub status_url: String,

    /// Bearer token (plaintext -- prefer keyring or env var).
    pub token: Option<String>,

    /// Environment variable name containing the token.
    pub token_env: Option<String>,

    /// Look the token up in the system keyring.
    #[serde(default = "default_true")]
    pub keyring: bool,

    /// Operator email signed in for door commands.
    pub operator: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Accept invalid TLS certificates.
    pub insecure: Option<bool>,

    /// Request timeout in seconds.
    pub timeout: Option<u64>,

    /// What the fallback poller synthesizes: "simulate" or "clock".
    pub fallback_mode: Option<FallbackMode>,

    /// Fallback tick period in milliseconds.
    pub fallback_interval_ms: Option<u64>,

    /// Delay between reconnect attempts in milliseconds.
    pub reconnect_delay_ms: Option<u64>,

    /// Give up reconnecting after this many consecutive failures.
    pub max_retries: Option<u32>,

    /// Entries fetched by the first message page.
    pub page_size: Option<u32>,

    /// Maximum entries held in the message window.
    pub window_cap: Option<usize>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            status_url: default_status_url(),
            token: None,
            token_env: None,
            keyring: true,
            operator: None,
            ca_cert: None,
            insecure: None,
            timeout: None,
            fallback_mode: None,
            fallback_interval_ms: None,
            reconnect_delay_ms: None,
            max_retries: None,
            page_size: None,
            window_cap: None,
        }
    }
}

fn default_api_url() -> String {
    coop_core::config::DEFAULT_API_URL.into()
}
fn default_status_url() -> String {
    coop_core::config::DEFAULT_STATUS_URL.into()
}
fn default_true() -> bool {
    true
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "coopctl", "coopctl").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("coopctl");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the full Config from `path` + environment.
///
/// A missing file is not an error. `COOP_` variables override file values,
/// with `__` separating nested keys (`COOP_PROFILES__DEFAULT__API_URL`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("COOP_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(&path, cfg)?;
    Ok(path)
}

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Token resolution ────────────────────────────────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, keyring::Error> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/token"))
}

/// Resolve the bearer token from the profile's chain.
///
/// Order: `token_env` variable, system keyring, plaintext `token`.
/// `None` means the backend is reached without a token.
pub fn resolve_token(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    // 1. Profile's token_env → env var lookup
    if let Some(ref env_name) = profile.token_env {
        if let Ok(val) = std::env::var(env_name) {
            return Some(SecretString::from(val));
        }
    }

    // 2. System keyring
    if profile.keyring {
        if let Ok(secret) = keyring_entry(profile_name).and_then(|entry| entry.get_password()) {
            return Some(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    profile
        .token
        .as_ref()
        .map(|token| SecretString::from(token.clone()))
}

/// Store a token for `profile_name` in the system keyring.
pub fn store_token(profile_name: &str, token: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(token)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

fn parse_url(field: &str, value: &str, schemes: &[&str]) -> Result<Url, ConfigError> {
    let url = Url::parse(value).map_err(|e| invalid(field, format!("invalid URL '{value}': {e}")))?;
    if !schemes.contains(&url.scheme()) {
        return Err(invalid(
            field,
            format!(
                "expected a {} URL, got '{value}'",
                schemes.join(" or ")
            ),
        ));
    }
    Ok(url)
}

fn positive_millis(field: &str, value: Option<u64>) -> Result<Option<Duration>, ConfigError> {
    match value {
        Some(0) => Err(invalid(field, "must be greater than zero")),
        Some(ms) => Ok(Some(Duration::from_millis(ms))),
        None => Ok(None),
    }
}

/// Build a `ControllerConfig` from a profile -- no CLI flag overrides.
pub fn profile_to_controller_config(
    profile: &Profile,
    profile_name: &str,
) -> Result<ControllerConfig, ConfigError> {
    let api_url = parse_url("api_url", &profile.api_url, &["http", "https"])?;
    let status_url = parse_url("status_url", &profile.status_url, &["ws", "wss"])?;

    let mut config = ControllerConfig::new(api_url, status_url);
    config.token = resolve_token(profile, profile_name);

    config.tls = if profile.insecure.unwrap_or(false) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS));
    if config.timeout.is_zero() {
        return Err(invalid("timeout", "must be greater than zero"));
    }

    if let Some(mode) = profile.fallback_mode {
        config.fallback_mode = mode;
    }
    if let Some(interval) = positive_millis("fallback_interval_ms", profile.fallback_interval_ms)? {
        config.fallback_interval = interval;
    }

    let mut reconnect = ReconnectPolicy::default();
    if let Some(delay) = positive_millis("reconnect_delay_ms", profile.reconnect_delay_ms)? {
        reconnect = ReconnectPolicy::fixed(delay);
    }
    reconnect.max_retries = profile.max_retries;
    config.reconnect = reconnect;

    if let Some(size) = profile.page_size {
        if size == 0 {
            return Err(invalid("page_size", "must be greater than zero"));
        }
        config.initial_page_size = size;
    }
    if let Some(cap) = profile.window_cap {
        let page = usize::try_from(config.initial_page_size).unwrap_or(usize::MAX);
        if cap < page {
            return Err(invalid(
                "window_cap",
                format!("must hold at least one page ({page} entries)"),
            ));
        }
        config.window_cap = cap;
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_profile() -> Profile {
        Profile {
            keyring: false,
            ..Profile::default()
        }
    }

    #[test]
    fn default_profile_points_at_localhost() {
        let cfg = profile_to_controller_config(&local_profile(), "default").unwrap();
        assert_eq!(cfg.api_url.as_str(), "http://localhost:3001/api");
        assert_eq!(cfg.status_url.as_str(), "ws://localhost:3001/");
        assert!(cfg.token.is_none());
        assert_eq!(cfg.timeout, Duration::from_secs(10));
        assert_eq!(cfg.tls, TlsVerification::SystemDefaults);
    }

    #[test]
    fn status_url_must_be_websocket() {
        let profile = Profile {
            status_url: "http://localhost:3001".into(),
            ..local_profile()
        };
        let err = profile_to_controller_config(&profile, "default").unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "status_url"));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let profile = Profile {
            fallback_interval_ms: Some(0),
            ..local_profile()
        };
        assert!(profile_to_controller_config(&profile, "default").is_err());
    }

    #[test]
    fn window_cap_must_hold_a_page() {
        let profile = Profile {
            page_size: Some(40),
            window_cap: Some(20),
            ..local_profile()
        };
        let err = profile_to_controller_config(&profile, "default").unwrap_err();
        assert!(err.to_string().contains("window_cap"));
    }

    #[test]
    fn plaintext_token_is_last_resort() {
        let profile = Profile {
            token: Some("plain".into()),
            token_env: Some("COOP_CONFIG_TEST_UNSET_TOKEN".into()),
            ..local_profile()
        };
        let token = resolve_token(&profile, "default").unwrap();
        assert_eq!(secrecy::ExposeSecret::expose_secret(&token), "plain");
    }
}
