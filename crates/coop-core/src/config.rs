// ── Runtime connection configuration ──
//
// These types describe *how* to talk to a coop controller backend.
// They carry credential data and tuning knobs, but never touch disk.
// The CLI constructs a `ControllerConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use url::Url;

/// Default status stream endpoint.
pub const DEFAULT_STATUS_URL: &str = "ws://localhost:3001";
/// Default backend API root.
pub const DEFAULT_API_URL: &str = "http://localhost:3001/api";

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed certs).
    DangerAcceptInvalid,
}

// ── Reconnection ─────────────────────────────────────────────────────

/// Delay schedule between reconnection attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffStrategy {
    /// Same delay after every failure.
    Fixed(Duration),
    /// `min(initial * 2^attempt, max)` with +-25% jitter.
    Exponential { initial: Duration, max: Duration },
}

/// How the status transport recovers from a dropped connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub strategy: BackoffStrategy,
    /// Consecutive failed attempts before giving up. `None` retries forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            strategy: BackoffStrategy::Fixed(Duration::from_secs(3)),
            max_retries: None,
        }
    }
}

impl ReconnectPolicy {
    /// Fixed delay, retry forever.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            strategy: BackoffStrategy::Fixed(delay),
            max_retries: None,
        }
    }

    /// Exponential backoff, retry forever.
    pub fn exponential(initial: Duration, max: Duration) -> Self {
        Self {
            strategy: BackoffStrategy::Exponential { initial, max },
            max_retries: None,
        }
    }

    /// Delay before reconnection attempt number `attempt` (zero-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.strategy {
            BackoffStrategy::Fixed(delay) => delay,
            BackoffStrategy::Exponential { initial, max } => {
                calculate_backoff(attempt, initial, max)
            }
        }
    }
}

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) + jitter`
///
/// Jitter is +-25% to spread out reconnection storms from multiple clients.
fn calculate_backoff(attempt: u32, initial: Duration, max: Duration) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let base = initial.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(max.as_secs_f64());

    // Deterministic "jitter" seeded from the attempt number.
    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    let with_jitter = (capped * jitter_factor).max(0.0);

    Duration::from_secs_f64(with_jitter)
}

// ── Fallback ─────────────────────────────────────────────────────────

/// What the fallback poller fabricates while the stream is down.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum FallbackMode {
    /// Local clock plus random sensor values.
    #[default]
    Simulate,
    /// Local clock only; sensor values stay at their last known state.
    Clock,
}

// ── ControllerConfig ─────────────────────────────────────────────────

/// Configuration for one coop controller backend.
///
/// Built by the CLI, passed to `Controller` -- core never reads config files.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Backend API root (e.g., `http://localhost:3001/api`).
    pub api_url: Url,
    /// Status stream endpoint (e.g., `ws://localhost:3001`).
    pub status_url: Url,
    /// Bearer token for both the API and the stream upgrade.
    pub token: Option<SecretString>,
    /// TLS verification strategy.
    pub tls: TlsVerification,
    /// Request and handshake timeout.
    pub timeout: Duration,
    /// Status stream reconnection.
    pub reconnect: ReconnectPolicy,
    /// Fallback tick period while the stream is not open.
    pub fallback_interval: Duration,
    pub fallback_mode: FallbackMode,
    /// Entries fetched by the first message page.
    pub initial_page_size: u32,
    /// Entries fetched when extending the window in either direction.
    pub extend_page_size: u32,
    /// Maximum entries held in the message window.
    pub window_cap: usize,
}

impl ControllerConfig {
    /// Config with default tuning for the given endpoints.
    pub fn new(api_url: Url, status_url: Url) -> Self {
        Self {
            api_url,
            status_url,
            token: None,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(10),
            reconnect: ReconnectPolicy::default(),
            fallback_interval: Duration::from_secs(2),
            fallback_mode: FallbackMode::default(),
            initial_page_size: 50,
            extend_page_size: 25,
            window_cap: 50,
        }
    }
}
