//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use coop_config::ConfigError;
use coop_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the coop controller at {url}")]
    #[diagnostic(
        code(coop::connection_failed),
        help(
            "Check that the backend is running and reachable.\n\
             Reason: {reason}\n\
             Try: coop --demo status"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(coop::auth_failed),
        help(
            "Verify the backend token.\n\
             Run: coop config set-token --profile {profile}"
        )
    )]
    AuthFailed { profile: String, message: String },

    #[error("No operator is signed in")]
    #[diagnostic(
        code(coop::not_signed_in),
        help(
            "Door commands need an operator.\n\
             Pass --operator <email> or set `operator` in your profile."
        )
    )]
    NotSignedIn,

    // ── Commands ─────────────────────────────────────────────────────
    #[error("Command '{endpoint}' is already in flight")]
    #[diagnostic(code(coop::in_flight), help("Wait for the previous command to finish."))]
    CommandInFlight { endpoint: String },

    #[error("The controller rejected the command: {message}")]
    #[diagnostic(code(coop::rejected))]
    Rejected { message: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error ({status}): {message}")]
    #[diagnostic(code(coop::api_error))]
    ApiError { status: String, message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(coop::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(coop::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: coop config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(coop::config), help("Inspect the file with: coop config show"))]
    Config { message: String },

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(coop::timeout),
        help("Increase timeout with --timeout or check backend responsiveness.")
    )]
    Timeout { seconds: u64 },

    #[error("No status update within {seconds}s")]
    #[diagnostic(
        code(coop::no_update),
        help("Raise --wait, or check the status stream with: coop -v watch")
    )]
    NoUpdate { seconds: u64 },

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NotSignedIn => exit_code::AUTH,
            Self::CommandInFlight { .. } => exit_code::CONFLICT,
            Self::Timeout { .. } | Self::NoUpdate { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::ProfileNotFound { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed { url, reason },

            CoreError::ControllerDisconnected => CliError::ConnectionFailed {
                url: "(disconnected)".into(),
                reason: "controller connection was lost".into(),
            },

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed {
                profile: "current".into(),
                message,
            },

            CoreError::NotSignedIn => CliError::NotSignedIn,

            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::CommandInFlight { endpoint } => CliError::CommandInFlight { endpoint },

            CoreError::Rejected { message } => CliError::Rejected { message },

            CoreError::Api { message, status } => CliError::ApiError {
                status: status.map_or_else(|| "-".into(), |s| s.to_string()),
                message,
            },

            CoreError::Config { message } => CliError::Config { message },

            CoreError::Internal(message) => CliError::ApiError {
                status: "internal".into(),
                message,
            },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::UnknownProfile { name } => CliError::ProfileNotFound {
                name,
                available: String::new(),
            },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_is_a_usage_error() {
        let err = CliError::from(CoreError::ValidationFailed {
            message: "hour must be 0-23".into(),
        });
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }

    #[test]
    fn busy_endpoint_is_a_conflict() {
        let err = CliError::from(CoreError::CommandInFlight {
            endpoint: "open".into(),
        });
        assert_eq!(err.exit_code(), exit_code::CONFLICT);
        assert_eq!(err.to_string(), "Command 'open' is already in flight");
    }

    #[test]
    fn missing_operator_is_an_auth_error() {
        assert_eq!(CliError::from(CoreError::NotSignedIn).exit_code(), exit_code::AUTH);
    }
}
