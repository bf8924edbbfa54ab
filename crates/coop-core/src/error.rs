// ── Core error types ──
//
// What callers of coop-core handle. HTTP statuses and parse failures from
// coop-api are folded into these variants by the `From` impl below.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    // ── Reaching the backend ──
    #[error("Could not reach {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Backend refused credentials: {message}")]
    AuthenticationFailed { message: String },

    #[error("Controller is shut down")]
    ControllerDisconnected,

    #[error("No response within {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Commands ──
    #[error("Invalid input: {message}")]
    ValidationFailed { message: String },

    #[error("Command '{endpoint}' is already in flight")]
    CommandInFlight { endpoint: String },

    #[error("No operator is signed in")]
    NotSignedIn,

    #[error("Controller rejected the command: {message}")]
    Rejected { message: String },

    // ── Everything else ──
    #[error("Backend error: {message}")]
    Api {
        message: String,
        status: Option<u16>,
    },

    #[error("Bad configuration: {message}")]
    Config { message: String },

    #[error("{0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for a [`CoreError::ValidationFailed`].
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
        }
    }
}

impl From<coop_api::Error> for CoreError {
    fn from(err: coop_api::Error) -> Self {
        match err {
            coop_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            coop_api::Error::Transport(e) if e.is_timeout() => CoreError::Timeout { timeout_secs: 0 },
            coop_api::Error::Transport(e) if e.is_connect() => CoreError::ConnectionFailed {
                url: e.url().map(ToString::to_string).unwrap_or_default(),
                reason: e.to_string(),
            },
            coop_api::Error::Transport(e) => CoreError::Api {
                status: e.status().map(|code| code.as_u16()),
                message: e.to_string(),
            },
            coop_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("bad URL: {e}"),
            },
            coop_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            coop_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("tls: {msg}"),
            },
            coop_api::Error::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            coop_api::Error::Rejected { message } => CoreError::Rejected { message },
            coop_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("status stream: {reason}"),
            },
            coop_api::Error::WebSocketClosed { code, reason } => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("status stream closed ({code}): {reason}"),
            },
            coop_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("unreadable response: {message}"))
            }
        }
    }
}
