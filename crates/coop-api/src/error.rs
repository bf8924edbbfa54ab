use thiserror::Error;

/// Failures from command posts, message pages and the status stream.
#[derive(Debug, Error)]
pub enum Error {
    /// 401/403 from the backend.
    #[error("Backend refused the token: {message}")]
    Authentication { message: String },

    // ── HTTP ──
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Bad URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("No response within {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("TLS setup failed: {0}")]
    Tls(String),

    /// Non-2xx status.
    #[error("Backend returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// 2xx with `success: false` in the envelope.
    #[error("Backend rejected the request: {message}")]
    Rejected { message: String },

    // ── Status stream ──
    #[error("Status stream connect failed: {0}")]
    WebSocketConnect(String),

    #[error("Status stream closed with code {code}: {reason}")]
    WebSocketClosed { code: u16, reason: String },

    /// The raw body is kept for `debug!` output.
    #[error("Unreadable response: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Whether retrying the same request can succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } | Self::WebSocketConnect(_) | Self::WebSocketClosed { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
