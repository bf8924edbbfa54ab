// Backend HTTP client
//
// Wraps `reqwest::Client` with base-URL joining and the `{ success, ... }`
// body convention. Endpoint groups (commands, messages) are implemented as
// inherent methods in separate files to keep this module about transport.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Raw HTTP client for the coop backend API.
pub struct CoopClient {
    http: reqwest::Client,
    base_url: Url,
}

impl CoopClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// `base_url` is the API root, e.g. `http://localhost:3000/api`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Join `path` onto the base URL, keeping any base path segment.
    ///
    /// `http://host/api` + `open` gives `http://host/api/open`.
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request with query parameters and decode the JSON body.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<T, Error> {
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(Error::Transport)?;

        let body = Self::read_body(resp).await?;
        Self::decode(&body)
    }

    /// Send a POST request with an optional JSON body.
    ///
    /// Returns the raw response text; an empty string means the backend
    /// sent no body.
    pub(crate) async fn post(
        &self,
        url: Url,
        body: Option<&(impl Serialize + Sync)>,
    ) -> Result<String, Error> {
        debug!("POST {}", url);

        let mut req = self.http.post(url);
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = req.send().await.map_err(Error::Transport)?;

        Self::read_body(resp).await
    }

    /// Map HTTP status codes to errors, returning the body text on 2xx.
    async fn read_body(resp: reqwest::Response) -> Result<String, Error> {
        let status = resp.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(Error::Authentication {
                message: format!("backend refused credentials (HTTP {})", status.as_u16()),
            });
        }

        let body = resp.text().await.map_err(Error::Transport)?;

        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        Ok(body)
    }

    pub(crate) fn decode<T: DeserializeOwned>(body: &str) -> Result<T, Error> {
        serde_json::from_str(body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: body.to_owned(),
        })
    }
}

/// Pull a human-readable message out of an error body, falling back to
/// the raw (truncated) text.
fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "error"] {
            if let Some(msg) = value.get(key).and_then(serde_json::Value::as_str) {
                return msg.to_owned();
            }
        }
    }
    if body.is_empty() {
        return "empty response body".into();
    }
    body.chars().take(200).collect()
}
