//! Status stream over WebSocket.
//!
//! Opens a single connection to the controller's status endpoint and
//! exposes it as a stream of raw text frames. Reconnection is not handled
//! here: `coop-core`'s transport owns the retry loop and decides what a
//! dropped connection means.
//!
//! # Example
//!
//! ```rust,ignore
//! use coop_api::websocket::{connect_status_stream, parse_frame};
//! use coop_api::TransportConfig;
//! use futures_util::StreamExt;
//! use url::Url;
//!
//! let url = Url::parse("ws://localhost:3001")?;
//! let mut frames = connect_status_stream(&url, &TransportConfig::default()).await?;
//!
//! while let Some(Ok(text)) = frames.next().await {
//!     if let Ok(frame) = parse_frame(&text) {
//!         println!("{frame:?}");
//!     }
//! }
//! ```

use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use serde::Deserialize;
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder};
use url::Url;

use crate::error::Error;
use crate::models::{RawPartialState, StatusFrame};
use crate::transport::TransportConfig;

/// Text frames from one status connection.
///
/// The stream yields `Ok(text)` per text frame in arrival order, `Err` on a
/// transport failure, and ends when the server closes the connection.
pub type TextFrameStream = BoxStream<'static, Result<String, Error>>;

// ── Connection ───────────────────────────────────────────────────────

/// Establish a single WebSocket connection to the status endpoint.
///
/// If the transport carries a bearer token, it's sent as an
/// `Authorization` header on the upgrade request. The handshake is bounded
/// by the transport timeout.
pub async fn connect_status_stream(
    url: &Url,
    transport: &TransportConfig,
) -> Result<TextFrameStream, Error> {
    tracing::info!(url = %url, "Connecting to status WebSocket");

    let uri: tungstenite::http::Uri = url
        .as_str()
        .parse()
        .map_err(|e: tungstenite::http::uri::InvalidUri| Error::WebSocketConnect(e.to_string()))?;

    let mut request = ClientRequestBuilder::new(uri);
    if let Some(value) = transport.authorization_header()? {
        let value = value
            .to_str()
            .map_err(|e| Error::WebSocketConnect(e.to_string()))?
            .to_owned();
        request = request.with_header("Authorization", value);
    }

    let handshake = tokio_tungstenite::connect_async(request);
    let (ws_stream, _response) = tokio::time::timeout(transport.timeout, handshake)
        .await
        .map_err(|_| Error::Timeout {
            timeout_secs: transport.timeout.as_secs(),
        })?
        .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

    tracing::info!("Status WebSocket connected");

    let frames = stream::unfold(ws_stream, |mut ws| async move {
        loop {
            match ws.next().await? {
                Ok(tungstenite::Message::Text(text)) => {
                    return Some((Ok(text.as_str().to_owned()), ws));
                }
                Ok(tungstenite::Message::Ping(_)) => {
                    // tungstenite handles pong replies automatically
                    tracing::trace!("WebSocket ping");
                }
                Ok(tungstenite::Message::Close(frame)) => {
                    if let Some(ref cf) = frame {
                        tracing::info!(
                            code = %cf.code,
                            reason = %cf.reason,
                            "WebSocket close frame received"
                        );
                    } else {
                        tracing::info!("WebSocket close frame received (no payload)");
                    }
                    return None;
                }
                Ok(_) => {
                    // Binary, Pong, Frame -- ignore
                }
                Err(e) => {
                    return Some((Err(Error::WebSocketConnect(e.to_string())), ws));
                }
            }
        }
    });

    Ok(frames.boxed())
}

// ── Frame parsing ────────────────────────────────────────────────────

/// Raw envelope the controller sends over the WebSocket.
///
/// Either `{ "type": ..., "value": ... }` or
/// `{ "type": "fullUpdate", "currentTime"?, "indicators"?, "doorStatus"? }`.
#[derive(Debug, Deserialize)]
struct WsEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    value: Option<serde_json::Value>,
    #[serde(flatten)]
    partial: RawPartialState,
}

/// Decode one text frame.
///
/// Unknown `type` values decode to [`StatusFrame::Unknown`]; anything that
/// isn't a JSON object with a string `type`, or whose `value` has the wrong
/// shape for its type, is a [`Error::Deserialization`].
pub fn parse_frame(text: &str) -> Result<StatusFrame, Error> {
    let envelope: WsEnvelope = serde_json::from_str(text).map_err(|e| malformed(&e, text))?;

    let frame = match envelope.kind.as_str() {
        "time" => StatusFrame::Time(take_value(envelope.value, text)?),
        "indicators" => StatusFrame::Indicators(take_value(envelope.value, text)?),
        "doorStatus" => StatusFrame::DoorStatus(take_value(envelope.value, text)?),
        "fullUpdate" => StatusFrame::FullUpdate(envelope.partial),
        _ => StatusFrame::Unknown(envelope.kind),
    };
    Ok(frame)
}

fn take_value<T: serde::de::DeserializeOwned>(
    value: Option<serde_json::Value>,
    text: &str,
) -> Result<T, Error> {
    let value = value.ok_or_else(|| Error::Deserialization {
        message: "frame is missing `value`".into(),
        body: text.to_owned(),
    })?;
    serde_json::from_value(value).map_err(|e| malformed(&e, text))
}

fn malformed(err: &serde_json::Error, text: &str) -> Error {
    Error::Deserialization {
        message: err.to_string(),
        body: text.to_owned(),
    }
}

// ── Tests ────────────────────────────────────────────────────────────
