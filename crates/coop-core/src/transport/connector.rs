// ── Status connector seam ──
//
// One method: open a connection and hand back its text frames. The
// reconnecting transport owns everything else.

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use tracing::{debug, warn};
use url::Url;

use coop_api::TransportConfig;

use crate::error::CoreError;

/// Text frames from one connection, in arrival order.
///
/// `Err` means the connection failed; the end of the stream means the remote
/// closed it. Either way the transport treats the connection as gone.
pub type FrameStream = BoxStream<'static, Result<String, CoreError>>;

/// Source of status stream connections.
#[async_trait]
pub trait StatusConnector: Send + Sync {
    /// Open one connection.
    async fn connect(&self) -> Result<FrameStream, CoreError>;

    /// Where this connector points, for logs and errors.
    fn endpoint(&self) -> String;
}

/// Live connector over WebSocket.
pub struct WsConnector {
    url: Url,
    transport: TransportConfig,
}

impl WsConnector {
    pub fn new(url: Url, transport: TransportConfig) -> Self {
        Self { url, transport }
    }
}

#[async_trait]
impl StatusConnector for WsConnector {
    async fn connect(&self) -> Result<FrameStream, CoreError> {
        let frames = coop_api::websocket::connect_status_stream(&self.url, &self.transport)
            .await
            .inspect_err(|e| {
                if e.is_transient() {
                    debug!(error = %e, url = %self.url, "status stream unreachable");
                } else {
                    warn!(error = %e, url = %self.url, "status stream refused, retrying will likely fail");
                }
            })
            .map_err(|e| match CoreError::from(e) {
                CoreError::ConnectionFailed { reason, .. } => CoreError::ConnectionFailed {
                    url: self.url.to_string(),
                    reason,
                },
                other => other,
            })?;
        Ok(frames.map(|frame| frame.map_err(CoreError::from)).boxed())
    }

    fn endpoint(&self) -> String {
        self.url.to_string()
    }
}
