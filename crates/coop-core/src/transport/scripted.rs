//! In-memory status connector.
//!
//! Each `connect()` consumes the next scripted outcome: refuse, or accept
//! and hand back a session the caller feeds frames into. With nothing
//! scripted it refuses, which is what demo mode relies on.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::connector::{FrameStream, StatusConnector};
use crate::error::CoreError;

enum Outcome {
    Refuse(String),
    Accept(mpsc::UnboundedReceiver<Result<String, CoreError>>),
}

#[derive(Default)]
struct ScriptedInner {
    script: VecDeque<Outcome>,
    attempts: u32,
    latency: Duration,
}

/// Scripted connector for tests and demo mode.
#[derive(Clone, Default)]
pub struct ScriptedConnector {
    inner: Arc<Mutex<ScriptedInner>>,
}

impl ScriptedConnector {
    /// A connector that refuses every attempt until told otherwise.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ScriptedInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Accept the next unscripted attempt. Frames pushed into the returned
    /// session are delivered on that connection.
    pub fn accept_next(&self) -> ScriptedSession {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().script.push_back(Outcome::Accept(rx));
        ScriptedSession { tx: Some(tx) }
    }

    /// Refuse the next unscripted attempt with `reason`.
    pub fn refuse_next(&self, reason: &str) {
        self.lock().script.push_back(Outcome::Refuse(reason.to_owned()));
    }

    /// Delay every attempt by `latency` before it resolves.
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = latency;
    }

    /// Number of `connect()` calls so far.
    pub fn attempts(&self) -> u32 {
        self.lock().attempts
    }
}

#[async_trait]
impl StatusConnector for ScriptedConnector {
    async fn connect(&self) -> Result<FrameStream, CoreError> {
        let latency = {
            let mut inner = self.lock();
            inner.attempts += 1;
            inner.latency
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let outcome = self.lock().script.pop_front();
        match outcome {
            Some(Outcome::Accept(rx)) => Ok(UnboundedReceiverStream::new(rx).boxed()),
            Some(Outcome::Refuse(reason)) => Err(CoreError::ConnectionFailed {
                url: self.endpoint(),
                reason,
            }),
            None => Err(CoreError::ConnectionFailed {
                url: self.endpoint(),
                reason: "connection refused".into(),
            }),
        }
    }

    fn endpoint(&self) -> String {
        "scripted://status".into()
    }
}

/// Server side of one accepted scripted connection.
pub struct ScriptedSession {
    tx: Option<mpsc::UnboundedSender<Result<String, CoreError>>>,
}

impl ScriptedSession {
    /// Deliver a text frame. Returns `false` once the connection is gone.
    pub fn send(&self, text: impl Into<String>) -> bool {
        self.tx
            .as_ref()
            .is_some_and(|tx| tx.send(Ok(text.into())).is_ok())
    }

    /// Fail the connection with a transport error.
    pub fn fail(&mut self, reason: &str) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Err(CoreError::ConnectionFailed {
                url: "scripted://status".into(),
                reason: reason.to_owned(),
            }));
        }
    }

    /// Close the connection cleanly.
    pub fn close(&mut self) {
        self.tx = None;
    }
}
