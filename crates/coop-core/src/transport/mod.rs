// ── Reconnecting status transport ──
//
// Owns the single logical connection to the status stream. A background
// driver task connects, pumps frames into the snapshot store, and on any
// failure waits out the reconnect delay before trying again. Exactly one
// driver (and so at most one connection attempt) exists at a time.

mod connector;
mod scripted;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use futures_util::StreamExt;
use serde::Serialize;
use strum::Display;
use tokio::sync::{Mutex, Notify, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use connector::{FrameStream, StatusConnector, WsConnector};
pub use scripted::{ScriptedConnector, ScriptedSession};

use crate::config::ReconnectPolicy;
use crate::convert::decode_frame;
use crate::message::StatusMessage;
use crate::store::SnapshotStore;

const EVENT_CHANNEL_SIZE: usize = 64;

// ── ConnectionState ──────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// First attempt in progress.
    Connecting,
    Open,
    /// Not connected. A retry may be pending.
    #[default]
    Closed,
    /// Retry attempt in progress.
    Reconnecting,
}

/// Lifecycle notifications from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Opened,
    /// The open connection ended. `reason` is `None` for a clean close.
    Closed { reason: Option<String> },
    ConnectFailed { reason: String },
    ReconnectScheduled { attempt: u32, delay: Duration },
    /// `max_retries` exhausted; the driver has stopped.
    GaveUp { attempts: u32 },
}

// ── ReconnectingTransport ────────────────────────────────────────

struct Driver {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

struct Shared {
    connector: Arc<dyn StatusConnector>,
    policy: ReconnectPolicy,
    store: Arc<SnapshotStore>,
    state: watch::Sender<ConnectionState>,
    events: broadcast::Sender<TransportEvent>,
    /// Bumped on every disconnect; a driver only publishes while its
    /// epoch is current.
    epoch: AtomicU64,
    /// Set by `connect()` during a reconnect delay; cleared when the next
    /// attempt starts. Any number of requests collapse into one retry.
    kick_pending: AtomicBool,
    kick: Notify,
}

impl Shared {
    fn is_current(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::Acquire) == epoch
    }

    fn set_state(&self, epoch: u64, state: ConnectionState) {
        if self.is_current(epoch) {
            self.state.send_replace(state);
        }
    }

    fn emit(&self, epoch: u64, event: TransportEvent) {
        if self.is_current(epoch) {
            // No subscribers is fine
            let _ = self.events.send(event);
        }
    }
}

/// Single logical connection to the status stream.
pub struct ReconnectingTransport {
    shared: Arc<Shared>,
    driver: Mutex<Option<Driver>>,
}

impl ReconnectingTransport {
    pub fn new(
        connector: Arc<dyn StatusConnector>,
        policy: ReconnectPolicy,
        store: Arc<SnapshotStore>,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Closed);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self {
            shared: Arc::new(Shared {
                connector,
                policy,
                store,
                state,
                events,
                epoch: AtomicU64::new(0),
                kick_pending: AtomicBool::new(false),
                kick: Notify::new(),
            }),
            driver: Mutex::new(None),
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Subscribe to connection state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Subscribe to lifecycle events.
    pub fn events(&self) -> broadcast::Receiver<TransportEvent> {
        self.shared.events.subscribe()
    }

    /// Start connecting.
    ///
    /// Idempotent: while an attempt is underway or the connection is open
    /// this does nothing. While a reconnect delay is pending it cuts the
    /// delay short. Otherwise it starts a fresh driver.
    pub async fn connect(&self) {
        let mut driver = self.driver.lock().await;

        if let Some(ref running) = *driver {
            if !running.handle.is_finished() {
                if self.state() == ConnectionState::Closed
                    && !self.shared.kick_pending.swap(true, Ordering::AcqRel)
                {
                    debug!("connect requested during reconnect delay, retrying now");
                    // No stored permit: a driver not yet waiting sees the flag.
                    self.shared.kick.notify_waiters();
                }
                return;
            }
        }

        let epoch = self.shared.epoch.load(Ordering::Acquire);
        let cancel = CancellationToken::new();
        // Publish before spawning so callers observe Connecting immediately.
        self.shared.set_state(epoch, ConnectionState::Connecting);
        let handle = tokio::spawn(run_driver(
            Arc::clone(&self.shared),
            epoch,
            cancel.clone(),
        ));
        *driver = Some(Driver { cancel, handle });
    }

    /// Tear down the connection and any pending retry, and wait for the
    /// driver to exit. A later `connect()` starts fresh.
    pub async fn disconnect(&self) {
        let mut driver = self.driver.lock().await;
        self.shared.epoch.fetch_add(1, Ordering::AcqRel);

        if let Some(running) = driver.take() {
            running.cancel.cancel();
            if let Err(e) = running.handle.await {
                warn!(error = %e, "status transport driver ended abnormally");
            }
        }

        self.shared.state.send_replace(ConnectionState::Closed);
        debug!("status transport disconnected");
    }
}

// ── Driver task ──────────────────────────────────────────────────

enum ReadEnd {
    Cancelled,
    Closed,
    Failed(String),
}

/// Main loop: connect → read → on failure, wait → reconnect.
async fn run_driver(shared: Arc<Shared>, epoch: u64, cancel: CancellationToken) {
    let endpoint = shared.connector.endpoint();
    let mut failures: u32 = 0;
    let mut retrying = false;

    loop {
        if retrying {
            shared.set_state(epoch, ConnectionState::Reconnecting);
        }
        shared.kick_pending.store(false, Ordering::Release);
        info!(endpoint = %endpoint, attempt = failures, "connecting to status stream");

        let attempt = tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            result = shared.connector.connect() => result,
        };

        match attempt {
            Ok(frames) => {
                if cancel.is_cancelled() || !shared.is_current(epoch) {
                    return;
                }
                failures = 0;
                shared.set_state(epoch, ConnectionState::Open);
                shared.emit(epoch, TransportEvent::Opened);
                info!("status stream open");

                match read_frames(&shared, epoch, frames, &cancel).await {
                    ReadEnd::Cancelled => return,
                    ReadEnd::Closed => {
                        info!("status stream closed by remote");
                        shared.emit(epoch, TransportEvent::Closed { reason: None });
                    }
                    ReadEnd::Failed(reason) => {
                        warn!(reason = %reason, "status stream failed");
                        shared.emit(
                            epoch,
                            TransportEvent::Closed {
                                reason: Some(reason),
                            },
                        );
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, attempt = failures, "status stream connect failed");
                shared.emit(
                    epoch,
                    TransportEvent::ConnectFailed {
                        reason: e.to_string(),
                    },
                );
            }
        }

        shared.set_state(epoch, ConnectionState::Closed);

        if let Some(max) = shared.policy.max_retries {
            if failures >= max {
                warn!(max_retries = max, "status stream reconnection limit reached, giving up");
                shared.emit(epoch, TransportEvent::GaveUp { attempts: failures });
                return;
            }
        }

        let delay = shared.policy.delay_for(failures);
        failures = failures.saturating_add(1);
        info!(
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            attempt = failures,
            "waiting before reconnect"
        );
        shared.emit(
            epoch,
            TransportEvent::ReconnectScheduled {
                attempt: failures,
                delay,
            },
        );

        let kicked = shared.kick.notified();
        tokio::pin!(kicked);
        kicked.as_mut().enable();
        if shared.kick_pending.load(Ordering::Acquire) {
            debug!("reconnect delay cut short");
        } else {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                () = tokio::time::sleep(delay) => {}
                () = &mut kicked => {}
            }
        }
        if cancel.is_cancelled() {
            return;
        }
        retrying = true;
    }
}

/// Deliver frames from one connection until it ends.
async fn read_frames(
    shared: &Shared,
    epoch: u64,
    mut frames: FrameStream,
    cancel: &CancellationToken,
) -> ReadEnd {
    loop {
        let frame = tokio::select! {
            biased;
            () = cancel.cancelled() => return ReadEnd::Cancelled,
            frame = frames.next() => frame,
        };

        match frame {
            Some(Ok(text)) => deliver(shared, epoch, &text),
            Some(Err(e)) => return ReadEnd::Failed(e.to_string()),
            None => return ReadEnd::Closed,
        }
    }
}

fn deliver(shared: &Shared, epoch: u64, text: &str) {
    let msg = match decode_frame(text) {
        Ok(msg) => msg,
        Err(e) => {
            debug!(error = %e, "dropping malformed status frame");
            return;
        }
    };

    if let StatusMessage::Unknown(ref kind) = msg {
        debug!(kind = %kind, "ignoring unknown status message type");
        return;
    }

    if shared.is_current(epoch) {
        shared.store.apply_live(&msg);
    }
}
