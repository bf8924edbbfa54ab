// ── Controller abstraction ──
//
// Composition root for one coop door controller. Owns the snapshot store,
// the reconnecting status transport, the fallback poller, the message log,
// and command dispatch. Consumers (the CLI) only ever talk to this type.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use coop_api::{CoopClient, TlsMode, TransportConfig};

use crate::backend::{Backend, HttpBackend, MemoryBackend};
use crate::command::{Command, Endpoint, InFlight};
use crate::config::{ControllerConfig, TlsVerification};
use crate::error::CoreError;
use crate::identity::IdentityProvider;
use crate::paginator::MessageLog;
use crate::poller::run_fallback_poller;
use crate::store::{Snapshot, SnapshotStore};
use crate::stream::SnapshotStream;
use crate::synthetic::{SyntheticSource, source_for};
use crate::transport::{
    ConnectionState, ReconnectingTransport, ScriptedConnector, StatusConnector, TransportEvent,
    WsConnector,
};

/// Messages seeded into the demo backend.
const DEMO_HISTORY: usize = 120;

// ── Services ─────────────────────────────────────────────────────

/// The pluggable seams a [`Controller`] is built from.
pub struct Services {
    pub connector: Arc<dyn StatusConnector>,
    pub backend: Arc<dyn Backend>,
    pub identity: Arc<dyn IdentityProvider>,
    pub synthetic: Arc<dyn SyntheticSource>,
}

impl Services {
    /// WebSocket status stream and HTTP backend.
    pub fn live(
        config: &ControllerConfig,
        identity: Arc<dyn IdentityProvider>,
    ) -> Result<Self, CoreError> {
        let transport = build_transport(config);
        let client = CoopClient::new(config.api_url.clone(), &transport)?;

        Ok(Self {
            connector: Arc::new(WsConnector::new(config.status_url.clone(), transport)),
            backend: Arc::new(HttpBackend::new(client)),
            identity,
            synthetic: Arc::from(source_for(config.fallback_mode)),
        })
    }

    /// Everything in memory. The status stream never opens, so the
    /// fallback poller drives the snapshot.
    pub fn demo(config: &ControllerConfig, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            connector: Arc::new(ScriptedConnector::new()),
            backend: Arc::new(MemoryBackend::with_history(DEMO_HISTORY, Utc::now())),
            identity,
            synthetic: Arc::from(source_for(config.fallback_mode)),
        }
    }
}

// ── Controller ───────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Nothing runs until
/// [`connect()`](Self::connect); [`shutdown()`](Self::shutdown) stops every
/// background task.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct Poller {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

struct ControllerInner {
    config: ControllerConfig,
    store: Arc<SnapshotStore>,
    transport: ReconnectingTransport,
    message_log: MessageLog,
    backend: Arc<dyn Backend>,
    identity: Arc<dyn IdentityProvider>,
    synthetic: Arc<dyn SyntheticSource>,
    in_flight: InFlight,
    poller: Mutex<Option<Poller>>,
}

impl Controller {
    /// Wire `services` together. Does NOT connect.
    pub fn new(config: ControllerConfig, services: Services) -> Self {
        let store = Arc::new(SnapshotStore::new());
        let transport = ReconnectingTransport::new(
            services.connector,
            config.reconnect,
            Arc::clone(&store),
        );
        let message_log = MessageLog::new(
            Arc::clone(&services.backend),
            config.initial_page_size,
            config.extend_page_size,
            config.window_cap,
        );

        Self {
            inner: Arc::new(ControllerInner {
                config,
                store,
                transport,
                message_log,
                backend: services.backend,
                identity: services.identity,
                synthetic: services.synthetic,
                in_flight: InFlight::new(),
                poller: Mutex::new(None),
            }),
        }
    }

    /// Controller over the live WebSocket and HTTP services.
    pub fn live(
        config: ControllerConfig,
        identity: Arc<dyn IdentityProvider>,
    ) -> Result<Self, CoreError> {
        let services = Services::live(&config, identity)?;
        Ok(Self::new(config, services))
    }

    /// Controller over in-memory services.
    pub fn demo(config: ControllerConfig, identity: Arc<dyn IdentityProvider>) -> Self {
        let services = Services::demo(&config, identity);
        Self::new(config, services)
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Start the status transport and the fallback poller.
    ///
    /// Returns immediately; the connection comes up (or doesn't) in the
    /// background. Calling it again while running is a no-op apart from
    /// cutting a pending reconnect delay short.
    pub async fn connect(&self) {
        self.inner.transport.connect().await;

        let mut poller = self.inner.poller.lock().await;
        if poller.as_ref().is_some_and(|p| !p.handle.is_finished()) {
            return;
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_fallback_poller(
            Arc::clone(&self.inner.store),
            self.inner.transport.subscribe_state(),
            Arc::clone(&self.inner.synthetic),
            self.inner.config.fallback_interval,
            cancel.clone(),
        ));
        *poller = Some(Poller { cancel, handle });
        info!(
            status_url = %self.inner.config.status_url,
            "controller started"
        );
    }

    /// Stop the poller and the transport, wait for both, and close the
    /// message log. No snapshot changes after this returns.
    pub async fn shutdown(&self) {
        if let Some(poller) = self.inner.poller.lock().await.take() {
            poller.cancel.cancel();
            if let Err(e) = poller.handle.await {
                warn!(error = %e, "fallback poller ended abnormally");
            }
        }

        self.inner.transport.disconnect().await;
        self.inner.message_log.close();
        debug!("controller shut down");
    }

    /// One-shot: connect, run closure, shut down.
    pub async fn oneshot<F, Fut, T>(
        config: ControllerConfig,
        services: Services,
        f: F,
    ) -> Result<T, CoreError>
    where
        F: FnOnce(Controller) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let controller = Controller::new(config, services);
        controller.connect().await;
        let result = f(controller.clone()).await;
        controller.shutdown().await;
        result
    }

    // ── State observation ────────────────────────────────────────

    /// The latest snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.store.current()
    }

    /// Subscribe to snapshot changes.
    pub fn subscribe_snapshot(&self) -> SnapshotStream {
        self.inner.store.subscribe()
    }

    /// Subscribe to connection state changes.
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.transport.subscribe_state()
    }

    /// Subscribe to transport lifecycle events.
    pub fn transport_events(&self) -> broadcast::Receiver<TransportEvent> {
        self.inner.transport.events()
    }

    pub fn message_log(&self) -> &MessageLog {
        &self.inner.message_log
    }

    pub fn identity(&self) -> &Arc<dyn IdentityProvider> {
        &self.inner.identity
    }

    /// Subscribe to the set of endpoints with a command in flight.
    pub fn in_flight(&self) -> watch::Receiver<Arc<BTreeSet<Endpoint>>> {
        self.inner.in_flight.subscribe()
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Send a door command.
    ///
    /// Requires a signed-in principal, and refuses while a command to the
    /// same endpoint is still outstanding. Failures are returned as-is,
    /// never retried.
    pub async fn execute(&self, command: Command) -> Result<(), CoreError> {
        let principal = self
            .inner
            .identity
            .current()
            .ok_or(CoreError::NotSignedIn)?;

        let endpoint = command.endpoint();
        let Some(_guard) = self.inner.in_flight.try_begin(endpoint) else {
            return Err(CoreError::CommandInFlight {
                endpoint: endpoint.to_string(),
            });
        };

        info!(%endpoint, operator = %principal.email, "sending door command");
        match self.inner.backend.send_command(&command).await {
            Ok(()) => {
                debug!(%endpoint, "door command accepted");
                Ok(())
            }
            Err(e) => {
                warn!(%endpoint, error = %e, "door command failed");
                Err(e)
            }
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────

fn build_transport(config: &ControllerConfig) -> TransportConfig {
    TransportConfig {
        tls: tls_to_transport(&config.tls),
        timeout: config.timeout,
        bearer_token: config.token.clone(),
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}
