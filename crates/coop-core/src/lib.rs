// coop-core: State synchronization between the coop door controller and consumers (CLI).

pub mod backend;
pub mod command;
pub mod config;
pub mod controller;
pub mod convert;
pub mod error;
pub mod identity;
pub mod message;
pub mod model;
pub mod paginator;
pub mod poller;
pub mod reducer;
pub mod store;
pub mod stream;
pub mod synthetic;
pub mod transport;

// ── Primary re-exports ──────────────────────────────────────────────
pub use backend::{Backend, FetchedPage, HttpBackend, MemoryBackend, PageCursor, PageRequest};
pub use command::{Command, Endpoint, ScheduleTime};
pub use config::{
    BackoffStrategy, ControllerConfig, FallbackMode, ReconnectPolicy, TlsVerification,
};
pub use controller::{Controller, Services};
pub use error::CoreError;
pub use identity::{IdentityProvider, Principal, SessionIdentity};
pub use message::{PartialState, StatusMessage};
pub use paginator::{LoadOutcome, LogWindow, MessageLog};
pub use store::{Provenance, Snapshot, SnapshotStore};
pub use stream::{LogWindowStream, SnapshotStream};
pub use transport::{
    ConnectionState, ReconnectingTransport, ScriptedConnector, ScriptedSession, StatusConnector,
    TransportEvent,
};

pub use model::{DeviceState, DoorStatus, Indicators, LogEntry};
