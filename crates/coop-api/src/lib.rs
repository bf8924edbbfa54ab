// coop-api: Async Rust client for the coop door controller backend

pub mod client;
pub mod commands;
pub mod error;
pub mod messages;
pub mod models;
pub mod transport;
pub mod websocket;

pub use client::CoopClient;
pub use error::Error;
pub use models::{MessagePage, MessageQuery, RawMessage, RawPartialState, StatusFrame};
pub use transport::{TlsMode, TransportConfig};
