// Wire types for the coop backend.
//
// These mirror the JSON the backend emits. Domain conversion lives in
// `coop-core`; nothing here enforces domain invariants beyond what serde
// needs to decode a body.

use serde::{Deserialize, Serialize};

// ── Command responses ────────────────────────────────────────────────

/// Acknowledgement body returned by the command endpoints.
///
/// The backend answers `{ "success": true }`. Any extra fields are
/// ignored. A missing body is treated as success by the client.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandAck {
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default, alias = "error")]
    pub message: Option<String>,
}

fn default_true() -> bool {
    true
}

/// `{ "time": "HH:MM" }` body for the schedule endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleBody<'a> {
    pub time: &'a str,
}

// ── Message log ──────────────────────────────────────────────────────

/// A single message log record as returned by `GET /messages`.
///
/// The backend is a document store, so the id arrives as `_id`; `id` is
/// accepted as well.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RawMessage {
    #[serde(alias = "_id")]
    pub id: String,
    pub message: String,
    /// ISO-8601 timestamp.
    pub timestamp: String,
}

/// Envelope for a page of log messages.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    pub success: bool,
    #[serde(default)]
    pub messages: Vec<RawMessage>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default, alias = "error")]
    pub message: Option<String>,
}

/// Query parameters for a message page.
///
/// `before` and `after` are ISO-8601 timestamps and are mutually
/// exclusive in practice; the client sends whichever is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageQuery {
    pub before: Option<String>,
    pub after: Option<String>,
    pub limit: u32,
}

impl MessageQuery {
    /// The most recent `limit` messages.
    pub fn latest(limit: u32) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    /// Up to `limit` messages strictly older than `ts`.
    pub fn before(ts: impl Into<String>, limit: u32) -> Self {
        Self {
            before: Some(ts.into()),
            after: None,
            limit,
        }
    }

    /// Up to `limit` messages strictly newer than `ts`.
    pub fn after(ts: impl Into<String>, limit: u32) -> Self {
        Self {
            before: None,
            after: Some(ts.into()),
            limit,
        }
    }

    pub(crate) fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(3);
        if let Some(ref before) = self.before {
            pairs.push(("before", before.clone()));
        }
        if let Some(ref after) = self.after {
            pairs.push(("after", after.clone()));
        }
        pairs.push(("limit", self.limit.to_string()));
        pairs
    }
}

// ── Status stream ────────────────────────────────────────────────────

/// Partial device state carried by a `fullUpdate` frame.
///
/// Every field is optional; `null` and absent decode the same way.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RawPartialState {
    #[serde(default)]
    pub current_time: Option<String>,
    #[serde(default)]
    pub indicators: Option<Vec<bool>>,
    #[serde(default)]
    pub door_status: Option<String>,
}

/// A decoded status frame, before domain validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusFrame {
    Time(String),
    Indicators(Vec<bool>),
    DoorStatus(String),
    FullUpdate(RawPartialState),
    /// A well-formed frame with a `type` this client does not know.
    Unknown(String),
}
