use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// One line of the controller's message log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Unique within a window.
    pub id: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    /// The timestamp in the backend's cursor format (`2024-05-01T06:00:00.000Z`).
    pub fn cursor(&self) -> String {
        cursor_string(self.timestamp)
    }
}

pub(crate) fn cursor_string(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}
