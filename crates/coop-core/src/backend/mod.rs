// ── Backend service seam ──
//
// Commands out, message pages in. `HttpBackend` talks to the real API;
// `MemoryBackend` stands in for it in tests and demo mode.

mod live;
mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use live::HttpBackend;
pub use memory::MemoryBackend;

use crate::command::Command;
use crate::error::CoreError;
use crate::model::LogEntry;

/// Which slice of the message log to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageCursor {
    /// The most recent entries.
    Latest,
    /// Entries strictly older than the instant.
    Before(DateTime<Utc>),
    /// Entries strictly newer than the instant.
    After(DateTime<Utc>),
}

/// A message page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub cursor: PageCursor,
    pub limit: u32,
}

/// A page of log entries as the backend returned it.
///
/// Entries are not guaranteed sorted or de-duplicated; the paginator
/// normalizes them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedPage {
    pub entries: Vec<LogEntry>,
    /// Backend's hint that more entries exist past this page.
    pub has_more: bool,
}

/// The coop backend API.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Post a door command. No retry.
    async fn send_command(&self, command: &Command) -> Result<(), CoreError>;

    /// Fetch one page of the message log.
    async fn fetch_messages(&self, request: PageRequest) -> Result<FetchedPage, CoreError>;
}
