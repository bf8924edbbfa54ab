//! In-memory backend.
//!
//! Records every command and serves a generated message history, one
//! entry per minute. Failures and latency can be injected for tests.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};

use super::{Backend, FetchedPage, PageCursor, PageRequest};
use crate::command::Command;
use crate::error::CoreError;
use crate::model::LogEntry;

#[derive(Default)]
struct MemoryInner {
    /// Sorted ascending by timestamp.
    history: Vec<LogEntry>,
    commands: Vec<Command>,
    fetches: Vec<PageRequest>,
    fail_next_fetch: Option<String>,
    fail_next_command: Option<String>,
    latency: Duration,
}

/// Backend fake for tests and demo mode.
#[derive(Default)]
pub struct MemoryBackend {
    inner: Mutex<MemoryInner>,
}

impl MemoryBackend {
    /// An empty backend: no history, accepts every command.
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend with `count` generated messages, one minute apart, the
    /// newest stamped `newest`.
    pub fn with_history(count: usize, newest: DateTime<Utc>) -> Self {
        let backend = Self::new();
        {
            let mut inner = backend.lock();
            let mut offset = TimeDelta::zero();
            for i in 0..count {
                let timestamp = newest - offset;
                inner.history.push(LogEntry {
                    id: format!("msg_{}_{i}", timestamp.timestamp_millis()),
                    message: format!("System message {}: Door operation completed successfully", i + 1),
                    timestamp,
                });
                offset += TimeDelta::minutes(1);
            }
            inner.history.sort_by_key(|e| e.timestamp);
        }
        backend
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a message to the history.
    pub fn push_message(&self, id: &str, message: &str, timestamp: DateTime<Utc>) {
        let mut inner = self.lock();
        inner.history.push(LogEntry {
            id: id.to_owned(),
            message: message.to_owned(),
            timestamp,
        });
        inner.history.sort_by_key(|e| e.timestamp);
    }

    /// Commands received, in order.
    pub fn commands(&self) -> Vec<Command> {
        self.lock().commands.clone()
    }

    /// Page requests received, in order.
    pub fn fetches(&self) -> Vec<PageRequest> {
        self.lock().fetches.clone()
    }

    /// Fail the next page fetch with `reason`.
    pub fn fail_next_fetch(&self, reason: &str) {
        self.lock().fail_next_fetch = Some(reason.to_owned());
    }

    /// Reject the next command with `reason`.
    pub fn fail_next_command(&self, reason: &str) {
        self.lock().fail_next_command = Some(reason.to_owned());
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = latency;
    }

    async fn simulate_latency(&self) {
        let latency = self.lock().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn send_command(&self, command: &Command) -> Result<(), CoreError> {
        self.simulate_latency().await;

        let mut inner = self.lock();
        if let Some(message) = inner.fail_next_command.take() {
            return Err(CoreError::Rejected { message });
        }
        inner.commands.push(command.clone());
        Ok(())
    }

    async fn fetch_messages(&self, request: PageRequest) -> Result<FetchedPage, CoreError> {
        self.simulate_latency().await;

        let mut inner = self.lock();
        inner.fetches.push(request);
        if let Some(message) = inner.fail_next_fetch.take() {
            return Err(CoreError::Api {
                message,
                status: Some(500),
            });
        }

        let limit = usize::try_from(request.limit).unwrap_or(usize::MAX);
        let history = &inner.history;

        let (entries, available) = match request.cursor {
            PageCursor::Latest => {
                let start = history.len().saturating_sub(limit);
                (history[start..].to_vec(), history.len())
            }
            PageCursor::Before(ts) => {
                let older: Vec<&LogEntry> = history.iter().filter(|e| e.timestamp < ts).collect();
                let start = older.len().saturating_sub(limit);
                let page = older[start..].iter().map(|e| (*e).clone()).collect();
                (page, older.len())
            }
            PageCursor::After(ts) => {
                let newer: Vec<&LogEntry> = history.iter().filter(|e| e.timestamp > ts).collect();
                let page = newer.iter().take(limit).map(|e| (*e).clone()).collect();
                (page, newer.len())
            }
        };

        Ok(FetchedPage {
            entries,
            has_more: available > limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn newest() -> DateTime<Utc> {
        "2024-05-01T12:00:00Z".parse().unwrap()
    }

    #[tokio::test]
    async fn latest_page_is_newest_entries_ascending() {
        let backend = MemoryBackend::with_history(120, newest());
        let page = backend
            .fetch_messages(PageRequest {
                cursor: PageCursor::Latest,
                limit: 50,
            })
            .await
            .unwrap();

        assert_eq!(page.entries.len(), 50);
        assert!(page.has_more);
        assert_eq!(page.entries.last().unwrap().timestamp, newest());
        assert!(page.entries.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[tokio::test]
    async fn before_cursor_is_strict() {
        let backend = MemoryBackend::with_history(10, newest());
        let page = backend
            .fetch_messages(PageRequest {
                cursor: PageCursor::Before(newest() - TimeDelta::minutes(5)),
                limit: 25,
            })
            .await
            .unwrap();

        assert_eq!(page.entries.len(), 4);
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn commands_are_recorded_and_failures_injected() {
        let backend = MemoryBackend::new();
        backend.send_command(&Command::Open).await.unwrap();

        backend.fail_next_command("jammed");
        let err = backend.send_command(&Command::Close).await.unwrap_err();
        assert!(matches!(err, CoreError::Rejected { .. }));

        assert_eq!(backend.commands(), vec![Command::Open]);
    }
}
