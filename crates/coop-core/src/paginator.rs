// ── Message log paginator ──
//
// A bounded, time-ordered, de-duplicated window over the controller's
// message log. The window extends in either direction from its current
// edges and evicts from the opposite edge to stay under the cap.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::backend::{Backend, FetchedPage, PageCursor, PageRequest};
use crate::error::CoreError;
use crate::model::LogEntry;
use crate::stream::LogWindowStream;

/// Published state of the message window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LogWindow {
    /// Ascending by timestamp; ids unique.
    pub entries: Vec<LogEntry>,
    /// Older entries may exist before the first entry.
    pub has_earlier: bool,
    /// Newer entries may exist after the last entry.
    pub has_later: bool,
    /// `load_initial` has completed at least once.
    pub loaded: bool,
}

impl LogWindow {
    pub fn oldest(&self) -> Option<&LogEntry> {
        self.entries.first()
    }

    pub fn newest(&self) -> Option<&LogEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of a load request that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied { added: usize, evicted: usize },
    /// Another load was in flight; nothing was requested.
    Busy,
    /// The relevant `has_*` flag is false (or the window is empty).
    NothingMore,
    /// The paginator was closed; the result was discarded.
    Closed,
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Earlier,
    Later,
}

/// Paginated view of the message log.
pub struct MessageLog {
    backend: Arc<dyn Backend>,
    window: watch::Sender<Arc<LogWindow>>,
    loading: AtomicBool,
    closed: AtomicBool,
    initial_page_size: u32,
    extend_page_size: u32,
    cap: usize,
}

/// Clears the single-flight flag on drop.
struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl MessageLog {
    pub fn new(
        backend: Arc<dyn Backend>,
        initial_page_size: u32,
        extend_page_size: u32,
        cap: usize,
    ) -> Self {
        let (window, _) = watch::channel(Arc::new(LogWindow::default()));
        Self {
            backend,
            window,
            loading: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            initial_page_size,
            extend_page_size,
            cap: cap.max(1),
        }
    }

    /// The current window.
    pub fn window(&self) -> Arc<LogWindow> {
        self.window.borrow().clone()
    }

    pub fn subscribe(&self) -> LogWindowStream {
        LogWindowStream::new(self.window.subscribe())
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    /// Stop applying results. Loads already in flight are discarded.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn try_begin(&self) -> Option<LoadingGuard<'_>> {
        self.loading
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| LoadingGuard(&self.loading))
    }

    /// Replace the window with the most recent page.
    pub async fn load_initial(&self) -> Result<LoadOutcome, CoreError> {
        if self.is_closed() {
            return Ok(LoadOutcome::Closed);
        }
        let Some(_guard) = self.try_begin() else {
            return Ok(LoadOutcome::Busy);
        };

        let request = PageRequest {
            cursor: PageCursor::Latest,
            limit: self.initial_page_size,
        };
        let page = self.fetch(request).await?;
        if self.is_closed() {
            return Ok(LoadOutcome::Closed);
        }

        let mut entries = normalize(page.entries);
        let evicted = entries.len().saturating_sub(self.cap);
        entries.drain(..evicted);
        let added = entries.len();

        self.window.send_replace(Arc::new(LogWindow {
            entries,
            has_earlier: page.has_more || evicted > 0,
            has_later: false,
            loaded: true,
        }));
        debug!(added, evicted, "message log loaded");
        Ok(LoadOutcome::Applied { added, evicted })
    }

    /// Extend the window with entries older than its oldest entry.
    pub async fn load_earlier(&self) -> Result<LoadOutcome, CoreError> {
        self.extend(Direction::Earlier).await
    }

    /// Extend the window with entries newer than its newest entry.
    ///
    /// Only useful after `load_earlier` has evicted the newest entries:
    /// `load_initial` always leaves `has_later` false, so messages the
    /// backend gains afterwards are only picked up by another `load_initial`.
    pub async fn load_later(&self) -> Result<LoadOutcome, CoreError> {
        self.extend(Direction::Later).await
    }

    async fn extend(&self, direction: Direction) -> Result<LoadOutcome, CoreError> {
        if self.is_closed() {
            return Ok(LoadOutcome::Closed);
        }
        let Some(_guard) = self.try_begin() else {
            return Ok(LoadOutcome::Busy);
        };

        let current = self.window();
        let (allowed, edge) = match direction {
            Direction::Earlier => (current.has_earlier, current.oldest()),
            Direction::Later => (current.has_later, current.newest()),
        };
        let Some(edge) = edge.filter(|_| allowed) else {
            return Ok(LoadOutcome::NothingMore);
        };
        let edge_ts = edge.timestamp;

        let cursor = match direction {
            Direction::Earlier => PageCursor::Before(edge_ts),
            Direction::Later => PageCursor::After(edge_ts),
        };
        let page = self
            .fetch(PageRequest {
                cursor,
                limit: self.extend_page_size,
            })
            .await?;
        if self.is_closed() {
            return Ok(LoadOutcome::Closed);
        }

        let next = merge(&current, page, direction, self.cap);
        let outcome = LoadOutcome::Applied {
            added: next.added,
            evicted: next.evicted,
        };
        debug!(?direction, added = next.added, evicted = next.evicted, "message log extended");
        self.window.send_replace(Arc::new(next.window));
        Ok(outcome)
    }

    async fn fetch(&self, request: PageRequest) -> Result<FetchedPage, CoreError> {
        self.backend
            .fetch_messages(request)
            .await
            .inspect_err(|e| warn!(error = %e, cursor = ?request.cursor, "message page fetch failed"))
    }
}

// ── Window arithmetic ────────────────────────────────────────────

struct Merged {
    window: LogWindow,
    added: usize,
    evicted: usize,
}

/// Sort ascending and drop repeated ids (first occurrence wins).
fn normalize(mut entries: Vec<LogEntry>) -> Vec<LogEntry> {
    entries.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
    let mut seen = HashSet::with_capacity(entries.len());
    entries.retain(|e| seen.insert(e.id.clone()));
    entries
}

fn merge(current: &LogWindow, page: FetchedPage, direction: Direction, cap: usize) -> Merged {
    let known: HashSet<&str> = current.entries.iter().map(|e| e.id.as_str()).collect();
    let (oldest, newest) = match (current.oldest(), current.newest()) {
        (Some(o), Some(n)) => (o.timestamp, n.timestamp),
        _ => {
            return Merged {
                window: current.clone(),
                added: 0,
                evicted: 0,
            };
        }
    };

    let fresh: Vec<LogEntry> = normalize(page.entries)
        .into_iter()
        .filter(|e| !known.contains(e.id.as_str()))
        .filter(|e| match direction {
            Direction::Earlier => e.timestamp < oldest,
            Direction::Later => e.timestamp > newest,
        })
        .collect();
    let added = fresh.len();

    let mut window = LogWindow {
        entries: Vec::with_capacity(current.entries.len() + added),
        has_earlier: current.has_earlier,
        has_later: current.has_later,
        loaded: current.loaded,
    };

    let overflow = match direction {
        Direction::Earlier => {
            window.entries.extend(fresh);
            window.entries.extend(current.entries.iter().cloned());
            let overflow = window.entries.len().saturating_sub(cap);
            window.entries.truncate(window.entries.len() - overflow);
            window.has_earlier = page.has_more && added > 0;
            if overflow > 0 {
                window.has_later = true;
            }
            overflow
        }
        Direction::Later => {
            window.entries.extend(current.entries.iter().cloned());
            window.entries.extend(fresh);
            let overflow = window.entries.len().saturating_sub(cap);
            window.entries.drain(..overflow);
            window.has_later = page.has_more && added > 0;
            if overflow > 0 {
                window.has_earlier = true;
            }
            overflow
        }
    };

    Merged {
        window,
        added,
        evicted: overflow,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeDelta, Utc};

    use super::*;

    fn at(minute: i64) -> DateTime<Utc> {
        "2024-05-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap() + TimeDelta::minutes(minute)
    }

    fn entry(id: &str, minute: i64) -> LogEntry {
        LogEntry {
            id: id.into(),
            message: format!("message {id}"),
            timestamp: at(minute),
        }
    }

    fn window(minutes: std::ops::Range<i64>) -> LogWindow {
        LogWindow {
            entries: minutes.map(|m| entry(&format!("m{m}"), m)).collect(),
            has_earlier: true,
            has_later: false,
            loaded: true,
        }
    }

    #[test]
    fn normalize_sorts_and_dedups() {
        let out = normalize(vec![entry("b", 2), entry("a", 1), entry("b", 2), entry("c", 0)]);
        let ids: Vec<_> = out.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["c", "a", "b"]);
    }

    #[test]
    fn earlier_merge_evicts_newest_and_sets_has_later() {
        let current = window(50..100);
        let page = FetchedPage {
            entries: (25..50).map(|m| entry(&format!("m{m}"), m)).collect(),
            has_more: true,
        };
        let merged = merge(&current, page, Direction::Earlier, 50);

        assert_eq!(merged.added, 25);
        assert_eq!(merged.evicted, 25);
        assert_eq!(merged.window.len(), 50);
        assert_eq!(merged.window.oldest().unwrap().timestamp, at(25));
        assert_eq!(merged.window.newest().unwrap().timestamp, at(74));
        assert!(merged.window.has_later);
        assert!(merged.window.has_earlier);
    }

    #[test]
    fn later_merge_evicts_oldest_and_sets_has_earlier() {
        let mut current = window(0..50);
        current.has_earlier = false;
        current.has_later = true;
        let page = FetchedPage {
            entries: (50..60).map(|m| entry(&format!("m{m}"), m)).collect(),
            has_more: false,
        };
        let merged = merge(&current, page, Direction::Later, 50);

        assert_eq!(merged.evicted, 10);
        assert_eq!(merged.window.oldest().unwrap().timestamp, at(10));
        assert_eq!(merged.window.newest().unwrap().timestamp, at(59));
        assert!(merged.window.has_earlier);
        assert!(!merged.window.has_later);
    }

    #[test]
    fn merge_filters_overlap_and_duplicates() {
        let current = window(10..20);
        let page = FetchedPage {
            entries: vec![entry("m12", 12), entry("x", 15), entry("y", 9), entry("y", 9)],
            has_more: true,
        };
        let merged = merge(&current, page, Direction::Earlier, 50);

        assert_eq!(merged.added, 1);
        assert_eq!(merged.window.oldest().unwrap().id, "y");
        let ids: HashSet<_> = merged.window.entries.iter().map(|e| e.id.clone()).collect();
        assert_eq!(ids.len(), merged.window.len());
    }

    #[test]
    fn empty_earlier_page_clears_has_earlier() {
        let current = window(10..20);
        let page = FetchedPage {
            entries: Vec::new(),
            has_more: true,
        };
        let merged = merge(&current, page, Direction::Earlier, 50);
        assert_eq!(merged.added, 0);
        assert!(!merged.window.has_earlier);
    }
}
