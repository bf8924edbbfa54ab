// Message log paging against the in-memory backend.
#![allow(clippy::unwrap_used)]

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use pretty_assertions::assert_eq;

use coop_core::{
    Backend, CoreError, LoadOutcome, LogWindow, MemoryBackend, MessageLog, PageCursor,
};

fn newest() -> DateTime<Utc> {
    "2024-05-01T12:00:00Z".parse().unwrap()
}

fn log_over(backend: &Arc<MemoryBackend>) -> Arc<MessageLog> {
    Arc::new(MessageLog::new(
        Arc::clone(backend) as Arc<dyn Backend>,
        50,
        25,
        50,
    ))
}

fn assert_well_formed(window: &LogWindow) {
    assert!(window.len() <= 50, "window holds {} entries", window.len());
    assert!(
        window
            .entries
            .windows(2)
            .all(|w| w[0].timestamp < w[1].timestamp),
        "window is not strictly ascending"
    );
    let ids: HashSet<&str> = window.entries.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids.len(), window.len());
}

#[tokio::test]
async fn initial_load_takes_newest_page() {
    let backend = Arc::new(MemoryBackend::with_history(120, newest()));
    let log = log_over(&backend);

    let outcome = log.load_initial().await.unwrap();
    assert_eq!(outcome, LoadOutcome::Applied { added: 50, evicted: 0 });

    let window = log.window();
    assert_well_formed(&window);
    assert!(window.loaded);
    assert!(window.has_earlier);
    assert!(!window.has_later);
    assert_eq!(window.newest().unwrap().timestamp, newest());
    assert_eq!(window.oldest().unwrap().timestamp, newest() - TimeDelta::minutes(49));
}

#[tokio::test]
async fn load_earlier_evicts_newest_to_stay_within_cap() {
    let backend = Arc::new(MemoryBackend::with_history(120, newest()));
    let log = log_over(&backend);
    log.load_initial().await.unwrap();
    let before = log.window();

    let outcome = log.load_earlier().await.unwrap();
    assert_eq!(outcome, LoadOutcome::Applied { added: 25, evicted: 25 });

    let window = log.window();
    assert_well_formed(&window);
    assert_eq!(window.len(), 50);
    assert!(window.oldest().unwrap().timestamp < before.oldest().unwrap().timestamp);
    assert!(window.has_later, "evicting the newest entries enables load_later");
    assert!(window.has_earlier);

    let cursor = backend.fetches().last().unwrap().cursor;
    assert_eq!(cursor, PageCursor::Before(before.oldest().unwrap().timestamp));
}

#[tokio::test]
async fn load_later_returns_to_the_newest_entries() {
    let backend = Arc::new(MemoryBackend::with_history(120, newest()));
    let log = log_over(&backend);
    log.load_initial().await.unwrap();
    log.load_earlier().await.unwrap();

    let outcome = log.load_later().await.unwrap();
    assert_eq!(outcome, LoadOutcome::Applied { added: 25, evicted: 25 });

    let window = log.window();
    assert_well_formed(&window);
    assert_eq!(window.newest().unwrap().timestamp, newest());
    assert!(window.has_earlier);
    assert!(!window.has_later);

    assert_eq!(log.load_later().await.unwrap(), LoadOutcome::NothingMore);
}

#[tokio::test]
async fn message_appended_after_eviction_arrives_through_load_later() {
    let backend = Arc::new(MemoryBackend::with_history(120, newest()));
    let log = log_over(&backend);
    log.load_initial().await.unwrap();
    log.load_earlier().await.unwrap();

    let appended_at = newest() + TimeDelta::minutes(1);
    backend.push_message("msg_appended", "Door closed by operator", appended_at);

    // 25 evicted entries plus the new one: the first page leaves one behind.
    assert_eq!(
        log.load_later().await.unwrap(),
        LoadOutcome::Applied { added: 25, evicted: 25 }
    );
    assert!(log.window().has_later);

    assert_eq!(
        log.load_later().await.unwrap(),
        LoadOutcome::Applied { added: 1, evicted: 1 }
    );
    let window = log.window();
    assert_well_formed(&window);
    assert_eq!(window.newest().unwrap().id, "msg_appended");
    assert_eq!(window.newest().unwrap().timestamp, appended_at);
    assert!(!window.has_later);

    assert_eq!(log.load_later().await.unwrap(), LoadOutcome::NothingMore);
}

#[tokio::test]
async fn message_appended_after_initial_load_needs_a_reload() {
    let backend = Arc::new(MemoryBackend::with_history(120, newest()));
    let log = log_over(&backend);
    log.load_initial().await.unwrap();

    let appended_at = newest() + TimeDelta::minutes(1);
    backend.push_message("msg_appended", "Door closed by operator", appended_at);
    assert_eq!(log.load_later().await.unwrap(), LoadOutcome::NothingMore);
    assert_eq!(log.window().newest().unwrap().timestamp, newest());

    log.load_initial().await.unwrap();
    assert_eq!(log.window().newest().unwrap().id, "msg_appended");
}

#[tokio::test]
async fn short_history_leaves_nothing_earlier() {
    let backend = Arc::new(MemoryBackend::with_history(10, newest()));
    let log = log_over(&backend);

    log.load_initial().await.unwrap();
    let window = log.window();
    assert_eq!(window.len(), 10);
    assert!(!window.has_earlier);

    assert_eq!(log.load_earlier().await.unwrap(), LoadOutcome::NothingMore);
    assert_eq!(backend.fetches().len(), 1, "no request is made");
}

#[tokio::test]
async fn extend_before_initial_load_does_nothing() {
    let backend = Arc::new(MemoryBackend::with_history(10, newest()));
    let log = log_over(&backend);

    assert_eq!(log.load_earlier().await.unwrap(), LoadOutcome::NothingMore);
    assert_eq!(log.load_later().await.unwrap(), LoadOutcome::NothingMore);
    assert!(backend.fetches().is_empty());
}

#[tokio::test(start_paused = true)]
async fn concurrent_loads_are_single_flight() {
    let backend = Arc::new(MemoryBackend::with_history(120, newest()));
    backend.set_latency(Duration::from_secs(1));
    let log = log_over(&backend);

    let (first, second) = tokio::join!(log.load_initial(), log.load_initial());
    let outcomes = [first.unwrap(), second.unwrap()];

    assert!(outcomes.contains(&LoadOutcome::Busy));
    assert!(outcomes.contains(&LoadOutcome::Applied { added: 50, evicted: 0 }));
    assert_eq!(backend.fetches().len(), 1);
    assert!(!log.is_loading());
}

#[tokio::test]
async fn failed_fetch_leaves_window_unchanged() {
    let backend = Arc::new(MemoryBackend::with_history(120, newest()));
    let log = log_over(&backend);
    log.load_initial().await.unwrap();
    let before = log.window();

    backend.fail_next_fetch("backend down");
    let err = log.load_earlier().await.unwrap_err();
    assert!(matches!(err, CoreError::Api { status: Some(500), .. }));

    assert_eq!(*log.window(), *before);
    assert!(!log.is_loading(), "the loading flag is cleared on failure");

    // The next attempt goes through.
    assert!(matches!(
        log.load_earlier().await.unwrap(),
        LoadOutcome::Applied { .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn close_discards_in_flight_results() {
    let backend = Arc::new(MemoryBackend::with_history(120, newest()));
    backend.set_latency(Duration::from_secs(2));
    let log = log_over(&backend);

    let pending = {
        let log = Arc::clone(&log);
        tokio::spawn(async move { log.load_initial().await })
    };
    tokio::time::sleep(Duration::from_millis(500)).await;
    log.close();

    assert_eq!(pending.await.unwrap().unwrap(), LoadOutcome::Closed);
    assert!(!log.window().loaded);
    assert!(log.window().is_empty());
    assert_eq!(log.load_initial().await.unwrap(), LoadOutcome::Closed);
}

#[tokio::test]
async fn window_subscribers_see_each_load() {
    let backend = Arc::new(MemoryBackend::with_history(120, newest()));
    let log = log_over(&backend);
    let mut windows = log.subscribe();
    assert!(!windows.current().loaded);

    log.load_initial().await.unwrap();
    let window = windows.changed().await.unwrap();
    assert_eq!(window.len(), 50);
}
