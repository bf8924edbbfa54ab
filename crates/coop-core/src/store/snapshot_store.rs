// ── Device snapshot store ──
//
// Holds the single current-state snapshot. Every mutation publishes a
// fresh `Arc<Snapshot>` through a `watch` channel; a published snapshot
// is never modified.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;
use tokio::sync::watch;
use tracing::trace;

use crate::message::{PartialState, StatusMessage};
use crate::model::DeviceState;
use crate::reducer::reduce;
use crate::stream::SnapshotStream;

/// Where the values in a snapshot came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Provenance {
    /// Nothing applied yet; defaults only.
    #[default]
    Initial,
    /// Last applied update came from the status stream.
    Live,
    /// Last applied update came from the fallback poller.
    Synthetic,
}

/// Immutable point-in-time view of the device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub state: DeviceState,
    /// Bumped on every applied update.
    pub seq: u64,
    /// `seq` of the most recent live update (0 if none yet).
    pub live_seq: u64,
    pub provenance: Provenance,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// Whether any update has been applied.
    pub fn has_data(&self) -> bool {
        self.seq > 0
    }
}

/// Single-writer-at-a-time store for the device snapshot.
pub struct SnapshotStore {
    tx: watch::Sender<Arc<Snapshot>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Arc::new(Snapshot::default()));
        Self { tx }
    }

    /// The current snapshot.
    pub fn current(&self) -> Arc<Snapshot> {
        self.tx.borrow().clone()
    }

    /// Live sequence of the current snapshot.
    pub fn live_seq(&self) -> u64 {
        self.tx.borrow().live_seq
    }

    pub fn subscribe(&self) -> SnapshotStream {
        SnapshotStream::new(self.tx.subscribe())
    }

    /// Apply a message from the status stream.
    ///
    /// Returns `false` if the reducer produced nothing to publish.
    pub fn apply_live(&self, msg: &StatusMessage) -> bool {
        self.tx.send_if_modified(|current| {
            let Some(state) = reduce(&current.state, msg) else {
                return false;
            };
            let seq = current.seq + 1;
            *current = Arc::new(Snapshot {
                state,
                seq,
                live_seq: seq,
                provenance: Provenance::Live,
                updated_at: Some(Utc::now()),
            });
            trace!(seq, kind = msg.kind(), "applied live update");
            true
        })
    }

    /// Apply a synthetic full update from the fallback poller.
    ///
    /// `scheduled_live_seq` is the live sequence observed when the tick was
    /// scheduled. If a live update has landed since, the tick is stale and
    /// is discarded (returns `false`).
    pub fn apply_synthetic(&self, partial: PartialState, scheduled_live_seq: u64) -> bool {
        let msg = StatusMessage::FullUpdate(partial);
        self.tx.send_if_modified(|current| {
            if current.live_seq != scheduled_live_seq {
                return false;
            }
            let Some(state) = reduce(&current.state, &msg) else {
                return false;
            };
            *current = Arc::new(Snapshot {
                state,
                seq: current.seq + 1,
                live_seq: current.live_seq,
                provenance: Provenance::Synthetic,
                updated_at: Some(Utc::now()),
            });
            true
        })
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
