// ── Reactive snapshot store ──
//
// Push-based publication of the current device state.

mod snapshot_store;

pub use snapshot_store::{Provenance, Snapshot, SnapshotStore};
