// ── Fallback poller ──
//
// Keeps the snapshot moving while the status stream is not open. Ticks are
// scheduled only while the transport reports anything other than `Open`;
// the first tick after leaving `Open` lands one interval later.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::store::SnapshotStore;
use crate::synthetic::SyntheticSource;
use crate::transport::ConnectionState;

/// Run the fallback poller until `cancel` fires or the state channel closes.
pub async fn run_fallback_poller(
    store: Arc<SnapshotStore>,
    mut state: watch::Receiver<ConnectionState>,
    source: Arc<dyn SyntheticSource>,
    interval: Duration,
    cancel: CancellationToken,
) {
    loop {
        // Idle while the stream is open.
        while *state.borrow_and_update() == ConnectionState::Open {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                changed = state.changed() => if changed.is_err() { return },
            }
        }

        debug!(?interval, "fallback poller active");
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut scheduled_live_seq = store.live_seq();

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                changed = state.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    if *state.borrow_and_update() == ConnectionState::Open {
                        debug!("status stream open, fallback poller stopped");
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if *state.borrow() == ConnectionState::Open {
                        break;
                    }
                    let partial = source.next(&store.current().state);
                    if store.apply_synthetic(partial, scheduled_live_seq) {
                        trace!("applied synthetic update");
                    } else {
                        debug!("discarding stale synthetic tick");
                    }
                    scheduled_live_seq = store.live_seq();
                }
            }
        }
    }
}
