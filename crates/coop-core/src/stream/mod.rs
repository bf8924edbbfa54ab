// ── Reactive state streams ──
//
// Read side of the snapshot store and the message window. Each subscription
// wraps a `watch::Receiver<Arc<T>>`; dropping it unsubscribes.

use std::sync::Arc;

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::paginator::LogWindow;
use crate::store::Snapshot;

/// Subscription to device snapshots.
pub type SnapshotStream = StateStream<Snapshot>;

/// Subscription to the message log window.
pub type LogWindowStream = StateStream<LogWindow>;

/// A subscription to a published `Arc<T>` value.
pub struct StateStream<T: Send + Sync + 'static> {
    current: Arc<T>,
    receiver: watch::Receiver<Arc<T>>,
}

impl<T: Send + Sync + 'static> StateStream<T> {
    pub(crate) fn new(receiver: watch::Receiver<Arc<T>>) -> Self {
        let current = Arc::clone(&receiver.borrow());
        Self { current, receiver }
    }

    /// Value as of subscription, or as of the last `changed()`.
    pub fn current(&self) -> &Arc<T> {
        &self.current
    }

    /// Value published right now.
    pub fn latest(&self) -> Arc<T> {
        Arc::clone(&self.receiver.borrow())
    }

    /// Next published value. `None` once the store is gone.
    pub async fn changed(&mut self) -> Option<Arc<T>> {
        self.receiver.changed().await.ok()?;
        self.current = Arc::clone(&self.receiver.borrow_and_update());
        Some(Arc::clone(&self.current))
    }

    /// The published value now, then every later one. Intermediate values
    /// published faster than the consumer polls are coalesced.
    pub fn into_stream(self) -> impl Stream<Item = Arc<T>> + Send + Unpin {
        WatchStream::new(self.receiver)
    }
}
