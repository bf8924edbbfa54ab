use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::watch;

use super::Endpoint;

/// Set of command endpoints with a request outstanding.
///
/// Membership is claimed through [`InFlight::try_begin`]; the returned
/// guard releases it on drop, on every exit path. Claims and releases
/// happen under the watch channel's lock, so the published set is always
/// the authoritative one.
pub struct InFlight {
    busy: watch::Sender<Arc<BTreeSet<Endpoint>>>,
}

impl InFlight {
    pub fn new() -> Self {
        let (busy, _) = watch::channel(Arc::new(BTreeSet::new()));
        Self { busy }
    }

    /// Claim `endpoint`. Returns `None` if it is already busy.
    pub fn try_begin(&self, endpoint: Endpoint) -> Option<InFlightGuard<'_>> {
        let claimed = self.busy.send_if_modified(|set| {
            if set.contains(&endpoint) {
                return false;
            }
            let mut next = BTreeSet::clone(set);
            next.insert(endpoint);
            *set = Arc::new(next);
            true
        });
        claimed.then_some(InFlightGuard {
            owner: self,
            endpoint,
        })
    }

    pub fn is_busy(&self, endpoint: Endpoint) -> bool {
        self.busy.borrow().contains(&endpoint)
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<BTreeSet<Endpoint>>> {
        self.busy.subscribe()
    }

    fn release(&self, endpoint: Endpoint) {
        self.busy.send_if_modified(|set| {
            if !set.contains(&endpoint) {
                return false;
            }
            let mut next = BTreeSet::clone(set);
            next.remove(&endpoint);
            *set = Arc::new(next);
            true
        });
    }
}

impl Default for InFlight {
    fn default() -> Self {
        Self::new()
    }
}

/// Holds an endpoint busy until dropped.
pub struct InFlightGuard<'a> {
    owner: &'a InFlight,
    endpoint: Endpoint,
}

impl InFlightGuard<'_> {
    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.owner.release(self.endpoint);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_claim_is_refused_until_release() {
        let in_flight = InFlight::new();
        let rx = in_flight.subscribe();

        let guard = in_flight.try_begin(Endpoint::Open).unwrap();
        assert!(in_flight.try_begin(Endpoint::Open).is_none());
        assert!(in_flight.try_begin(Endpoint::Close).is_some());
        assert!(rx.borrow().contains(&Endpoint::Open));
        assert_eq!(guard.endpoint(), Endpoint::Open);

        drop(guard);
        assert!(!in_flight.is_busy(Endpoint::Open));
        assert!(rx.borrow().is_empty());
        assert!(in_flight.try_begin(Endpoint::Open).is_some());
    }
}
