use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use common::RequestId;

/// Set of requests with a resolve currently running in this process.
#[derive(Debug, Clone, Default)]
pub(crate) struct InFlight {
    ids: Arc<Mutex<HashSet<RequestId>>>,
}

impl InFlight {
    /// Marks `id` as being resolved. Returns `None` if it already is.
    pub(crate) fn try_claim(&self, id: RequestId) -> Option<InFlightGuard> {
        let mut ids = self.ids.lock().unwrap_or_else(PoisonError::into_inner);
        ids.insert(id).then(|| InFlightGuard {
            ids: Arc::clone(&self.ids),
            id,
        })
    }

    #[cfg(test)]
    fn contains(&self, id: RequestId) -> bool {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&id)
    }
}

/// Releases the claim on drop.
#[derive(Debug)]
pub(crate) struct InFlightGuard {
    ids: Arc<Mutex<HashSet<RequestId>>>,
    id: RequestId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_claim_fails_until_first_is_dropped() {
        let in_flight = InFlight::default();
        let id = RequestId::new();

        let guard = in_flight.try_claim(id).unwrap();
        assert!(in_flight.try_claim(id).is_none());
        assert!(in_flight.try_claim(RequestId::new()).is_some());

        drop(guard);
        assert!(!in_flight.contains(id));
        assert!(in_flight.try_claim(id).is_some());
    }
}
