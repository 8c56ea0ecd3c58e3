//! A single registered wait and the handle its owner keeps.

use std::{
    collections::BTreeMap,
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tokio::{sync::oneshot, time::Instant};

/// Shared registry of Active correlations, keyed by registration id.
///
/// A `BTreeMap` keeps ids in registration order, which is the order predicates are
/// evaluated in when an event is dispatched.
pub(crate) type Registry<E> = Arc<Mutex<BTreeMap<u64, PendingCorrelation<E>>>>;

/// Locks the registry.
///
/// Predicates run under this lock. A panicking predicate poisons the mutex but
/// leaves the map itself consistent, so the guard is recovered instead of
/// propagating the panic to every later caller.
pub(crate) fn lock<E>(registry: &Registry<E>) -> MutexGuard<'_, BTreeMap<u64, PendingCorrelation<E>>> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// An outstanding wait for one event matching a predicate.
///
/// The entry is owned by the correlator registry while Active. Taking it out of the
/// registry is the resolution transition: the taker either delivers an event through
/// [`PendingCorrelation::resolve`] or drops the entry, which the waiting task observes
/// as a cancellation.
pub struct PendingCorrelation<E> {
    /// Evaluated against each dispatched event while Active
    predicate: Box<dyn Fn(&E) -> bool + Send>,
    /// Absolute expiry time
    deadline: Instant,
    /// Delivers the matching event to the waiting task
    sender: oneshot::Sender<E>,
}

impl<E> PendingCorrelation<E> {
    pub(crate) fn new<P>(predicate: P, deadline: Instant, sender: oneshot::Sender<E>) -> Self
    where
        P: Fn(&E) -> bool + Send + 'static,
    {
        PendingCorrelation {
            predicate: Box::new(predicate),
            deadline,
            sender,
        }
    }

    /// Returns `true` if the event satisfies this correlation's predicate.
    pub fn matches(&self, event: &E) -> bool {
        (self.predicate)(event)
    }

    /// Absolute time after which the correlation times out.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Hands the matching event to the waiting task.
    ///
    /// Consumes the correlation, so it can only be resolved once. If the waiting task
    /// is gone (runtime shutting down) the event is dropped.
    pub(crate) fn resolve(self, event: E) {
        let _ = self.sender.send(event);
    }
}

impl<E> fmt::Debug for PendingCorrelation<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingCorrelation")
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

/// Owner-side handle of a correlation returned by
/// [`EventCorrelator::wait`](crate::correlator::EventCorrelator::wait).
///
/// Dropping the handle does not cancel the wait.
pub struct CorrelationHandle<E> {
    /// Registration id
    id: u64,
    /// Registry the correlation was registered in
    registry: Registry<E>,
}

impl<E> CorrelationHandle<E> {
    pub(crate) fn new(id: u64, registry: Registry<E>) -> Self {
        CorrelationHandle { id, registry }
    }

    /// Registration id, unique within one correlator.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns `true` while the correlation is waiting for an event.
    pub fn is_active(&self) -> bool {
        lock(&self.registry).contains_key(&self.id)
    }

    /// Cancels the correlation if it is still Active.
    ///
    /// Neither callback runs after a successful cancellation. Returns `false` when the
    /// correlation was already resolved by a match, a timeout or an earlier cancel.
    pub fn cancel(&self) -> bool {
        lock(&self.registry).remove(&self.id).is_some()
    }
}

impl<E> fmt::Debug for CorrelationHandle<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CorrelationHandle")
            .field("id", &self.id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_registry() -> Registry<u32> {
        Arc::new(Mutex::new(BTreeMap::new()))
    }

    #[tokio::test]
    async fn test_matches_uses_predicate() {
        let (sender, _receiver) = oneshot::channel();
        let correlation = PendingCorrelation::new(|value: &u32| *value > 10, Instant::now(), sender);

        assert!(!correlation.matches(&3));
        assert!(correlation.matches(&11));
    }

    #[tokio::test]
    async fn test_resolve_delivers_event() {
        let (sender, receiver) = oneshot::channel();
        let correlation = PendingCorrelation::new(|_: &u32| true, Instant::now(), sender);

        correlation.resolve(5);

        assert_eq!(receiver.await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_cancel_removes_entry_once() {
        let registry = create_test_registry();
        let (sender, mut receiver) = oneshot::channel();
        lock(&registry).insert(
            1,
            PendingCorrelation::new(|_: &u32| true, Instant::now(), sender),
        );
        let handle = CorrelationHandle::new(1, Arc::clone(&registry));

        assert!(handle.is_active());
        assert!(handle.cancel());
        assert!(!handle.is_active());
        assert!(!handle.cancel());

        // The dropped sender is seen as a cancellation by the waiting side
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_lock_recovers_from_poisoned_registry() {
        let registry = create_test_registry();
        let poisoning = Arc::clone(&registry);

        let _ = std::thread::spawn(move || {
            let _guard = poisoning.lock().unwrap();
            panic!("poison");
        })
        .join();

        assert!(registry.is_poisoned());
        assert!(lock(&registry).is_empty());
    }
}
