//! Registry of active correlations and the tasks waiting on them.
//!
//! This module provides the [`EventCorrelator`], which matches incoming events against
//! registered predicates and enforces the per-correlation deadline.

use std::{
    collections::BTreeMap,
    future::Future,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use log::{debug, info};
use tokio::{
    sync::oneshot,
    time::{self, Instant},
};

use crate::correlator::correlation::{CorrelationHandle, PendingCorrelation, Registry, lock};

/// How a correlation was resolved, as seen by its waiting task.
enum Resolution<E> {
    Matched(E),
    TimedOut,
    Cancelled,
}

/// Matches events from a shared stream against registered, time-bounded waits.
///
/// The correlator never blocks the caller of [`EventCorrelator::dispatch`]: each
/// correlation is awaited on its own Tokio task, bounded by a timer. Correlations are
/// independent of each other; the only shared state is the registry itself.
///
/// # Thread Safety
///
/// Registration, dispatch and cancellation all go through one mutex-protected map and
/// may be called concurrently. The lock is never held across an `.await`.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
///
/// use clockey::correlator::EventCorrelator;
///
/// # async fn example() {
/// let correlator: EventCorrelator<String> = EventCorrelator::new();
///
/// let handle = correlator.wait(
///     |event| event.starts_with("submit:"),
///     Duration::from_secs(120),
///     |event| async move { println!("got {event}") },
///     || async { println!("nobody answered") },
/// );
///
/// // On shutdown
/// handle.cancel();
/// # }
/// ```
pub struct EventCorrelator<E> {
    /// Active correlations indexed by registration id
    registry: Registry<E>,
    /// Next registration id
    next_id: AtomicU64,
}

impl<E> EventCorrelator<E>
where
    E: Clone + Send + 'static,
{
    /// Creates a correlator with no active correlations.
    pub fn new() -> Self {
        EventCorrelator {
            registry: Arc::new(Mutex::new(BTreeMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Starts waiting for the first event satisfying `predicate`.
    ///
    /// Returns immediately. The wait resolves on a spawned task with exactly one of:
    ///
    /// - `on_match(event)` with the first matching event dispatched, in dispatch order
    /// - `on_timeout()` if no matching event is dispatched within `timeout`
    /// - nothing, if the returned handle (or [`EventCorrelator::cancel_all`]) cancels it first
    ///
    /// The entry is removed from the registry before either callback runs, so
    /// duplicate matching events dispatched afterwards are not examined, and a
    /// failing or panicking callback cannot leave the entry behind.
    ///
    /// # Arguments
    ///
    /// * `predicate` - Pure function evaluated against every dispatched event while Active
    /// * `timeout` - Wait duration, measured from this call
    /// * `on_match` - Async callback receiving the matching event
    /// * `on_timeout` - Async callback run when the deadline elapses without a match
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn wait<P, M, MF, T, TF>(
        &self,
        predicate: P,
        timeout: Duration,
        on_match: M,
        on_timeout: T,
    ) -> CorrelationHandle<E>
    where
        P: Fn(&E) -> bool + Send + 'static,
        M: FnOnce(E) -> MF + Send + 'static,
        MF: Future<Output = ()> + Send + 'static,
        T: FnOnce() -> TF + Send + 'static,
        TF: Future<Output = ()> + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let deadline = Instant::now() + timeout;
        let (sender, receiver) = oneshot::channel();

        lock(&self.registry).insert(id, PendingCorrelation::new(predicate, deadline, sender));
        debug!("registered correlation {} for {:?}", id, timeout);

        let registry = Arc::clone(&self.registry);
        tokio::spawn(async move {
            match await_resolution(&registry, id, deadline, receiver).await {
                Resolution::Matched(event) => {
                    debug!("correlation {} matched", id);
                    on_match(event).await;
                }
                Resolution::TimedOut => {
                    info!("correlation {} timed out", id);
                    on_timeout().await;
                }
                Resolution::Cancelled => debug!("correlation {} cancelled", id),
            }
        });

        CorrelationHandle::new(id, Arc::clone(&self.registry))
    }

    /// Offers an event to every Active correlation.
    ///
    /// Predicates are evaluated in registration order. Each correlation whose
    /// predicate matches is removed from the registry and receives its own clone of
    /// the event.
    ///
    /// # Returns
    ///
    /// The number of correlations resolved by this event.
    pub fn dispatch(&self, event: &E) -> usize {
        let matched: Vec<(u64, PendingCorrelation<E>)> = {
            let mut registry = lock(&self.registry);
            let ids: Vec<u64> = registry
                .iter()
                .filter(|(_, correlation)| correlation.matches(event))
                .map(|(id, _)| *id)
                .collect();

            ids.into_iter()
                .filter_map(|id| registry.remove(&id).map(|correlation| (id, correlation)))
                .collect()
        };

        let now = Instant::now();
        let resolved = matched.len();
        for (id, correlation) in matched {
            // The timer lost the race: its task has not claimed the entry yet
            if correlation.deadline() <= now {
                debug!("correlation {} matched at its deadline", id);
            }
            correlation.resolve(event.clone());
        }

        resolved
    }

    /// Cancels every Active correlation without running any callback.
    ///
    /// Used on shutdown. Returns the number of correlations cancelled.
    pub fn cancel_all(&self) -> usize {
        let mut registry = lock(&self.registry);
        let cancelled = registry.len();
        registry.clear();

        if cancelled > 0 {
            info!("cancelled {} pending correlations", cancelled);
        }

        cancelled
    }

    /// Number of Active correlations.
    pub fn pending(&self) -> usize {
        lock(&self.registry).len()
    }
}

impl<E> Default for EventCorrelator<E>
where
    E: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Waits for the correlation `id` to be resolved.
///
/// A dispatch or cancel removes the entry itself and then either sends the event or
/// drops the sender. On expiry the timer has to claim the entry: if it is still in the
/// registry the correlation times out, otherwise someone else already took it and the
/// receiver tells which way it went.
async fn await_resolution<E>(
    registry: &Registry<E>,
    id: u64,
    deadline: Instant,
    mut receiver: oneshot::Receiver<E>,
) -> Resolution<E> {
    match time::timeout_at(deadline, &mut receiver).await {
        Ok(Ok(event)) => Resolution::Matched(event),
        Ok(Err(_)) => Resolution::Cancelled,
        Err(_) => {
            let claimed = lock(registry).remove(&id).is_some();
            if claimed {
                return Resolution::TimedOut;
            }

            // The entry was taken just before expiry, the sender is about to resolve
            match receiver.await {
                Ok(event) => Resolution::Matched(event),
                Err(_) => Resolution::Cancelled,
            }
        }
    }
}
