//! Request deduplication
//!
//! Concurrent callers asking for the same key share one in-flight request instead
//! of each issuing their own. The shared request is driven by whichever waiter is
//! polling it, so dropping the caller that started it does not cancel it for the
//! others. Once it completes the key is released and the next call starts fresh.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

type SharedRequest<T, E> = Shared<BoxFuture<'static, Result<T, Arc<E>>>>;
type InFlight<T, E> = Arc<Mutex<HashMap<String, SharedRequest<T, E>>>>;

/// Totals since the deduplicator was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupStats {
    /// Requests actually started
    pub launched: u64,
    /// Calls that joined a request already in flight
    pub joined: u64,
}

#[derive(Debug, Default)]
struct Counters {
    launched: AtomicU64,
    joined: AtomicU64,
}

/// Coalesces concurrent identical requests into one
///
/// Every waiter on a key receives a clone of the same result; errors are shared
/// through an `Arc` because most error types are not `Clone`.
pub struct RequestDeduplicator<T, E> {
    in_flight: InFlight<T, E>,
    counters: Arc<Counters>,
}

impl<T, E> Clone for RequestDeduplicator<T, E> {
    fn clone(&self) -> Self {
        Self {
            in_flight: Arc::clone(&self.in_flight),
            counters: Arc::clone(&self.counters),
        }
    }
}

impl<T, E> Default for RequestDeduplicator<T, E> {
    fn default() -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            counters: Arc::new(Counters::default()),
        }
    }
}

impl<T, E> std::fmt::Debug for RequestDeduplicator<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestDeduplicator")
            .field("in_flight", &self.in_flight())
            .field("stats", &self.stats())
            .finish()
    }
}

impl<T, E> RequestDeduplicator<T, E> {
    /// Number of distinct requests currently in flight
    pub fn in_flight(&self) -> usize {
        lock(&self.in_flight).len()
    }

    /// Launch and join totals
    pub fn stats(&self) -> DedupStats {
        DedupStats {
            launched: self.counters.launched.load(Ordering::Relaxed),
            joined: self.counters.joined.load(Ordering::Relaxed),
        }
    }
}

fn lock<T, E>(in_flight: &InFlight<T, E>) -> MutexGuard<'_, HashMap<String, SharedRequest<T, E>>> {
    in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<T, E> RequestDeduplicator<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    /// Creates an empty deduplicator
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the request for `key`, or joins the one already in flight
    ///
    /// `make` is only called when no request for `key` is in flight.
    pub async fn run<F, Fut>(&self, key: &str, make: F) -> Result<T, Arc<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let request = {
            let mut in_flight = lock(&self.in_flight);
            match in_flight.get(key) {
                Some(existing) => {
                    self.counters.joined.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(key, "Joining in-flight request");
                    existing.clone()
                }
                None => {
                    self.counters.launched.fetch_add(1, Ordering::Relaxed);
                    let request = Self::launch(Arc::clone(&self.in_flight), key.to_string(), make());
                    in_flight.insert(key.to_string(), request.clone());
                    request
                }
            }
        };
        request.await
    }

    /// Wraps `fut` so it releases `key` the moment it resolves
    fn launch<Fut>(in_flight: InFlight<T, E>, key: String, fut: Fut) -> SharedRequest<T, E>
    where
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        async move {
            let result = fut.await.map_err(Arc::new);
            lock(&in_flight).remove(&key);
            result
        }
        .boxed()
        .shared()
    }
}
