//! Single-flight deduplication of in-progress renders.
//!
//! Duplicate requests for the same fingerprint must not each pay full
//! browser-render cost or pile up on the pipeline lock; whichever caller
//! misses first runs the computation and everyone else awaits the same
//! shared future. Entries are removed the moment a flight settles, so a
//! failure is never memoized and the next caller retries fresh.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt, Shared};

use crate::error::RenderError;

type Flight<V> = Shared<BoxFuture<'static, Result<V, RenderError>>>;

/// Keyed at-most-one-in-flight computation table.
///
/// Internally synchronized; the lock is only held to get-or-create a map
/// entry, never across an await.
pub struct SingleFlight<K, V> {
    flights: Arc<Mutex<HashMap<K, Flight<V>>>>,
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            flights: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Runs `make` at most once per concurrent set of callers sharing `key`.
    ///
    /// Exactly one caller becomes the creator; all callers, creator included,
    /// await the same shared outcome. The table entry is removed before the
    /// result is yielded.
    pub async fn execute<F, Fut>(&self, key: K, make: F) -> Result<V, RenderError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, RenderError>> + Send + 'static,
    {
        let flight = {
            let mut flights = self.flights.lock().unwrap();
            match flights.get(&key).cloned() {
                Some(existing) => existing,
                None => {
                    let table = Arc::clone(&self.flights);
                    let settle_key = key.clone();
                    let inner = make();
                    let flight: Flight<V> = async move {
                        let outcome = inner.await;
                        table.lock().unwrap().remove(&settle_key);
                        outcome
                    }
                    .boxed()
                    .shared();
                    flights.insert(key, flight.clone());
                    flight
                }
            }
        };

        flight.await
    }

    /// Number of computations currently in flight.
    pub fn in_flight(&self) -> usize {
        self.flights.lock().unwrap().len()
    }

    pub fn clear(&self) {
        self.flights.lock().unwrap().clear();
    }
}

impl<K, V> Default for SingleFlight<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
