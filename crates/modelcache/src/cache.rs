//! Shared model cache with single-flight construction
//!
//! One `SharedCache` is shared by every registry in a cache group. A single
//! mutex guards the LRU and the table of constructions in flight; it is only
//! ever held for bookkeeping. Factories run with the lock released, so a slow
//! model for one key never blocks lookups or constructions for other keys.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use ahash::RandomState;
use modelstore::ModelFactory;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::key::CacheKey;
use crate::lru::LruCache;
use crate::stats::CacheStats;

type Outcome<R> = Result<Arc<R>>;

/// Completion signal for one in-flight construction
struct Flight<R> {
    outcome: Mutex<Option<Outcome<R>>>,
    done: Condvar,
}

impl<R> Flight<R> {
    fn new() -> Self {
        Self {
            outcome: Mutex::new(None),
            done: Condvar::new(),
        }
    }

    fn complete(&self, outcome: Outcome<R>) {
        *self.outcome.lock() = Some(outcome);
        self.done.notify_all();
    }

    fn wait(&self) -> Outcome<R> {
        let mut outcome = self.outcome.lock();
        loop {
            if let Some(outcome) = outcome.as_ref() {
                return outcome.clone();
            }
            self.done.wait(&mut outcome);
        }
    }
}

struct State<R> {
    lru: LruCache<CacheKey, Arc<R>>,
    in_flight: HashMap<CacheKey, Arc<Flight<R>>, RandomState>,
}

enum Lookup<R> {
    Hit(Arc<R>),
    Lead(Arc<Flight<R>>),
    Follow(Arc<Flight<R>>),
}

/// Bounded cache of constructed models, shared between registries
pub struct SharedCache<R> {
    name: String,
    state: Mutex<State<R>>,
    stats: CacheStats,
}

impl<R: Send + Sync + 'static> SharedCache<R> {
    /// Create a cache holding at most `capacity` models
    ///
    /// # Panics
    /// If `capacity` is 0.
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(State {
                lru: LruCache::new(capacity),
                in_flight: HashMap::with_hasher(RandomState::new()),
            }),
            stats: CacheStats::new(),
        }
    }

    /// Return the model for `key`, constructing it with `factory` on a miss
    ///
    /// Concurrent callers for the same missing key share one construction.
    /// A failed construction leaves nothing behind, so the next call retries.
    pub fn get_or_construct<F>(&self, key: &CacheKey, factory: &F) -> Result<Arc<R>>
    where
        F: ModelFactory<Resource = R> + ?Sized,
    {
        let flight = match self.lookup(key) {
            Lookup::Hit(resource) => return Ok(resource),
            Lookup::Follow(flight) => {
                debug!(cache = %self.name, %key, "waiting on construction in flight");
                return flight.wait();
            }
            Lookup::Lead(flight) => flight,
        };

        let outcome = self.construct(key, factory);

        // Dropped after the lock is released; the last reference to an
        // evicted model may run an expensive teardown.
        let evicted = {
            let mut state = self.state.lock();
            let evicted = match &outcome {
                Ok(resource) => {
                    self.stats.record_insert();
                    state.lru.put(key.clone(), Arc::clone(resource))
                }
                Err(_) => None,
            };
            state.in_flight.remove(key);
            evicted
        };

        if let Some((evicted_key, _)) = &evicted {
            self.stats.record_eviction();
            info!(cache = %self.name, evicted = %evicted_key, "evicted model");
        }
        drop(evicted);

        flight.complete(outcome.clone());
        outcome
    }

    fn lookup(&self, key: &CacheKey) -> Lookup<R> {
        let mut state = self.state.lock();

        if state.lru.contains(key) {
            if let Ok(resource) = state.lru.get(key) {
                self.stats.record_hit();
                debug!(cache = %self.name, %key, "cache hit");
                return Lookup::Hit(Arc::clone(resource));
            }
        }

        if let Some(flight) = state.in_flight.get(key) {
            self.stats.record_coalesced();
            return Lookup::Follow(Arc::clone(flight));
        }

        self.stats.record_miss();
        let flight = Arc::new(Flight::new());
        state.in_flight.insert(key.clone(), Arc::clone(&flight));
        Lookup::Lead(flight)
    }

    fn construct<F>(&self, key: &CacheKey, factory: &F) -> Outcome<R>
    where
        F: ModelFactory<Resource = R> + ?Sized,
    {
        info!(cache = %self.name, %key, "constructing model");
        self.stats.record_construction();
        let started = Instant::now();

        let result = match panic::catch_unwind(AssertUnwindSafe(|| factory.construct())) {
            Ok(result) => result,
            Err(_) => Err(modelstore::Error::Construction("factory panicked".to_string())),
        };

        match result {
            Ok(resource) => {
                info!(
                    cache = %self.name,
                    %key,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "constructed model"
                );
                Ok(Arc::new(resource))
            }
            Err(e) => {
                self.stats.record_failure();
                warn!(cache = %self.name, %key, error = %e, "model construction failed");
                Err(Error::ConstructionFailure {
                    key: key.clone(),
                    source: Arc::new(e),
                })
            }
        }
    }

    /// Drop the cached model for `key`, if any
    ///
    /// A construction already in flight for `key` is not cancelled and will
    /// still insert its result.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        let removed = self.state.lock().lru.remove(key);
        if removed.is_some() {
            info!(cache = %self.name, %key, "invalidated model");
        }
        removed.is_some()
    }

    /// True if `key` is cached. Does not count as an access.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.state.lock().lru.contains(key)
    }

    /// Keys currently cached, sorted
    pub fn cached_keys(&self) -> Vec<CacheKey> {
        let mut keys: Vec<_> = self.state.lock().lru.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of models currently cached
    pub fn len(&self) -> usize {
        self.state.lock().lru.len()
    }

    /// True if nothing is cached
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of cached models
    pub fn capacity(&self) -> usize {
        self.state.lock().lru.capacity()
    }

    /// Cache name, used in logs and stats
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get cache statistics
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}
