//! Reactive query cache
//!
//! Every read goes through a [`QueryKey`]. The cache keeps one entry per key
//! holding the last result and a watch channel that publishes state changes to
//! the [`Query`] handles subscribed to it. Concurrent requests for a key share
//! one in-flight fetch, and every fetch gets a generation number so a fetch
//! superseded by a later one (after an invalidation) is discarded instead of
//! overwriting newer data.
//!
//! Fetches run as spawned tasks: they complete and populate the cache even if
//! the caller that started them stops waiting.
//!
//! Entries nobody observes are dropped once unused for [`CacheConfig::gc_time`].
//! Collection runs whenever a new key enters the cache, or on demand through
//! [`QueryCache::collect_garbage`].

mod key;
mod mutation;
mod query;

pub use key::{KeyFilter, QueryKey, Resource};
pub use mutation::{Mutation, MutationState, MutationStatus};
pub use query::{Query, QueryOptions, QueryState, QueryStatus};

use crate::{JournalError, JournalResult};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use journal_entrypoints::async_runtime;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Upper bound for the exponential retry back-off
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

type AnyData = Arc<dyn Any + Send + Sync>;
type FetchResult = JournalResult<AnyData>;
type Fetcher = Arc<dyn Fn() -> BoxFuture<'static, FetchResult> + Send + Sync>;
type InFlight = Shared<BoxFuture<'static, FetchResult>>;

#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Retries after a failed fetch. Not-found errors are never retried
    pub retry: u32,
    /// Delay before the first retry, doubled for each following one
    pub retry_delay: Duration,
    /// How long fetched data is served without refetching on subscribe
    pub stale_time: Duration,
    /// How long an unobserved entry is kept before it is collected
    pub gc_time: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            retry: 3,
            retry_delay: Duration::from_secs(1),
            stale_time: Duration::ZERO,
            gc_time: Duration::from_secs(5 * 60),
        }
    }
}

impl CacheConfig {
    /// No retries, immediate staleness
    pub fn no_retry() -> Self {
        Self {
            retry: 0,
            ..Self::default()
        }
    }

    fn retry_delay(&self, attempt: u32) -> Duration {
        self.retry_delay
            .saturating_mul(1 << attempt.min(16))
            .min(MAX_RETRY_DELAY)
    }
}

/// Type-erased query state, published to subscribers
#[derive(Clone)]
pub(crate) struct ErasedState {
    data: Option<AnyData>,
    error: Option<JournalError>,
    status: QueryStatus,
    is_fetching: bool,
    is_invalidated: bool,
    updated_at: Option<Instant>,
}

impl ErasedState {
    fn pending() -> Self {
        Self {
            data: None,
            error: None,
            status: QueryStatus::Pending,
            is_fetching: false,
            is_invalidated: false,
            updated_at: None,
        }
    }

    fn is_stale(&self, stale_time: Duration) -> bool {
        match self.updated_at {
            Some(updated_at) => self.is_invalidated || updated_at.elapsed() >= stale_time,
            None => true,
        }
    }
}

struct Entry {
    state: watch::Sender<ErasedState>,
    fetcher: Option<Fetcher>,
    in_flight: Option<(u64, InFlight)>,
    stale_time: Duration,
    last_used: Instant,
}

impl Entry {
    fn new(stale_time: Duration) -> Self {
        let (state, _) = watch::channel(ErasedState::pending());
        Self {
            state,
            fetcher: None,
            in_flight: None,
            stale_time,
            last_used: Instant::now(),
        }
    }

    fn is_observed(&self) -> bool {
        self.state.receiver_count() > 0
    }

    fn is_collectable(&self, gc_time: Duration) -> bool {
        !self.is_observed() && self.in_flight.is_none() && self.last_used.elapsed() >= gc_time
    }
}

struct Inner {
    config: CacheConfig,
    entries: Mutex<HashMap<QueryKey, Entry>>,
    generation: AtomicU64,
}

/// Shared handle to the cache; clones refer to the same entries
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<Inner>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

fn erase<T, F, Fut>(fetch: F) -> Fetcher
where
    T: Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = JournalResult<T>> + Send + 'static,
{
    Arc::new(move || {
        let fut = fetch();
        async move { fut.await.map(|data| Arc::new(data) as AnyData) }.boxed()
    })
}

fn downcast<T: Send + Sync + 'static>(key: &QueryKey, data: AnyData) -> JournalResult<Arc<T>> {
    data.downcast::<T>().map_err(|_| {
        JournalError::TaskFailed(format!("cached data for {key} has an unexpected type"))
    })
}

impl QueryCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                entries: Mutex::new(HashMap::new()),
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry>> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribe to `key`, fetching it when it has no fresh data.
    ///
    /// A disabled query (by option or because its key lacks a scoping id)
    /// never touches the cache and stays idle.
    pub fn query<T, F, Fut>(&self, key: QueryKey, options: QueryOptions, fetch: F) -> Query<T>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = JournalResult<T>> + Send + 'static,
    {
        if !options.enabled || !key.is_enabled() {
            tracing::trace!("Query {} disabled", key);
            return Query::new(key, self.clone(), None);
        }

        let stale_time = options.stale_time.unwrap_or(self.inner.config.stale_time);
        let receiver = {
            let mut entries = self.entries();
            if !entries.contains_key(&key) {
                self.collect_locked(&mut entries);
            }
            let entry = entries
                .entry(key.clone())
                .or_insert_with(|| Entry::new(stale_time));
            let fetcher = erase(fetch);
            entry.fetcher = Some(fetcher.clone());
            entry.stale_time = stale_time;
            entry.last_used = Instant::now();

            let receiver = entry.state.subscribe();
            if entry.in_flight.is_none() && entry.state.borrow().is_stale(stale_time) {
                self.start_fetch(&key, entry, fetcher);
            }
            receiver
        };
        Query::new(key, self.clone(), Some(receiver))
    }

    /// Fetch `key` without subscribing. Fresh cached data is returned as is,
    /// a running fetch is joined.
    pub async fn fetch_query<T, F, Fut>(&self, key: QueryKey, fetch: F) -> JournalResult<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = JournalResult<T>> + Send + 'static,
    {
        self.fetch_query_with(key, QueryOptions::default(), fetch)
            .await
    }

    /// [`Self::fetch_query`] with per-key options. A disabled key fails
    /// without fetching.
    pub async fn fetch_query_with<T, F, Fut>(
        &self,
        key: QueryKey,
        options: QueryOptions,
        fetch: F,
    ) -> JournalResult<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = JournalResult<T>> + Send + 'static,
    {
        if !options.enabled || !key.is_enabled() {
            return Err(JournalError::TaskFailed(format!("{key} is disabled")));
        }

        let stale_time = options.stale_time.unwrap_or(self.inner.config.stale_time);
        let in_flight = {
            let mut entries = self.entries();
            if !entries.contains_key(&key) {
                self.collect_locked(&mut entries);
            }
            let entry = entries
                .entry(key.clone())
                .or_insert_with(|| Entry::new(stale_time));
            entry.last_used = Instant::now();
            let fetcher = erase(fetch);
            if entry.fetcher.is_none() {
                entry.fetcher = Some(fetcher.clone());
            }
            if options.stale_time.is_some() {
                entry.stale_time = stale_time;
            }

            match &entry.in_flight {
                Some((_, in_flight)) => in_flight.clone(),
                None => {
                    let state = entry.state.borrow().clone();
                    if !state.is_stale(entry.stale_time)
                        && let Some(data) = state.data
                    {
                        tracing::trace!("Cache hit for {}", key);
                        return downcast(&key, data);
                    }
                    self.start_fetch(&key, entry, fetcher)
                }
            }
        };
        downcast(&key, in_flight.await?)
    }

    /// Fetch an existing entry again with its registered fetcher.
    pub async fn refetch<T: Send + Sync + 'static>(&self, key: &QueryKey) -> JournalResult<Arc<T>> {
        let in_flight = {
            let mut entries = self.entries();
            let Some(entry) = entries.get_mut(key) else {
                return Err(JournalError::TaskFailed(format!("{key} is not cached")));
            };
            match (&entry.in_flight, entry.fetcher.clone()) {
                (Some((_, in_flight)), _) => in_flight.clone(),
                (None, Some(fetcher)) => self.start_fetch(key, entry, fetcher),
                (None, None) => {
                    return Err(JournalError::TaskFailed(format!("{key} has no fetcher")));
                }
            }
        };
        downcast(key, in_flight.await?)
    }

    /// Mark every matching entry stale. Observed entries refetch in the
    /// background while their current data stays visible.
    ///
    /// Returns the number of refetches started.
    pub fn invalidate(&self, filter: &KeyFilter) -> usize {
        let mut entries = self.entries();
        let mut refetching = 0;
        for (key, entry) in entries.iter_mut().filter(|(key, _)| filter.matches(key)) {
            entry.state.send_modify(|state| state.is_invalidated = true);
            if entry.is_observed()
                && let Some(fetcher) = entry.fetcher.clone()
            {
                // Supersedes any running fetch, whose result may predate the write
                self.start_fetch(key, entry, fetcher);
                refetching += 1;
            }
        }
        tracing::debug!("Invalidated {:?}: {} refetch(es) started", filter, refetching);
        refetching
    }

    /// Cached data for `key`, fresh or stale
    pub fn get_data<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<Arc<T>> {
        self.get_state::<T>(key).and_then(|state| state.data)
    }

    pub fn get_state<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<QueryState<T>> {
        self.entries()
            .get(key)
            .map(|entry| QueryState::from_erased(&entry.state.borrow()))
    }

    /// Number of entries with a fetch running
    pub fn fetching_count(&self) -> usize {
        self.entries()
            .values()
            .filter(|entry| entry.in_flight.is_some())
            .count()
    }

    /// Drop every matching entry. Subscribed handles stop receiving updates.
    pub fn remove(&self, filter: &KeyFilter) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|key, _| !filter.matches(key));
        before - entries.len()
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    /// Drop entries that are unobserved, idle and unused for longer than
    /// [`CacheConfig::gc_time`]. Returns the number of entries dropped.
    pub fn collect_garbage(&self) -> usize {
        self.collect_locked(&mut self.entries())
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    fn collect_locked(&self, entries: &mut HashMap<QueryKey, Entry>) -> usize {
        let gc_time = self.inner.config.gc_time;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_collectable(gc_time));
        let collected = before - entries.len();
        if collected > 0 {
            tracing::debug!("Collected {} unused cache entries", collected);
        }
        collected
    }

    fn start_fetch(&self, key: &QueryKey, entry: &mut Entry, fetcher: Fetcher) -> InFlight {
        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed) + 1;
        entry.state.send_modify(|state| state.is_fetching = true);
        tracing::debug!("Fetching {} (generation {})", key, generation);

        let cache = self.clone();
        let task_key = key.clone();
        let handle = async_runtime::spawn(async move {
            let result = match AssertUnwindSafe(cache.run_fetcher(&task_key, &fetcher))
                .catch_unwind()
                .await
            {
                Ok(result) => result,
                Err(_) => Err(JournalError::TaskFailed(format!(
                    "fetch for {task_key} panicked"
                ))),
            };
            cache.complete(&task_key, generation, &result);
            result
        });

        let in_flight = async move {
            handle
                .await
                .unwrap_or_else(|e| Err(JournalError::TaskFailed(e.to_string())))
        }
        .boxed()
        .shared();
        entry.in_flight = Some((generation, in_flight.clone()));
        in_flight
    }

    async fn run_fetcher(&self, key: &QueryKey, fetcher: &Fetcher) -> FetchResult {
        let mut attempt = 0;
        loop {
            match fetcher().await {
                Ok(data) => return Ok(data),
                Err(e) if attempt < self.inner.config.retry && !e.is_not_found() => {
                    let delay = self.inner.config.retry_delay(attempt);
                    attempt += 1;
                    tracing::debug!(
                        "Fetch for {} failed ({}), retry {} in {:?}",
                        key,
                        e,
                        attempt,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn complete(&self, key: &QueryKey, generation: u64, result: &FetchResult) {
        let mut entries = self.entries();
        let Some(entry) = entries.get_mut(key) else {
            tracing::debug!("Dropping result for removed entry {}", key);
            return;
        };
        if !matches!(&entry.in_flight, Some((current, _)) if *current == generation) {
            tracing::debug!("Discarding superseded fetch of {} (generation {})", key, generation);
            return;
        }

        entry.in_flight = None;
        entry.last_used = Instant::now();
        entry.state.send_modify(|state| {
            state.is_fetching = false;
            match result {
                Ok(data) => {
                    state.data = Some(data.clone());
                    state.error = None;
                    state.status = QueryStatus::Success;
                    state.is_invalidated = false;
                    state.updated_at = Some(Instant::now());
                }
                Err(e) => {
                    tracing::warn!("Query {} failed: {}", key, e);
                    state.error = Some(e.clone());
                    state.status = QueryStatus::Error;
                }
            }
        });
    }
}
