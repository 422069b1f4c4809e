//! Typed query handles over the erased cache entries

use super::{ErasedState, QueryCache, QueryKey};
use crate::{JournalError, JournalResult};
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryStatus {
    /// Disabled: the query will not fetch until its key is complete
    #[default]
    Idle,
    /// No result yet
    Pending,
    Success,
    /// The latest fetch failed. Earlier data, if any, is kept
    Error,
}

/// Per-query options
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryOptions {
    pub enabled: bool,
    /// Overrides [`super::CacheConfig::stale_time`] for this key
    pub stale_time: Option<Duration>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            stale_time: None,
        }
    }
}

impl QueryOptions {
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = Some(stale_time);
        self
    }
}

/// Snapshot of a query as seen by its subscribers
#[derive(Debug)]
pub struct QueryState<T> {
    pub data: Option<Arc<T>>,
    pub error: Option<JournalError>,
    pub status: QueryStatus,
    /// A fetch is running, either the first one or a background refetch
    pub is_fetching: bool,
    /// The data was invalidated and a newer version is expected
    pub is_invalidated: bool,
}

impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            error: self.error.clone(),
            status: self.status,
            is_fetching: self.is_fetching,
            is_invalidated: self.is_invalidated,
        }
    }
}

impl<T: Send + Sync + 'static> QueryState<T> {
    pub fn idle() -> Self {
        Self {
            data: None,
            error: None,
            status: QueryStatus::Idle,
            is_fetching: false,
            is_invalidated: false,
        }
    }

    pub(super) fn from_erased(state: &ErasedState) -> Self {
        Self {
            data: state
                .data
                .clone()
                .and_then(|data| data.downcast::<T>().ok()),
            error: state.error.clone(),
            status: state.status,
            is_fetching: state.is_fetching,
            is_invalidated: state.is_invalidated,
        }
    }

    /// First fetch in progress, nothing to show yet
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Pending && self.is_fetching
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    /// Background refetch over data that is still displayed
    pub fn is_refetching(&self) -> bool {
        self.is_fetching && self.data.is_some()
    }
}

/// A subscription to one cached query.
///
/// Holding the handle keeps the key "observed": invalidating it triggers a
/// background refetch. Dropping the handle ends the subscription; the cached
/// data stays and is reused by the next subscriber.
pub struct Query<T> {
    key: QueryKey,
    cache: QueryCache,
    receiver: Option<watch::Receiver<ErasedState>>,
    _data: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> Query<T> {
    pub(super) fn new(
        key: QueryKey,
        cache: QueryCache,
        receiver: Option<watch::Receiver<ErasedState>>,
    ) -> Self {
        Self {
            key,
            cache,
            receiver,
            _data: PhantomData,
        }
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn is_enabled(&self) -> bool {
        self.receiver.is_some()
    }

    pub fn state(&self) -> QueryState<T> {
        match &self.receiver {
            Some(receiver) => QueryState::from_erased(&receiver.borrow()),
            None => QueryState::idle(),
        }
    }

    pub fn data(&self) -> Option<Arc<T>> {
        self.state().data
    }

    /// Wait for the next state change. Returns false for disabled queries
    /// and when the entry was removed from the cache.
    pub async fn changed(&mut self) -> bool {
        match self.receiver.as_mut() {
            Some(receiver) => receiver.changed().await.is_ok(),
            None => false,
        }
    }

    /// Wait until no fetch is running and return the resulting state
    pub async fn settled(&mut self) -> QueryState<T> {
        let Some(receiver) = self.receiver.as_mut() else {
            return QueryState::idle();
        };
        let settled = receiver
            .wait_for(|state| !state.is_fetching)
            .await
            .ok()
            .map(|state| QueryState::from_erased(&state));
        settled.unwrap_or_else(|| self.state())
    }

    /// Fetch again now, joining a fetch that is already running
    pub async fn refetch(&self) -> JournalResult<Arc<T>> {
        self.cache.refetch(&self.key).await
    }
}

impl<T> std::fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("key", &self.key)
            .field("enabled", &self.receiver.is_some())
            .finish()
    }
}
