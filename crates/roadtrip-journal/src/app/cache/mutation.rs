//! Mutations: backend writes followed by query invalidation

use super::{KeyFilter, QueryCache};
use crate::{JournalError, JournalResult};
use futures::FutureExt;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MutationStatus {
    #[default]
    Idle,
    Pending,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MutationState<O> {
    pub status: MutationStatus,
    /// Output of the last successful run
    pub data: Option<O>,
    pub error: Option<JournalError>,
}

impl<O> Default for MutationState<O> {
    fn default() -> Self {
        Self {
            status: MutationStatus::Idle,
            data: None,
            error: None,
        }
    }
}

impl<O> MutationState<O> {
    pub fn is_pending(&self) -> bool {
        self.status == MutationStatus::Pending
    }

    pub fn is_success(&self) -> bool {
        self.status == MutationStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == MutationStatus::Error
    }
}

type Run<I, O> = Arc<dyn Fn(I) -> BoxFuture<'static, JournalResult<O>> + Send + Sync>;
type Invalidates<O> = Arc<dyn Fn(&O) -> Vec<KeyFilter> + Send + Sync>;

/// A write operation bound to the cache.
///
/// On success every filter returned by the invalidation rule is applied, so
/// observed queries refetch in the background. Failures leave the cache
/// untouched and are both returned and recorded in the state.
pub struct Mutation<I, O> {
    cache: QueryCache,
    run: Run<I, O>,
    invalidates: Invalidates<O>,
    state: Arc<watch::Sender<MutationState<O>>>,
}

impl<I, O> Clone for Mutation<I, O> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            run: self.run.clone(),
            invalidates: self.invalidates.clone(),
            state: self.state.clone(),
        }
    }
}

impl<I, O> Mutation<I, O>
where
    I: Send + 'static,
    O: Clone + Send + Sync + 'static,
{
    pub fn new<F, Fut, V>(cache: QueryCache, run: F, invalidates: V) -> Self
    where
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = JournalResult<O>> + Send + 'static,
        V: Fn(&O) -> Vec<KeyFilter> + Send + Sync + 'static,
    {
        let (state, _) = watch::channel(MutationState::default());
        Self {
            cache,
            run: Arc::new(move |input| run(input).boxed()),
            invalidates: Arc::new(invalidates),
            state: Arc::new(state),
        }
    }

    pub async fn mutate(&self, input: I) -> JournalResult<O> {
        self.state.send_modify(|state| {
            state.status = MutationStatus::Pending;
            state.error = None;
        });

        match (self.run)(input).await {
            Ok(output) => {
                for filter in (self.invalidates)(&output) {
                    self.cache.invalidate(&filter);
                }
                self.state.send_replace(MutationState {
                    status: MutationStatus::Success,
                    data: Some(output.clone()),
                    error: None,
                });
                Ok(output)
            }
            Err(e) => {
                tracing::debug!("Mutation failed: {}", e);
                self.state.send_modify(|state| {
                    state.status = MutationStatus::Error;
                    state.error = Some(e.clone());
                });
                Err(e)
            }
        }
    }

    pub fn state(&self) -> MutationState<O> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<MutationState<O>> {
        self.state.subscribe()
    }

    /// Back to idle, dropping the last output and error
    pub fn reset(&self) {
        self.state.send_replace(MutationState::default());
    }
}
