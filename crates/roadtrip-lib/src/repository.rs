//! Generic in-memory repository simulating a remote CRUD datastore
//!
//! One `Repository<T>` exists per resource type. All operations share the same
//! semantics regardless of the entity:
//!
//! - Reads of a specific id fail with [`DataError::NotFound`] when it is missing.
//! - Deletes never fail for a missing id; they report whether a record was removed.
//! - Creates append without checking id uniqueness or touching parent records.
//!
//! Each call sleeps for the configured mock latency before touching the data,
//! then consults the injected [`FailureMode`].

use crate::{DataError, EntityKind, FailureMode, MockLatency, Operation, Result};
use std::sync::{Mutex, PoisonError};
use tokio::sync::RwLock;

/// A record stored in a repository
pub trait Entity: Clone + Send + Sync + 'static {
    const KIND: EntityKind;

    fn id(&self) -> &str;
}

/// A record owned by a parent through a foreign key
pub trait Child: Entity {
    fn parent_id(&self) -> &str;

    /// Order siblings returned by [`Repository::get_by_parent_id`].
    ///
    /// Defaults to insertion order.
    fn sort_siblings(_siblings: &mut [Self]) {}
}

/// In-memory collection with simulated latency and failures
pub struct Repository<T: Entity> {
    records: RwLock<Vec<T>>,
    latency: MockLatency,
    failure_mode: Mutex<FailureMode>,
}

impl<T: Entity> Repository<T> {
    /// Create a repository seeded with an initial snapshot
    pub fn new(seed: Vec<T>, latency: MockLatency) -> Self {
        Self {
            records: RwLock::new(seed),
            latency,
            failure_mode: Mutex::new(FailureMode::Never),
        }
    }

    pub fn latency(&self) -> MockLatency {
        self.latency
    }

    pub fn failure_mode(&self) -> FailureMode {
        *self
            .failure_mode
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_failure_mode(&self, mode: FailureMode) {
        *self
            .failure_mode
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = mode;
    }

    /// Simulate the round-trip for an operation
    pub(crate) async fn round_trip(&self, operation: Operation) -> Result<()> {
        self.latency.sleep(operation).await;
        self.check_failure(operation)
    }

    /// Consult the injected failure mode without any latency
    pub(crate) fn check_failure(&self, operation: Operation) -> Result<()> {
        let result = self.failure_mode().check();
        if result.is_err() {
            tracing::debug!("Injected failure for {} {:?}", T::KIND, operation);
        }
        result
    }

    /// Return the whole collection as currently held
    pub async fn get_all(&self) -> Result<Vec<T>> {
        self.round_trip(Operation::List).await?;
        Ok(self.records.read().await.clone())
    }

    /// Return the record with the given id
    pub async fn get_by_id(&self, id: &str) -> Result<T> {
        self.round_trip(Operation::Get).await?;
        self.records
            .read()
            .await
            .iter()
            .find(|r| r.id() == id)
            .cloned()
            .ok_or_else(|| DataError::not_found(T::KIND, id))
    }

    /// Return the first record matching a predicate, if any
    pub async fn find<P>(&self, predicate: P) -> Result<Option<T>>
    where
        P: Fn(&T) -> bool,
    {
        self.round_trip(Operation::Get).await?;
        Ok(self.records.read().await.iter().find(|r| predicate(r)).cloned())
    }

    /// Return every record matching a predicate, in storage order
    pub async fn filter<P>(&self, predicate: P) -> Result<Vec<T>>
    where
        P: Fn(&T) -> bool,
    {
        self.round_trip(Operation::List).await?;
        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|r| predicate(r))
            .cloned()
            .collect())
    }

    /// Append a record. Id uniqueness is the caller's responsibility.
    pub async fn create(&self, entity: T) -> Result<T> {
        self.round_trip(Operation::Create).await?;
        self.records.write().await.push(entity.clone());
        tracing::debug!("Created {} {}", T::KIND, entity.id());
        Ok(entity)
    }

    /// Modify a record in place and return the updated copy
    pub async fn update<F>(&self, id: &str, modify: F) -> Result<T>
    where
        F: FnOnce(&mut T),
    {
        self.round_trip(Operation::Update).await?;
        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or_else(|| DataError::not_found(T::KIND, id))?;
        modify(record);
        Ok(record.clone())
    }

    /// Remove every record with the given id.
    ///
    /// Returns `false` when nothing matched; a missing id is not an error.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        Ok(!self.delete_where(|r| r.id() == id).await?.is_empty())
    }

    /// Remove every record matching a predicate and return the removed records
    pub async fn delete_where<P>(&self, predicate: P) -> Result<Vec<T>>
    where
        P: Fn(&T) -> bool,
    {
        self.round_trip(Operation::Delete).await?;
        Ok(self.remove_where(predicate).await)
    }

    /// Remove matching records with no latency and no failure roll.
    ///
    /// Used by cascades once every repository involved has been checked.
    pub(crate) async fn remove_where<P>(&self, predicate: P) -> Vec<T>
    where
        P: Fn(&T) -> bool,
    {
        let mut records = self.records.write().await;
        let (removed, kept): (Vec<T>, Vec<T>) = records.drain(..).partition(|r| predicate(r));
        *records = kept;
        if !removed.is_empty() {
            tracing::debug!("Deleted {} {} record(s)", removed.len(), T::KIND);
        }
        removed
    }

    /// Number of records currently held, without simulated latency
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl<T: Child> Repository<T> {
    /// Return the children of a parent, ordered by [`Child::sort_siblings`]
    pub async fn get_by_parent_id(&self, parent_id: &str) -> Result<Vec<T>> {
        let mut children = self.filter(|r| r.parent_id() == parent_id).await?;
        T::sort_siblings(&mut children);
        Ok(children)
    }
}
