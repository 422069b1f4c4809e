//! Road Trip Library - Core Data Layer for the Road Trip Journal
//!
//! This library holds everything below the client cache: the domain models, the
//! geodesic distance kernel used for trip statistics and map viewports, and an
//! in-memory mock backend that stands in for a remote datastore.
//!
//! # Architecture
//!
//! - **[`geodesy`]**: Haversine distances, route totals and map region sizing
//! - **[`Repository`]**: Generic in-memory collection with simulated latency
//! - **[`MockBackend`]**: One repository per resource plus the typed service queries
//! - **[`Fixtures`]**: Static seed data loaded once per backend instance
//!
//! Every backend is an explicit value: tests construct their own instance and
//! never share mutable state with each other.

mod backend;
mod fixtures;
pub mod geodesy;
mod mock;
mod models;
mod repository;

// Public API exports
pub use backend::{CascadeReport, MockBackend};
pub use fixtures::Fixtures;
pub use mock::{FailureMode, MockLatency, Operation, generate_id};
pub use models::{
    Article, EntityKind, Gallery, Image, LatLng, Point, PointType, Roadtrip, RoadtripStats, User,
    UserStats,
};
pub use repository::{Child, Entity, Repository};

/// Error types for the data module
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Network error simulated")]
    SimulatedFailure,

    #[error("Fixture error: {0}")]
    Fixture(String),
}

impl DataError {
    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Whether this error is the NotFound condition for any resource
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
