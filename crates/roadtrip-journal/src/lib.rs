//! Road Trip Journal - Client Data Layer
//!
//! This is the application crate that sits between the UI screens and the mock
//! backend from `roadtrip-lib`. The UI only ever talks to it through:
//!
//! - query hooks ([`DataClient`] methods returning a [`Query`]), which are keyed,
//!   cached, deduplicated and refetched after invalidation;
//! - mutation hooks (returning a [`Mutation`]), which write to the backend and
//!   invalidate the dependent query keys;
//! - the client state stores ([`SessionStore`], [`MapSelectionStore`],
//!   [`ToastStore`], [`ThemeStore`]).

mod app;

pub use app::JournalApp;
pub use app::auth::{AuthService, AuthSession, TOKEN_KEY, USER_ID_KEY};
pub use app::cache::{
    CacheConfig, KeyFilter, Mutation, MutationState, MutationStatus, Query, QueryCache,
    QueryKey, QueryOptions, QueryState, QueryStatus, Resource,
};
pub use app::hooks::{DataClient, NewImage, ROADTRIPS_STALE_TIME};
pub use app::map::{
    MapRoute, SELECTED_ROUTE_COLOR, UNSELECTED_ROUTE_COLOR, map_routes, overview_region,
};
pub use app::settings::{COLOR_SCHEME_ENV, Settings};
pub use app::state::{
    MapSelection, MapSelectionStore, SessionState, SessionStore, Store, ThemeMode, ThemeStore,
    ToastKind, ToastState, ToastStore, TOAST_DURATION,
};
pub use app::storage::{
    FileSecureStore, MemorySecureStore, SecureStore, StorageError, StorageResult,
};

use roadtrip_lib::DataError;

/// Errors surfaced to the UI by queries, mutations and stores
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum JournalError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Background task failed: {0}")]
    TaskFailed(String),
}

impl JournalError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Data(e) if e.is_not_found())
    }
}

pub type JournalResult<T> = Result<T, JournalError>;
