//! Application module
//!
//! Wires the data layer together for one process:
//! - the mock backend seeded from the fixtures
//! - the auth service on top of the secure store
//! - the query cache and the hooks that read and write through it
//! - the client state stores

pub(crate) mod auth;
pub(crate) mod cache;
pub(crate) mod hooks;
pub(crate) mod map;
pub(crate) mod settings;
pub(crate) mod state;
pub(crate) mod storage;

use crate::JournalResult;
use crate::app::auth::AuthService;
use crate::app::cache::{CacheConfig, QueryCache};
use crate::app::hooks::DataClient;
use crate::app::settings::Settings;
use crate::app::state::{MapSelectionStore, SessionStore, ThemeMode, ThemeStore, ToastStore};
use crate::app::storage::{FileSecureStore, MemorySecureStore, SecureStore};
use roadtrip_lib::MockBackend;
use std::sync::Arc;

/// Everything a screen needs, shared by cheap clones
#[derive(Clone)]
pub struct JournalApp {
    pub client: DataClient,
    pub session: SessionStore,
    pub map: MapSelectionStore,
    pub toast: ToastStore,
    pub theme: ThemeStore,
}

impl JournalApp {
    pub fn new(settings: &Settings) -> JournalResult<Self> {
        let backend = Arc::new(MockBackend::from_fixtures(settings.latency())?);
        backend.set_failure_mode(settings.failure_mode());

        let storage: Arc<dyn SecureStore> = if settings.memory_storage {
            Arc::new(MemorySecureStore::new())
        } else {
            Arc::new(FileSecureStore::open(settings.storage_file.clone())?)
        };

        let theme = ThemeMode::from_color_scheme(settings.color_scheme().as_deref());
        Ok(Self::with_parts(
            backend,
            storage,
            settings.cache_config(),
            theme,
        ))
    }

    pub fn with_parts(
        backend: Arc<MockBackend>,
        storage: Arc<dyn SecureStore>,
        cache_config: CacheConfig,
        theme: ThemeMode,
    ) -> Self {
        let auth = Arc::new(AuthService::new(backend.clone(), storage));
        Self {
            client: DataClient::new(backend, QueryCache::new(cache_config)),
            session: SessionStore::new(auth),
            map: MapSelectionStore::new(),
            toast: ToastStore::new(),
            theme: ThemeStore::new(theme),
        }
    }

    pub fn backend(&self) -> &Arc<MockBackend> {
        self.client.backend()
    }

    pub fn cache(&self) -> &QueryCache {
        self.client.cache()
    }
}
