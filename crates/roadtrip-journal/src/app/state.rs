//! Client state stores
//!
//! Small observable containers for state that lives outside the query cache:
//! the auth session, the map selection, the toast and the theme. Each store
//! wraps a [`Store`] (a watch channel) so screens can read a snapshot or await
//! changes.

use crate::app::auth::AuthService;
use crate::{JournalError, JournalResult};
use journal_entrypoints::async_runtime;
use roadtrip_lib::User;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;

/// How long a toast stays visible
pub const TOAST_DURATION: Duration = Duration::from_millis(4000);

/// Observable value shared by every clone
pub struct Store<S> {
    tx: Arc<watch::Sender<S>>,
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<S: Clone + Send + Sync> Store<S> {
    pub fn new(initial: S) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn get(&self) -> S {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.tx.subscribe()
    }

    pub fn set(&self, value: S) {
        self.tx.send_replace(value);
    }

    pub fn update(&self, modify: impl FnOnce(&mut S)) {
        self.tx.send_modify(modify);
    }
}

impl<S: Clone + Send + Sync + Default> Default for Store<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

// ----------------------------------------------------------------------------
// Session
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub user: Option<User>,
    pub is_authenticated: bool,
    /// True until the first session check finishes, and during login
    pub is_loading: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            user: None,
            is_authenticated: false,
            is_loading: true,
        }
    }
}

/// Auth session state, driven by [`AuthService`]
#[derive(Clone)]
pub struct SessionStore {
    auth: Arc<AuthService>,
    store: Store<SessionState>,
}

impl SessionStore {
    pub fn new(auth: Arc<AuthService>) -> Self {
        Self {
            auth,
            store: Store::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.store.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.store.subscribe()
    }

    pub fn user(&self) -> Option<User> {
        self.store.get().user
    }

    pub async fn login(&self, email: &str) -> JournalResult<()> {
        self.store.update(|s| s.is_loading = true);
        match self.auth.login(email).await {
            Ok(session) => {
                self.store.set(SessionState {
                    user: Some(session.user),
                    is_authenticated: true,
                    is_loading: false,
                });
                Ok(())
            }
            Err(e) => {
                self.store.update(|s| s.is_loading = false);
                Err(e)
            }
        }
    }

    pub async fn logout(&self) {
        self.auth.logout().await;
        self.store.update(|s| {
            s.user = None;
            s.is_authenticated = false;
        });
    }

    /// Restore a persisted session. Never fails: a broken session logs out.
    pub async fn check_auth(&self) {
        self.store.update(|s| s.is_loading = true);
        let user = self.auth.restore_session().await;
        self.store.set(SessionState {
            is_authenticated: user.is_some(),
            user,
            is_loading: false,
        });
    }

    pub async fn update_profile(&self, user: User) -> JournalResult<()> {
        self.store.update(|s| s.is_loading = true);
        match self.auth.update_profile(user).await {
            Ok(user) => {
                self.store.update(|s| {
                    s.user = Some(user);
                    s.is_loading = false;
                });
                Ok(())
            }
            Err(e) => {
                self.store.update(|s| s.is_loading = false);
                Err(e)
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Map selection
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapSelection {
    pub selected_roadtrip_id: Option<String>,
    pub selected_point_id: Option<String>,
}

#[derive(Clone, Default)]
pub struct MapSelectionStore {
    store: Store<MapSelection>,
}

impl MapSelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MapSelection {
        self.store.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<MapSelection> {
        self.store.subscribe()
    }

    pub fn select_roadtrip(&self, id: Option<String>) {
        self.store.update(|s| s.selected_roadtrip_id = id);
    }

    pub fn select_point(&self, id: Option<String>) {
        self.store.update(|s| s.selected_point_id = id);
    }

    /// Pressing the empty map clears both selections
    pub fn clear_selection(&self) {
        self.store.set(MapSelection::default());
    }
}

// ----------------------------------------------------------------------------
// Toast
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    #[default]
    Info,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToastState {
    pub message: Option<String>,
    pub kind: ToastKind,
    pub is_visible: bool,
}

/// Single transient notification with an auto-hide timer.
///
/// Showing a new toast replaces the current one and restarts the timer: each
/// show bumps a generation and a timer only hides the toast it was started
/// for.
#[derive(Clone)]
pub struct ToastStore {
    store: Store<ToastState>,
    generation: Arc<AtomicU64>,
    duration: Duration,
}

impl Default for ToastStore {
    fn default() -> Self {
        Self::with_duration(TOAST_DURATION)
    }
}

impl ToastStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duration(duration: Duration) -> Self {
        Self {
            store: Store::default(),
            generation: Arc::new(AtomicU64::new(0)),
            duration,
        }
    }

    pub fn state(&self) -> ToastState {
        self.store.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<ToastState> {
        self.store.subscribe()
    }

    pub fn show_toast(&self, message: impl Into<String>, kind: ToastKind) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.store.set(ToastState {
            message: Some(message.into()),
            kind,
            is_visible: true,
        });

        if async_runtime::in_runtime_context() {
            let toast = self.clone();
            async_runtime::spawn_delayed(self.duration, async move {
                toast.hide_if_current(generation);
            });
        } else {
            tracing::debug!("No async runtime, toast stays until hidden explicitly");
        }
    }

    /// Show a failed operation as an error toast
    pub fn show_error(&self, error: &JournalError) {
        self.show_toast(error.to_string(), ToastKind::Error);
    }

    /// Hide the toast now. The message is kept for fade-out rendering.
    pub fn hide_toast(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.store.update(|s| s.is_visible = false);
    }

    fn hide_if_current(&self, generation: u64) {
        if self.generation.load(Ordering::SeqCst) == generation {
            self.store.update(|s| s.is_visible = false);
        }
    }
}

// ----------------------------------------------------------------------------
// Theme
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

impl ThemeMode {
    /// Initial mode from the platform color scheme; anything but "dark" is light
    pub fn from_color_scheme(scheme: Option<&str>) -> Self {
        scheme
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    pub fn is_dark(self) -> bool {
        self == Self::Dark
    }
}

impl FromStr for ThemeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(format!("unknown color scheme: {other}")),
        }
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Light => "light",
            Self::Dark => "dark",
        })
    }
}

#[derive(Clone, Default)]
pub struct ThemeStore {
    store: Store<ThemeMode>,
}

impl ThemeStore {
    pub fn new(mode: ThemeMode) -> Self {
        Self {
            store: Store::new(mode),
        }
    }

    pub fn mode(&self) -> ThemeMode {
        self.store.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<ThemeMode> {
        self.store.subscribe()
    }

    pub fn toggle(&self) {
        self.store.update(|mode| *mode = mode.toggled());
    }

    pub fn set_mode(&self, mode: ThemeMode) {
        self.store.set(mode);
    }
}
