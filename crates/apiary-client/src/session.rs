//! Session store
//!
//! Sole owner of the bearer credential pair and the remembered login
//! name. Persistence sits behind a storage trait: the file
//! implementation keeps one JSON state file per install, the in-memory
//! one backs tests. There is no local expiry tracking; a 401 from any
//! authenticated call clears the store reactively.

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

/// Durable session state as written to storage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub remembered_username: Option<String>,
}

/// Storage backend for the session state
pub trait SessionStorage: Send + Sync {
    /// Read the persisted state, if any
    fn load(&self) -> io::Result<Option<SessionState>>;
    /// Overwrite the persisted state
    fn save(&self, state: &SessionState) -> io::Result<()>;
}

/// File-backed storage holding one JSON document
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Storage at the given path; the file is created on first save
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SessionStorage for FileStorage {
    fn load(&self) -> io::Result<Option<SessionState>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err),
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
    }

    fn save(&self, state: &SessionState) -> io::Result<()> {
        let raw = serde_json::to_string_pretty(state)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        std::fs::write(&self.path, raw)
    }
}

/// In-memory storage for tests
#[derive(Debug, Default)]
pub struct MemoryStorage {
    state: Mutex<Option<SessionState>>,
}

impl MemoryStorage {
    /// Empty storage
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn load(&self) -> io::Result<Option<SessionState>> {
        Ok(self.state.lock().clone())
    }

    fn save(&self, state: &SessionState) -> io::Result<()> {
        *self.state.lock() = Some(state.clone());
        Ok(())
    }
}

/// Source of truth for "is a user logged in"
pub struct SessionStore {
    storage: Box<dyn SessionStorage>,
    state: RwLock<SessionState>,
}

impl SessionStore {
    /// Open the store, loading any persisted state.
    ///
    /// An unreadable state file starts an empty session rather than
    /// failing the console.
    #[must_use]
    pub fn open(storage: Box<dyn SessionStorage>) -> Arc<Self> {
        let state = match storage.load() {
            Ok(state) => state.unwrap_or_default(),
            Err(err) => {
                tracing::warn!(error = %err, "session state unreadable, starting empty");
                SessionState::default()
            }
        };
        Arc::new(Self {
            storage,
            state: RwLock::new(state),
        })
    }

    /// Record a fresh credential pair
    pub fn set_session(&self, access: impl Into<String>, refresh: impl Into<String>) {
        let mut state = self.state.write();
        state.access_token = Some(access.into());
        state.refresh_token = Some(refresh.into());
        self.persist(&state);
    }

    /// Drop the credential pair.
    ///
    /// The remembered username survives; only the tokens are session
    /// scoped. Safe to call repeatedly.
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.access_token = None;
        state.refresh_token = None;
        self.persist(&state);
    }

    /// Current bearer token, if a session is live
    #[inline]
    #[must_use]
    pub fn current_token(&self) -> Option<String> {
        self.state.read().access_token.clone()
    }

    /// Current refresh token, if a session is live
    #[inline]
    #[must_use]
    pub fn refresh_token(&self) -> Option<String> {
        self.state.read().refresh_token.clone()
    }

    /// Store or forget the login name shown on the entry form
    pub fn remember_username(&self, username: Option<&str>) {
        let mut state = self.state.write();
        state.remembered_username = username.map(str::to_string);
        self.persist(&state);
    }

    /// The remembered login name, if any
    #[inline]
    #[must_use]
    pub fn remembered_username(&self) -> Option<String> {
        self.state.read().remembered_username.clone()
    }

    /// Whether a bearer token is present
    #[inline]
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.read().access_token.is_some()
    }

    fn persist(&self, state: &SessionState) {
        if let Err(err) = self.storage.save(state) {
            tracing::warn!(error = %err, "failed to persist session state");
        }
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}
