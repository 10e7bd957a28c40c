//! # Session Context
//!
//! Owns the bearer token and the session derived from it, mirrors both to
//! durable storage, and announces every transition.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Session Lifecycle                                │
//! │                                                                         │
//! │  startup ──► check_auth() ──► stored token? ──no──► LoggedOut          │
//! │                                    │                                    │
//! │                                   yes ── exp passed? ──yes──► LoggedOut │
//! │                                    │                                    │
//! │                                    ▼                                    │
//! │                              Authenticated ◄──── establish(token)      │
//! │                                    │              (after POST /login)   │
//! │                 ┌──────────────────┼───────────────────┐               │
//! │                 ▼                                      ▼               │
//! │            logout()                          401 from any endpoint     │
//! │           LoggedOut                          expire() → Expired        │
//! │                                                                         │
//! │  Every transition clears or writes the store, then publishes an        │
//! │  AuthState on the watch channel. The UI navigates to login on          │
//! │  LoggedOut and Expired.                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Durable Storage
//! Two keys, `token` (opaque bearer string) and `user` (the derived
//! session). Nothing else is persisted.

use jsonwebtoken::{DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use tienda_core::{Session, TokenClaims};

use crate::error::{ClientError, ClientResult};

// =============================================================================
// Auth Events
// =============================================================================

/// Published on every session transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AuthState {
    LoggedOut,
    Authenticated { username: String },
    /// The API answered 401 and the session was dropped.
    Expired,
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated { .. })
    }
}

// =============================================================================
// Durable Store
// =============================================================================

/// What survives a restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub token: String,
    pub user: Session,
}

/// Durable client-side key-value storage for the session.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> ClientResult<Option<StoredSession>>;
    fn save(&self, session: &StoredSession) -> ClientResult<()>;
    fn clear(&self) -> ClientResult<()>;
}

/// JSON file holding `{ "token": ..., "user": ... }`.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSessionStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> ClientResult<Option<StoredSession>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)?;
        let stored = serde_json::from_str(&contents)
            .map_err(|e| ClientError::Storage(format!("corrupt session file: {}", e)))?;
        Ok(Some(stored))
    }

    fn save(&self, session: &StoredSession) -> ClientResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(session)
            .map_err(|e| ClientError::Storage(e.to_string()))?;
        write_owner_only(&self.path, &contents)?;
        debug!(path = ?self.path, "Session written");
        Ok(())
    }

    fn clear(&self) -> ClientResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Writes `contents` to `path`, readable only by the owner on Unix.
///
/// Permissions are narrowed before the token is written, including on a
/// file left behind by an older version.
fn write_owner_only(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(contents.as_bytes())
}

/// Process-local store for tests and embedders that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    inner: Mutex<Option<StoredSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<StoredSession>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> ClientResult<Option<StoredSession>> {
        Ok(self.slot().clone())
    }

    fn save(&self, session: &StoredSession) -> ClientResult<()> {
        *self.slot() = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> ClientResult<()> {
        *self.slot() = None;
        Ok(())
    }
}

// =============================================================================
// Session Context
// =============================================================================

/// The single owner of "who is logged in".
///
/// Shared behind an `Arc` by the API client, the services and the
/// composers. Readers never mutate it; only login, logout and the 401
/// policy do.
pub struct SessionContext {
    store: Arc<dyn SessionStore>,
    current: RwLock<Option<StoredSession>>,
    events: watch::Sender<AuthState>,
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("state", &*self.events.borrow())
            .finish()
    }
}

impl SessionContext {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        let (events, _) = watch::channel(AuthState::LoggedOut);
        SessionContext {
            store,
            current: RwLock::new(None),
            events,
        }
    }

    /// Context backed by a [`MemorySessionStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySessionStore::new()))
    }

    /// Context backed by a [`FileSessionStore`] at `path`.
    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileSessionStore::new(path)))
    }

    /// Receives every later transition; the current state is readable
    /// immediately with `borrow()`.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.events.subscribe()
    }

    pub fn state(&self) -> AuthState {
        self.events.borrow().clone()
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Adopts a freshly issued bearer token.
    ///
    /// The session comes from the token's claims. The token is decoded
    /// without signature verification; the client holds no key and the
    /// server checks every request anyway.
    pub fn establish(&self, token: &str) -> ClientResult<Session> {
        let claims = decode_claims(token)?;
        let stored = StoredSession {
            token: token.to_string(),
            user: Session::from_claims(claims),
        };

        if let Err(e) = self.store.save(&stored) {
            error!(?e, "Failed to persist session");
            return Err(e);
        }

        let user = stored.user.clone();
        *self.write() = Some(stored);
        info!(username = %user.username, role_id = user.role_id, "Session established");
        self.events.send_replace(AuthState::Authenticated {
            username: user.username.clone(),
        });
        Ok(user)
    }

    /// Clears storage and memory. Always succeeds.
    pub fn logout(&self) {
        self.drop_session();
        info!("Logged out");
        self.events.send_replace(AuthState::LoggedOut);
    }

    /// Forced logout after the API rejected the token.
    pub fn expire(&self) {
        let had_session = self.is_authenticated();
        self.drop_session();
        if had_session {
            warn!("Session rejected by the API, logging out");
        }
        self.events.send_replace(AuthState::Expired);
    }

    /// Re-derives the session from durable storage at startup.
    ///
    /// Never fails: a missing, unreadable or expired session leaves the
    /// context logged out. A token that is not a JWT keeps the stored
    /// user as is.
    pub fn check_auth(&self) -> bool {
        let stored = match self.store.load() {
            Ok(Some(stored)) => stored,
            Ok(None) => {
                debug!("No stored session");
                self.set_logged_out();
                return false;
            }
            Err(e) => {
                warn!(?e, "Discarding unreadable stored session");
                self.drop_session();
                self.set_logged_out();
                return false;
            }
        };

        let user = match decode_claims(&stored.token) {
            Ok(claims) if claims.is_expired_at(chrono::Utc::now().timestamp()) => {
                info!("Stored token has expired");
                self.drop_session();
                self.set_logged_out();
                return false;
            }
            Ok(claims) => Session::from_claims(claims),
            Err(_) => stored.user.clone(),
        };

        let username = user.username.clone();
        *self.write() = Some(StoredSession {
            token: stored.token,
            user,
        });
        debug!(username = %username, "Restored stored session");
        self.events
            .send_replace(AuthState::Authenticated { username });
        true
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn is_authenticated(&self) -> bool {
        self.read().is_some()
    }

    pub fn current(&self) -> Option<Session> {
        self.read().as_ref().map(|s| s.user.clone())
    }

    /// Bearer token attached to outgoing requests.
    pub fn token(&self) -> Option<String> {
        self.read().as_ref().map(|s| s.token.clone())
    }

    /// Admins pass every check; others need the named flag or `all`.
    pub fn has_permission(&self, name: &str) -> bool {
        tienda_core::has_permission(self.read().as_ref().map(|s| &s.user), name)
    }

    /// Runs `f` against the current session without cloning it.
    pub fn with_session<R>(&self, f: impl FnOnce(Option<&Session>) -> R) -> R {
        f(self.read().as_ref().map(|s| &s.user))
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn drop_session(&self) {
        if let Err(e) = self.store.clear() {
            error!(?e, "Failed to clear stored session");
        }
        *self.write() = None;
    }

    fn set_logged_out(&self) {
        self.events.send_replace(AuthState::LoggedOut);
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Option<StoredSession>> {
        self.current.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<StoredSession>> {
        self.current.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Reads the claims of a bearer token without checking its signature.
pub fn decode_claims(token: &str) -> ClientResult<TokenClaims> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    jsonwebtoken::decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| ClientError::Decode(format!("bearer token: {}", e)))
}
