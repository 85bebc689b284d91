//! Session Storage
//!
//! This module keeps the live session in memory and mirrors it to the
//! platform's secure storage so the session survives restarts.
//!
//! ## Design
//!
//! The in-memory copy (`RwLock<Option<Session>>`) is the source of truth
//! while the process runs: reads are synchronous and never block on IO, so
//! `is_authenticated()` can be called from anywhere. Writes go through to the
//! secure store as a single serialized secret, so both tokens and the profile
//! are overwritten atomically and no reader can observe a half-updated pair.
//!
//! Persistence is best-effort. A secure store that is unavailable or holds
//! corrupted data degrades to "no stored session"; it never turns a working
//! in-memory session into an error.
//!
//! ## Security
//!
//! - Token values are never logged
//! - Corrupted persisted data is deleted, not surfaced
//! - `clear()` removes the persisted secret as well as the cached copy

use crate::types::{Session, SessionTokens, UserProfile};
use bridge_traits::storage::SecureStore;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// Key under which the serialized session lives in the secure store.
pub const SESSION_STORAGE_KEY: &str = "portal_session";

/// In-memory session state with secure write-through persistence.
#[derive(Clone)]
pub struct SessionStore {
    current: Arc<RwLock<Option<Session>>>,
    secure_store: Arc<dyn SecureStore>,
}

impl SessionStore {
    /// Create a new, empty session store.
    ///
    /// Call [`hydrate`](Self::hydrate) afterwards to load any session
    /// persisted by a previous run.
    pub fn new(secure_store: Arc<dyn SecureStore>) -> Self {
        debug!("Initializing SessionStore");
        Self {
            current: Arc::new(RwLock::new(None)),
            secure_store,
        }
    }

    /// Load the persisted session into memory, if one exists.
    ///
    /// Any failure (storage unavailable, corrupted payload) leaves the store
    /// empty and the user signed out; corrupted data is deleted so the next
    /// start does not trip over it again.
    pub async fn hydrate(&self) {
        let data = match self.secure_store.get_secret(SESSION_STORAGE_KEY).await {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, "Secure storage unavailable, starting signed out");
                return;
            }
        };

        let Some(data) = data else {
            debug!("No persisted session found");
            return;
        };

        let session: Session = match serde_json::from_slice(&data) {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Persisted session is corrupted, discarding");
                if let Err(delete_err) = self.secure_store.delete_secret(SESSION_STORAGE_KEY).await
                {
                    warn!(error = %delete_err, "Failed to delete corrupted session data");
                }
                return;
            }
        };

        info!(user_id = %session.user.id, "Session restored from secure storage");
        self.set_current(Some(session));
    }

    /// Replace the session, overwriting whatever was there.
    ///
    /// The in-memory copy is updated first so callers observe the new
    /// credentials immediately; persistence failures are logged but do not
    /// fail the operation.
    pub async fn save(&self, session: Session) {
        self.set_current(Some(session.clone()));

        match serde_json::to_vec(&session) {
            Ok(json) => {
                if let Err(e) = self.secure_store.set_secret(SESSION_STORAGE_KEY, &json).await {
                    warn!(error = %e, "Failed to persist session, it will not survive restart");
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to serialize session for persistence");
            }
        }

        debug!("Session saved");
    }

    /// Remove the session from memory and from persistent storage.
    ///
    /// Idempotent; clearing an empty store succeeds.
    pub async fn clear(&self) {
        self.set_current(None);

        if let Err(e) = self.secure_store.delete_secret(SESSION_STORAGE_KEY).await {
            warn!(error = %e, "Failed to delete persisted session");
        }

        info!("Session cleared");
    }

    /// Current credential pair, if any. Synchronous and never blocks on IO.
    pub fn tokens(&self) -> Option<SessionTokens> {
        self.read_current().map(|s| s.tokens)
    }

    /// Current full session, if any.
    pub fn session(&self) -> Option<Session> {
        self.read_current()
    }

    /// Cached profile of the signed-in user, if any.
    pub fn user(&self) -> Option<UserProfile> {
        self.read_current().map(|s| s.user)
    }

    /// Whether a credential pair is present. Says nothing about validity;
    /// the server decides that on the next request.
    pub fn is_authenticated(&self) -> bool {
        self.read_current().is_some()
    }

    fn read_current(&self) -> Option<Session> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set_current(&self, session: Option<Session>) {
        match self.current.write() {
            Ok(mut guard) => *guard = session,
            Err(poisoned) => *poisoned.into_inner() = session,
        }
    }
}
