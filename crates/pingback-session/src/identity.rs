//! The identity manager: owns the collector-issued session token.
//!
//! The token arrives in the reply to some ping, usually the first, but
//! several pings can be in flight at once and each reply may carry a
//! token. The rule is simple: **the first non-empty token wins**, later
//! ones are dropped without error.
//!
//! # Concurrency note
//!
//! `SessionIdentity` is shared (behind an `Arc`) between the tracker actor
//! and the tasks delivering in-flight pings. Its state sits behind a
//! `std::sync::Mutex` that is only held for the check-and-set, never
//! across an `.await`, so the store and the callback always run unlocked.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::{SessionStore, storage_key};

/// Called with the token the first time one is assigned.
pub type SessionCallback = Box<dyn FnOnce(&str) + Send + 'static>;

struct IdentityState {
    id: Option<String>,
    /// Taken (and thereby consumed) on first assignment.
    on_received: Option<SessionCallback>,
}

/// Holds at most one session token for one video and persists it.
///
/// ## Lifecycle
///
/// ```text
/// new() ──→ initialize() ──→ assign() ... assign()
///              │                │            │
///              ▼                ▼            ▼
///      adopt stored token   first wins   ignored
///      (via assign)         callback +
///                           persist
/// ```
pub struct SessionIdentity<S: SessionStore> {
    key: String,
    store: S,
    state: Mutex<IdentityState>,
}

impl<S: SessionStore> SessionIdentity<S> {
    /// Creates an identity for `video_id` with no token yet.
    ///
    /// The storage key is derived here (see [`storage_key`]); nothing is
    /// read until [`initialize`](Self::initialize).
    pub fn new(video_id: &str, store: S) -> Self {
        Self {
            key: storage_key(video_id),
            store,
            state: Mutex::new(IdentityState {
                id: None,
                on_received: None,
            }),
        }
    }

    /// Registers the callback fired on first assignment.
    pub fn on_received(self, callback: SessionCallback) -> Self {
        self.lock().on_received = Some(callback);
        self
    }

    /// The key this identity reads and writes in the store.
    pub fn storage_key(&self) -> &str {
        &self.key
    }

    /// The assigned token, if any.
    pub fn current(&self) -> Option<String> {
        self.lock().id.clone()
    }

    pub fn is_assigned(&self) -> bool {
        self.lock().id.is_some()
    }

    /// Adopts a previously persisted token, if the store has one.
    ///
    /// A stored token goes through [`assign`](Self::assign) exactly like
    /// one received from the collector, so the callback fires for it too.
    /// Store failures are logged and otherwise ignored.
    ///
    /// Returns the token assigned after the lookup.
    pub async fn initialize(&self) -> Option<String> {
        match self.store.get(&self.key).await {
            Ok(Some(token)) => {
                tracing::debug!(key = %self.key, "restoring persisted session");
                self.assign(&token).await;
            }
            Ok(None) => {
                tracing::debug!(key = %self.key, "no persisted session");
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "session store read failed");
            }
        }
        self.current()
    }

    /// Assigns `id` as the session token if none is set yet.
    ///
    /// Empty ids and ids arriving after the first are ignored. On success
    /// the callback runs (once) and the token is written to the store;
    /// a failed write is logged, not returned.
    ///
    /// Returns `true` if this call assigned the token.
    pub async fn assign(&self, id: &str) -> bool {
        if id.is_empty() {
            return false;
        }

        let callback = {
            let mut state = self.lock();
            if let Some(current) = &state.id {
                if current != id {
                    tracing::debug!(
                        current = %current,
                        ignored = %id,
                        "session already assigned, ignoring new id"
                    );
                }
                return false;
            }
            state.id = Some(id.to_owned());
            state.on_received.take()
        };

        tracing::info!(session_id = %id, "session assigned");

        if let Some(callback) = callback {
            callback(id);
        }

        if let Err(e) = self.store.set(&self.key, id).await {
            tracing::warn!(key = %self.key, error = %e, "session store write failed");
        }
        true
    }

    /// Poisoning only means a callback panicked mid-assignment; the state
    /// itself is still a valid `Option`, so keep using it.
    fn lock(&self) -> MutexGuard<'_, IdentityState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S: SessionStore> std::fmt::Debug for SessionIdentity<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionIdentity")
            .field("key", &self.key)
            .field("id", &self.current())
            .finish()
    }
}

// =========================================================================
// Tests
// =========================================================================
