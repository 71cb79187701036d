//! Persistence hook for session tokens.
//!
//! Pingback doesn't decide where tokens live. A desktop player might use
//! a config file, a test nothing at all. It defines the [`SessionStore`] trait instead: an async get/set
//! over string keys. Every call is best-effort; the identity manager
//! swallows failures.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use sha2::{Digest, Sha256};

use crate::StoreError;

/// Prefix shared by every key Pingback writes.
pub const STORAGE_KEY_PREFIX: &str = "pingback_session_";

/// Number of hex characters of the video-id digest kept in the key.
const KEY_DIGEST_LEN: usize = 16;

/// Derives the storage key for a video.
///
/// The key is [`STORAGE_KEY_PREFIX`] followed by the first 16 hex
/// characters of SHA-256(`video_id`). Hashing keeps raw identifiers out of
/// shared storage and bounds the key length.
pub fn storage_key(video_id: &str) -> String {
    let digest = Sha256::digest(video_id.as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(KEY_DIGEST_LEN);
    format!("{STORAGE_KEY_PREFIX}{hex}")
}

/// An async key-value store holding session tokens.
///
/// # Example
///
/// ```rust
/// use pingback_session::{SessionStore, StoreError};
///
/// /// A store backed by environment variables. Read-only.
/// struct EnvStore;
///
/// impl SessionStore for EnvStore {
///     async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
///         Ok(std::env::var(key).ok())
///     }
///
///     async fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
///         Err(StoreError::Unavailable("environment is read-only".into()))
///     }
/// }
/// ```
pub trait SessionStore: Send + Sync + 'static {
    /// Looks up the value stored under `key`.
    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(
        &self,
        key: &str,
        value: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// A process-local [`SessionStore`].
///
/// Clones share the same map, so a test can keep one clone to inspect
/// what the tracker persisted, or hand the same store to a second tracker
/// to simulate a restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Synchronous read, for inspection outside the async store API.
    pub fn value(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Synchronous write, for seeding a store before a tracker starts.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.insert(key, value);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// NullStore
// ---------------------------------------------------------------------------

/// A [`SessionStore`] that remembers nothing. Every session starts fresh.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStore;

impl SessionStore for NullStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
        Ok(())
    }
}
