//! Error types for the session layer.

/// Errors reported by a [`SessionStore`](crate::SessionStore).
///
/// These never reach the tracker's callers:
/// [`SessionIdentity`](crate::SessionIdentity) logs them and carries on
/// without a durable session id.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not be reached (quota, permissions,
    /// closed database...).
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}
