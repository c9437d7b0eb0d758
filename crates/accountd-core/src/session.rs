//! Session identifiers and the session handle store.
//!
//! Each authenticated session owns one live directory handle. The store maps
//! session identifiers to those handles so the HTTP layer can check a handle
//! out per request and take it back when the session ends. The handle type is
//! generic; this crate never sees the directory connection itself.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Identifier for one authenticated session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Creates a session identifier from a [`Uuid`].
    #[must_use]
    pub const fn new(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Creates a new random session identifier (UUID v4).
    #[must_use]
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner [`Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Parses a session identifier from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid UUID.
    pub fn parse_str(input: &str) -> Result<Self> {
        Uuid::parse_str(input)
            .map(Self)
            .map_err(|_| Error::InvalidUuid(input.to_string()))
    }
}

impl From<Uuid> for SessionId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<SessionId> for Uuid {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

impl FromStr for SessionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_str(s)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<Uuid> for SessionId {
    fn as_ref(&self) -> &Uuid {
        &self.0
    }
}

/// Keyed storage for live session handles.
///
/// `get` hands out a shared reference so the current request can lock and use
/// the handle; `remove` returns the handle so the caller can tear it down
/// (e.g., unbind the directory connection) after the session ends.
pub trait SessionStore<H>: Send + Sync {
    /// Store a handle under a session identifier, replacing any previous one.
    fn put(&self, id: SessionId, handle: H);

    /// Look up the handle for a session.
    fn get(&self, id: &SessionId) -> Option<Arc<Mutex<H>>>;

    /// Remove and return the handle for a session.
    fn remove(&self, id: &SessionId) -> Option<Arc<Mutex<H>>>;
}

/// In-process session store backed by a hash map.
pub struct MemorySessionStore<H> {
    sessions: RwLock<HashMap<SessionId, Arc<Mutex<H>>>>,
}

impl<H> MemorySessionStore<H> {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    /// Returns true if no sessions are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<H> Default for MemorySessionStore<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> fmt::Debug for MemorySessionStore<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySessionStore")
            .field("sessions", &self.len())
            .finish()
    }
}

impl<H: Send> SessionStore<H> for MemorySessionStore<H> {
    fn put(&self, id: SessionId, handle: H) {
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.insert(id, Arc::new(Mutex::new(handle)));
        }
    }

    fn get(&self, id: &SessionId) -> Option<Arc<Mutex<H>>> {
        self.sessions.read().ok().and_then(|s| s.get(id).cloned())
    }

    fn remove(&self, id: &SessionId) -> Option<Arc<Mutex<H>>> {
        self.sessions.write().ok().and_then(|mut s| s.remove(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_UUID: &str = "550e8400-e29b-41d4-a716-446655440000";

    #[test]
    fn test_session_id_new_v4() {
        let id = SessionId::new_v4();
        assert_eq!(id.as_uuid().get_version_num(), 4);
    }

    #[test]
    fn test_session_id_parse_str_valid() {
        let id = SessionId::parse_str(VALID_UUID).unwrap();
        assert_eq!(id.to_string(), VALID_UUID);
    }

    #[test]
    fn test_session_id_parse_str_invalid() {
        let result = SessionId::parse_str("not-a-uuid");
        assert!(matches!(result.unwrap_err(), Error::InvalidUuid(_)));
    }

    #[test]
    fn test_session_id_from_str() {
        let id: SessionId = VALID_UUID.parse().unwrap();
        assert_eq!(id.to_string(), VALID_UUID);
    }

    #[test]
    fn test_session_id_serde_transparent() {
        let id = SessionId::parse_str(VALID_UUID).unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", VALID_UUID));

        let parsed: SessionId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_store_put_and_get() {
        let store = MemorySessionStore::new();
        let id = SessionId::new_v4();

        store.put(id, "handle".to_string());

        let first = store.get(&id).unwrap();
        let second = store.get(&id).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_get_unknown_session() {
        let store: MemorySessionStore<String> = MemorySessionStore::new();
        assert!(store.get(&SessionId::new_v4()).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_put_replaces_handle() {
        let store = MemorySessionStore::new();
        let id = SessionId::new_v4();

        store.put(id, 1u32);
        let old = store.get(&id).unwrap();
        store.put(id, 2u32);
        let new = store.get(&id).unwrap();

        assert!(!Arc::ptr_eq(&old, &new));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_remove_returns_handle() {
        let store = MemorySessionStore::new();
        let id = SessionId::new_v4();

        store.put(id, "handle".to_string());
        let removed = store.remove(&id);
        assert!(removed.is_some());
        assert!(store.get(&id).is_none());
        assert!(store.remove(&id).is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_store_handle_mutation_is_shared() {
        let store = MemorySessionStore::new();
        let id = SessionId::new_v4();

        store.put(id, Vec::<String>::new());

        {
            let handle = store.get(&id).unwrap();
            let mut guard = handle.lock().await;
            guard.push("bound".to_string());
        }

        let handle = store.remove(&id).unwrap();
        let guard = handle.lock().await;
        assert_eq!(guard.as_slice(), ["bound".to_string()]);
    }
}
