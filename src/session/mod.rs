//! Session management for HTTP transports.
//!
//! Two independent registries hold the live sessions, one per transport
//! variant: streaming sessions correlated by the `mcp-session-id` header and
//! legacy SSE sessions correlated by a `sessionId` query parameter. A session
//! id appears in its registry only after a successful handshake and is retired
//! permanently on close.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

use crate::error::{Error, Result};

pub mod legacy;
pub mod streamable;

pub use legacy::LegacySession;
pub use streamable::StreamableSession;

/// Generate a fresh session identifier.
pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A frame pushed to a session's event stream.
#[derive(Debug, Clone)]
pub enum SessionFrame {
    /// A serialized JSON-RPC envelope.
    Message(String),
    /// The session is closing; the stream should end.
    Close,
}

/// An atomic map of session id to transport.
///
/// `register` is a single check-and-insert step, so two concurrent
/// registrations for one id can never both succeed. `remove` is idempotent.
pub struct SessionRegistry<T> {
    sessions: DashMap<String, Arc<T>>,
}

impl<T> SessionRegistry<T> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Register a transport under an id. Fails if the id is already taken.
    pub fn register(&self, id: &str, transport: Arc<T>) -> Result<()> {
        match self.sessions.entry(id.to_string()) {
            Entry::Occupied(_) => Err(Error::SessionExists(id.to_string())),
            Entry::Vacant(entry) => {
                entry.insert(transport);
                Ok(())
            }
        }
    }

    /// Look up a transport by id.
    pub fn lookup(&self, id: &str) -> Option<Arc<T>> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    /// Remove a session, returning its transport if it was present.
    pub fn remove(&self, id: &str) -> Option<Arc<T>> {
        self.sessions.remove(id).map(|(_, transport)| transport)
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Remove and return every current session, for shutdown.
    pub fn drain(&self) -> Vec<(String, Arc<T>)> {
        let ids: Vec<String> = self
            .sessions
            .iter()
            .map(|entry| entry.key().clone())
            .collect();

        ids.into_iter()
            .filter_map(|id| self.sessions.remove(&id))
            .collect()
    }
}

impl<T> Default for SessionRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let registry = SessionRegistry::new();
        let id = new_session_id();

        registry.register(&id, Arc::new(42u32)).unwrap();
        assert_eq!(registry.lookup(&id).as_deref(), Some(&42));
        assert_eq!(registry.len(), 1);
        assert!(registry.lookup("other").is_none());
    }

    #[test]
    fn test_register_duplicate_fails() {
        let registry = SessionRegistry::new();

        registry.register("abc", Arc::new(1u32)).unwrap();
        let err = registry.register("abc", Arc::new(2u32)).unwrap_err();

        assert!(matches!(err, Error::SessionExists(id) if id == "abc"));
        // The original mapping is untouched.
        assert_eq!(registry.lookup("abc").as_deref(), Some(&1));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let registry = SessionRegistry::new();
        registry.register("abc", Arc::new(1u32)).unwrap();

        assert!(registry.remove("abc").is_some());
        assert!(registry.remove("abc").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_removed_id_can_never_collide_with_live_one() {
        let registry = SessionRegistry::new();
        registry.register("abc", Arc::new(1u32)).unwrap();
        registry.remove("abc");

        // A retired id is gone; re-registration is a fresh session, which the
        // callers never do because ids are never reused.
        assert!(registry.lookup("abc").is_none());
    }

    #[test]
    fn test_drain_empties_registry() {
        let registry = SessionRegistry::new();
        registry.register("a", Arc::new(1u32)).unwrap();
        registry.register("b", Arc::new(2u32)).unwrap();

        let drained = registry.drain();
        assert_eq!(drained.len(), 2);
        assert!(registry.is_empty());
        assert!(registry.drain().is_empty());
    }

    #[test]
    fn test_concurrent_register_single_winner() {
        let registry = Arc::new(SessionRegistry::new());
        let barrier = Arc::new(std::sync::Barrier::new(4));

        let handles: Vec<_> = (0..4u32)
            .map(|n| {
                let registry = registry.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    registry.register("contested", Arc::new(n)).is_ok()
                })
            })
            .collect();

        let wins = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(wins, 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_session_ids_are_unique() {
        let a = new_session_id();
        let b = new_session_id();
        assert_ne!(a, b);
    }
}
