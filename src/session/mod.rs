//! Session token state shared by every outgoing request.
//!
//! A session is either authenticated (holds a token) or not. The token lives
//! in memory for fast access and is mirrored to a [`TokenStore`] so it
//! survives restarts.
//!
//! ## Design
//! - The session is an explicit object injected into the request layer,
//!   never a process-wide global.
//! - Every token change bumps a generation counter. Requests record the
//!   generation they were sent with, which lets the refresh path tell a stale
//!   401 from one that still applies to the current token.

pub mod cookies;
pub mod store;

pub use cookies::SessionCookies;
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};

use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::io;
use std::sync::Arc;

/// Opaque bearer credential. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(***)")
    }
}

impl From<String> for SessionToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Default)]
struct SessionState {
    token: Option<SessionToken>,
    generation: u64,
}

/// Token as observed at one instant, with the generation it belongs to.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub token: Option<SessionToken>,
    pub generation: u64,
}

/// In-memory token plus its persisted copy for one surface.
pub struct Session {
    key: String,
    store: Arc<dyn TokenStore>,
    state: RwLock<SessionState>,
    // Serializes writers so memory and the store change in the same order.
    // Store I/O happens under this lock, never under `state`.
    writer: Mutex<()>,
}

impl Session {
    /// Create an empty session without touching the store.
    pub fn new(key: impl Into<String>, store: Arc<dyn TokenStore>) -> Self {
        Self {
            key: key.into(),
            store,
            state: RwLock::new(SessionState::default()),
            writer: Mutex::new(()),
        }
    }

    /// Create a session and load any token persisted under `key`.
    pub fn restore(key: impl Into<String>, store: Arc<dyn TokenStore>) -> io::Result<Self> {
        let session = Self::new(key, store);
        if let Some(token) = session.store.load(&session.key)? {
            tracing::debug!(key = %session.key, "restored persisted session");
            session.state.write().token = Some(SessionToken(token));
        }
        Ok(session)
    }

    /// Storage key this session persists under.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn token(&self) -> Option<SessionToken> {
        self.state.read().token.clone()
    }

    pub fn generation(&self) -> u64 {
        self.state.read().generation
    }

    /// Token and generation read under a single lock.
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.read();
        SessionSnapshot {
            token: state.token.clone(),
            generation: state.generation,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read().token.is_some()
    }

    /// Install a new token (login, OAuth callback or refresh). The token is
    /// persisted first; on a storage error the session is left unchanged.
    pub fn set_token(&self, token: impl Into<SessionToken>) -> io::Result<()> {
        let token = token.into();
        let _writer = self.writer.lock();
        self.store.save(&self.key, token.as_str())?;

        let mut state = self.state.write();
        state.generation += 1;
        state.token = Some(token);
        Ok(())
    }

    /// Drop the token. Returns `true` when a token was actually removed;
    /// clearing an empty session leaves the store untouched. The in-memory
    /// token is gone even when removing the persisted copy fails.
    pub fn clear(&self) -> io::Result<bool> {
        let _writer = self.writer.lock();
        {
            let mut state = self.state.write();
            if state.token.take().is_none() {
                return Ok(false);
            }
            state.generation += 1;
        }
        self.store.remove(&self.key)?;
        Ok(true)
    }

    /// End the session after the server rejected the token sent at
    /// `generation`. Returns `false` when the session changed in the
    /// meantime (refreshed, cleared or replaced by a login), in which case
    /// nothing is touched.
    ///
    /// A matching call always advances the generation, with or without a
    /// token, so later callers holding the same generation see it as stale.
    pub fn expire(&self, generation: u64) -> io::Result<bool> {
        let _writer = self.writer.lock();
        let had_token = {
            let mut state = self.state.write();
            if state.generation != generation {
                return Ok(false);
            }
            state.generation += 1;
            state.token.take().is_some()
        };
        if had_token {
            self.store.remove(&self.key)?;
        }
        Ok(true)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("Session")
            .field("key", &self.key)
            .field("authenticated", &state.token.is_some())
            .field("generation", &state.generation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_session(seed: Option<&str>) -> (Arc<MemoryTokenStore>, Session) {
        let store = Arc::new(match seed {
            Some(token) => MemoryTokenStore::with_token("token", token),
            None => MemoryTokenStore::new(),
        });
        let session = Session::restore("token", store.clone()).unwrap();
        (store, session)
    }

    #[test]
    fn restore_reads_persisted_token() {
        let (_store, session) = memory_session(Some("persisted"));
        assert!(session.is_authenticated());
        assert_eq!(session.token().unwrap().as_str(), "persisted");
        assert_eq!(session.generation(), 0);
    }

    #[test]
    fn restore_without_token_is_anonymous() {
        let (_store, session) = memory_session(None);
        assert!(!session.is_authenticated());
        assert!(session.token().is_none());
    }

    #[test]
    fn set_token_persists_and_bumps_generation() {
        let (store, session) = memory_session(None);
        session.set_token("fresh").unwrap();

        assert_eq!(store.get("token").as_deref(), Some("fresh"));
        assert_eq!(session.generation(), 1);

        session.set_token("fresher").unwrap();
        assert_eq!(session.token().unwrap().as_str(), "fresher");
        assert_eq!(session.generation(), 2);
    }

    #[test]
    fn clear_removes_persisted_copy() {
        let (store, session) = memory_session(Some("old"));
        assert!(session.clear().unwrap());

        assert!(!session.is_authenticated());
        assert_eq!(store.get("token"), None);
        assert_eq!(session.generation(), 1);
    }

    #[test]
    fn clear_on_empty_session_is_noop() {
        let (_store, session) = memory_session(None);
        assert!(!session.clear().unwrap());
        assert_eq!(session.generation(), 0);
    }

    #[test]
    fn expire_clears_current_generation() {
        let (store, session) = memory_session(Some("old"));
        assert!(session.expire(0).unwrap());
        assert!(!session.is_authenticated());
        assert_eq!(store.get("token"), None);
    }

    #[test]
    fn expire_ignores_stale_generation() {
        let (store, session) = memory_session(Some("old"));
        session.set_token("new").unwrap();

        assert!(!session.expire(0).unwrap());
        assert_eq!(session.token().unwrap().as_str(), "new");
        assert_eq!(store.get("token").as_deref(), Some("new"));
    }

    #[test]
    fn expire_without_token_advances_generation() {
        let (store, session) = memory_session(None);
        assert!(session.expire(0).unwrap());
        assert_eq!(session.generation(), 1);
        assert_eq!(store.get("token"), None);

        // A second caller that saw generation 0 is now stale.
        assert!(!session.expire(0).unwrap());
        assert_eq!(session.generation(), 1);
    }

    /// Store whose writes and removals always fail.
    struct BrokenStore;

    impl TokenStore for BrokenStore {
        fn load(&self, _key: &str) -> io::Result<Option<String>> {
            Ok(None)
        }

        fn save(&self, _key: &str, _token: &str) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
        }

        fn remove(&self, _key: &str) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
        }
    }

    #[test]
    fn failed_save_leaves_session_unchanged() {
        let session = Session::new("token", Arc::new(BrokenStore));
        let err = session.set_token("never-persisted").unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        assert!(!session.is_authenticated());
        assert_eq!(session.generation(), 0);
    }

    #[test]
    fn failed_remove_still_ends_session_in_memory() {
        let session = Session::new("token", Arc::new(BrokenStore));
        session.state.write().token = Some(SessionToken::new("held"));

        assert!(session.expire(0).is_err());
        assert!(!session.is_authenticated());
        assert_eq!(session.generation(), 1);
    }

    #[test]
    fn snapshot_is_consistent() {
        let (_store, session) = memory_session(Some("a"));
        session.set_token("b").unwrap();
        let snap = session.snapshot();
        assert_eq!(snap.token.unwrap().as_str(), "b");
        assert_eq!(snap.generation, 1);
    }

    #[test]
    fn token_debug_is_redacted() {
        let token = SessionToken::new("super-secret");
        assert_eq!(format!("{token:?}"), "SessionToken(***)");
        assert_eq!(token.bearer(), "Bearer super-secret");

        let (_store, session) = memory_session(Some("super-secret"));
        assert!(!format!("{session:?}").contains("super-secret"));
    }
}
