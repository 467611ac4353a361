//! Cookie jar holding the HTTP-only refresh credential.
//!
//! The jar is the `reqwest` cookie provider, so whatever the login endpoint
//! sets is replayed to the refresh endpoint without this crate reading it.
//! Its contents are mirrored as JSON into the same [`TokenStore`] as the
//! session token, under a separate key, so a later process can renew a
//! session it did not log in.

use super::store::{MemoryTokenStore, TokenStore};
use cookie_store::CookieStore;
use reqwest_cookie_store::CookieStoreMutex;
use std::fmt;
use std::io;
use std::sync::{Arc, MutexGuard, PoisonError};

/// Persisted cookie jar for one surface.
pub struct SessionCookies {
    key: String,
    store: Arc<dyn TokenStore>,
    jar: Arc<CookieStoreMutex>,
}

impl SessionCookies {
    /// Empty jar persisted under `key`.
    pub fn new(key: impl Into<String>, store: Arc<dyn TokenStore>) -> Self {
        Self::with_jar(key.into(), store, CookieStore::default())
    }

    /// Jar that is never written anywhere durable.
    pub fn in_memory() -> Self {
        Self::new("cookies", Arc::new(MemoryTokenStore::new()))
    }

    /// Load the jar persisted under `key`. An unreadable jar is discarded
    /// with a warning; the session then falls back to a fresh login.
    pub fn restore(key: impl Into<String>, store: Arc<dyn TokenStore>) -> io::Result<Self> {
        let key = key.into();
        let jar = match store.load(&key)? {
            Some(json) => match cookie_store::serde::json::load_all(json.as_bytes()) {
                Ok(jar) => {
                    tracing::debug!(%key, "restored persisted cookies");
                    jar
                }
                Err(e) => {
                    tracing::warn!(%key, error = %e, "discarding unreadable cookie jar");
                    CookieStore::default()
                }
            },
            None => CookieStore::default(),
        };
        Ok(Self::with_jar(key, store, jar))
    }

    fn with_jar(key: String, store: Arc<dyn TokenStore>, jar: CookieStore) -> Self {
        Self {
            key,
            store,
            jar: Arc::new(CookieStoreMutex::new(jar)),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Provider handed to `reqwest::ClientBuilder::cookie_provider`.
    pub fn jar(&self) -> Arc<CookieStoreMutex> {
        Arc::clone(&self.jar)
    }

    pub fn is_empty(&self) -> bool {
        self.lock().iter_any().next().is_none()
    }

    /// Write the current jar to the store. An empty jar removes the entry.
    /// Session cookies are kept: the refresh cookie usually has no expiry.
    pub fn persist(&self) -> io::Result<()> {
        let mut json = Vec::new();
        {
            let jar = self.lock();
            if jar.iter_any().next().is_none() {
                drop(jar);
                return self.store.remove(&self.key);
            }
            cookie_store::serde::json::save_incl_expired_and_nonpersistent(&jar, &mut json)
                .map_err(io::Error::other)?;
        }
        let json = String::from_utf8(json).map_err(io::Error::other)?;
        self.store.save(&self.key, &json)
    }

    /// Forget every cookie, in memory and in the store.
    pub fn clear(&self) -> io::Result<()> {
        self.lock().clear();
        self.store.remove(&self.key)
    }

    fn lock(&self) -> MutexGuard<'_, CookieStore> {
        self.jar.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for SessionCookies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCookies")
            .field("key", &self.key)
            .field("empty", &self.is_empty())
            .finish()
    }
}
