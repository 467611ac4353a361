//! Persisted token storage.
//!
//! Each surface persists its token under its own key, mirroring how the
//! browser clients keep one local-storage entry per application.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/// Durable key/value storage for session tokens.
pub trait TokenStore: Send + Sync {
    /// Read the token stored under `key`, if any.
    fn load(&self, key: &str) -> io::Result<Option<String>>;

    /// Store `token` under `key`, replacing any previous value.
    fn save(&self, key: &str, token: &str) -> io::Result<()>;

    /// Delete the token under `key`. Deleting a missing key is not an error.
    fn remove(&self, key: &str) -> io::Result<()>;
}

// ── File-backed store ────────────────────────────────────────────

/// One file per key inside a data directory.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    dir: PathBuf,
}

impl FileTokenStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> io::Result<PathBuf> {
        if !is_valid_key(key) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid token storage key '{key}'"),
            ));
        }
        Ok(self.dir.join(key))
    }
}

/// Keys become file names, so keep them to a safe alphabet.
fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

impl TokenStore for FileTokenStore {
    fn load(&self, key: &str) -> io::Result<Option<String>> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                let token = contents.trim();
                if token.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(token.to_string()))
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn save(&self, key: &str, token: &str) -> io::Result<()> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(&path, token)?;

        // Owner-only: the file holds a bearer credential.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

// ── In-memory store ──────────────────────────────────────────────

/// Non-durable store for tests and short-lived processes.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with one entry.
    pub fn with_token(key: &str, token: &str) -> Self {
        let store = Self::new();
        store.entries.lock().insert(key.to_string(), token.to_string());
        store
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.get(key))
    }

    fn save(&self, key: &str, token: &str) -> io::Result<()> {
        self.entries
            .lock()
            .insert(key.to_string(), token.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn file_store_round_trip() {
        let tmp = TempDir::new().unwrap();
        let store = FileTokenStore::new(tmp.path().join("tokens"));

        assert_eq!(store.load("token").unwrap(), None);
        store.save("token", "abc123").unwrap();
        assert_eq!(store.load("token").unwrap().as_deref(), Some("abc123"));

        store.remove("token").unwrap();
        assert_eq!(store.load("token").unwrap(), None);
    }

    #[test]
    fn file_store_keys_are_independent() {
        let tmp = TempDir::new().unwrap();
        let store = FileTokenStore::new(tmp.path());

        store.save("token", "patient").unwrap();
        store.save("admin_token", "admin").unwrap();
        store.remove("token").unwrap();

        assert_eq!(store.load("token").unwrap(), None);
        assert_eq!(store.load("admin_token").unwrap().as_deref(), Some("admin"));
    }

    #[test]
    fn file_store_trims_and_ignores_blank_files() {
        let tmp = TempDir::new().unwrap();
        let store = FileTokenStore::new(tmp.path());

        std::fs::write(tmp.path().join("token"), "  tok\n").unwrap();
        assert_eq!(store.load("token").unwrap().as_deref(), Some("tok"));

        std::fs::write(tmp.path().join("token"), "\n").unwrap();
        assert_eq!(store.load("token").unwrap(), None);
    }

    #[test]
    fn file_store_remove_missing_is_ok() {
        let tmp = TempDir::new().unwrap();
        let store = FileTokenStore::new(tmp.path());
        assert!(store.remove("never_saved").is_ok());
    }

    #[test]
    fn file_store_rejects_path_like_keys() {
        let tmp = TempDir::new().unwrap();
        let store = FileTokenStore::new(tmp.path());

        for key in ["", "../escape", "a/b", ".hidden"] {
            let err = store.save(key, "x").unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::InvalidInput, "key {key:?}");
        }
    }

    #[cfg(unix)]
    #[test]
    fn file_store_writes_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let store = FileTokenStore::new(tmp.path());
        store.save("token", "secret").unwrap();

        let mode = std::fs::metadata(tmp.path().join("token"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryTokenStore::with_token("token", "seed");
        assert_eq!(store.load("token").unwrap().as_deref(), Some("seed"));

        store.save("token", "next").unwrap();
        assert_eq!(store.get("token").as_deref(), Some("next"));

        store.remove("token").unwrap();
        assert_eq!(store.get("token"), None);
    }
}
