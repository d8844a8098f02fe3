//! Local key-value store standing in for browser local storage
//!
//! [`LocalStore`] is the only way the rest of the crate reads or writes
//! persisted state. It wraps a [`KeyValueStore`] backend and adds JSON
//! (de)serialization on top of raw string values.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, trace};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Error;

/// Well-known store keys
pub mod keys {
    /// `"true"` while a user is signed in
    pub const IS_AUTHENTICATED: &str = "isAuthenticated";
    /// Serialized user profile
    pub const USER_DATA: &str = "userData";
    /// Email used for the last successful sign-in
    pub const USER_EMAIL: &str = "userEmail";
    /// `"true"` when the user asked to be remembered
    pub const REMEMBER_ME: &str = "rememberMe";
    /// JSON array of demo locations
    pub const LOCATIONS: &str = "trafficLocations";
}

/// Raw string storage backend
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, Error>;
    fn set(&self, key: &str, value: &str) -> Result<(), Error>;
    fn remove(&self, key: &str) -> Result<(), Error>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Store that lives as long as the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(lock(&self.values).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        lock(&self.values).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        lock(&self.values).remove(key);
        Ok(())
    }
}

/// Store persisted as a single JSON object file.
///
/// The file is read once when the store is opened and rewritten in full on
/// every mutation. It is created on the first write.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: Mutex<HashMap<String, String>>,
}

impl FileStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        let values = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => HashMap::new(),
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                Error::storage(format!("Corrupt store file {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        debug!("Opened store {} with {} keys", path.display(), values.len());

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, values: &HashMap<String, String>) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let contents = serde_json::to_string_pretty(values)?;
        fs::write(&self.path, contents)?;
        trace!("Flushed store {}", self.path.display());
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(lock(&self.values).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        let mut values = lock(&self.values);
        values.insert(key.to_string(), value.to_string());
        self.flush(&values)
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        let mut values = lock(&self.values);
        if values.remove(key).is_some() {
            self.flush(&values)?;
        }
        Ok(())
    }
}

/// Typed facade over a [`KeyValueStore`]
#[derive(Clone)]
pub struct LocalStore {
    backend: Arc<dyn KeyValueStore>,
}

impl LocalStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// A fresh in-memory store
    pub fn memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// A store persisted at `path`
    pub fn file(path: impl AsRef<Path>) -> Result<Self, Error> {
        Ok(Self::new(Arc::new(FileStore::open(path)?)))
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, Error> {
        self.backend.get(key)
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        self.backend.set(key, value)
    }

    pub fn remove(&self, key: &str) -> Result<(), Error> {
        self.backend.remove(key)
    }

    /// Remove every key in `keys`, stopping at the first failure
    pub fn remove_all(&self, keys: &[&str]) -> Result<(), Error> {
        keys.iter().try_for_each(|key| self.remove(key))
    }

    /// Read and deserialize the value at `key`
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, Error> {
        match self.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Serialize `value` and store it at `key`
    pub fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), Error> {
        let raw = serde_json::to_string(value)?;
        self.set(key, &raw)
    }

    /// `true` only when the stored value is exactly `"true"`
    pub fn get_flag(&self, key: &str) -> Result<bool, Error> {
        Ok(self.get(key)?.as_deref() == Some("true"))
    }

    pub fn set_flag(&self, key: &str, value: bool) -> Result<(), Error> {
        self.set(key, if value { "true" } else { "false" })
    }
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn memory_store_get_set_remove() {
        let store = LocalStore::memory();
        assert_eq!(store.get("missing").unwrap(), None);

        store.set(keys::USER_EMAIL, "a@b.com").unwrap();
        assert_eq!(store.get(keys::USER_EMAIL).unwrap().as_deref(), Some("a@b.com"));

        store.remove(keys::USER_EMAIL).unwrap();
        assert_eq!(store.get(keys::USER_EMAIL).unwrap(), None);
    }

    #[test]
    fn json_helpers_round_trip() {
        let store = LocalStore::memory();
        store
            .set_json(keys::USER_DATA, &json!({"id": 1, "email": "a@b.com"}))
            .unwrap();

        let value: serde_json::Value = store.get_json(keys::USER_DATA).unwrap().unwrap();
        assert_eq!(value["email"], "a@b.com");
    }

    #[test]
    fn corrupt_json_is_an_error() {
        let store = LocalStore::memory();
        store.set(keys::USER_DATA, "{not json").unwrap();
        let result: Result<Option<serde_json::Value>, _> = store.get_json(keys::USER_DATA);
        assert!(matches!(result, Err(Error::Json(_))));
    }

    #[test]
    fn flags_only_accept_literal_true() {
        let store = LocalStore::memory();
        assert!(!store.get_flag(keys::REMEMBER_ME).unwrap());

        store.set_flag(keys::REMEMBER_ME, true).unwrap();
        assert!(store.get_flag(keys::REMEMBER_ME).unwrap());

        store.set(keys::REMEMBER_ME, "yes").unwrap();
        assert!(!store.get_flag(keys::REMEMBER_ME).unwrap());
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        {
            let store = LocalStore::file(&path).unwrap();
            store.set_flag(keys::IS_AUTHENTICATED, true).unwrap();
            store.set(keys::USER_EMAIL, "ops@example.com").unwrap();
            store.remove(keys::USER_EMAIL).unwrap();
        }

        let reopened = LocalStore::file(&path).unwrap();
        assert!(reopened.get_flag(keys::IS_AUTHENTICATED).unwrap());
        assert_eq!(reopened.get(keys::USER_EMAIL).unwrap(), None);
    }

    #[test]
    fn file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "[1, 2").unwrap();

        assert!(matches!(FileStore::open(&path), Err(Error::Storage(_))));
    }

    #[test]
    fn remove_all_clears_every_key() {
        let store = LocalStore::memory();
        for key in [keys::IS_AUTHENTICATED, keys::USER_DATA, keys::USER_EMAIL] {
            store.set(key, "x").unwrap();
        }
        store
            .remove_all(&[keys::IS_AUTHENTICATED, keys::USER_DATA, keys::USER_EMAIL])
            .unwrap();
        assert_eq!(store.get(keys::USER_DATA).unwrap(), None);
    }
}
