//! Durable key/value persistence injected into stateful components.
//!
//! Values are opaque strings under stable keys. Booleans, integers and string
//! sets are layered on top by the provided helper methods, so every backend
//! only has to implement four primitive operations.

mod credentials;
mod file;
mod preferences;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Error, Result};

pub use credentials::{
    CredentialStore, KEY_EXPIRES_AT, KEY_PASSWORD, KEY_REMEMBER_ME, KEY_TAX_ID, KEY_TOKEN,
    KEY_USERNAME, KEY_USER_ID, KEY_USER_NAME,
};
pub use file::JsonFileStore;
pub use preferences::{NoteIdMap, PriorityStore};

/// Flat string key/value storage surviving process restarts.
pub trait KeyValueStore: Clone + Send + Sync + 'static {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
    fn keys(&self) -> Result<Vec<String>>;

    fn get_bool(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some_and(|value| value == "true"))
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        self.set(key, if value { "true" } else { "false" })
    }

    fn get_i64(&self, key: &str) -> Result<Option<i64>> {
        let Some(raw) = self.get(key)? else {
            return Ok(None);
        };
        raw.trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::Storage(format!("value under '{key}' is not an integer")))
    }

    fn set_i64(&self, key: &str, value: i64) -> Result<()> {
        self.set(key, &value.to_string())
    }

    fn get_string_set(&self, key: &str) -> Result<BTreeSet<String>> {
        match self.get(key)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(BTreeSet::new()),
        }
    }

    fn set_string_set(&self, key: &str, values: &BTreeSet<String>) -> Result<()> {
        self.set(key, &serde_json::to_string(values)?)
    }
}

/// In-process store; contents vanish with the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_helpers_roundtrip_through_strings() {
        let store = MemoryStore::new();
        store.set_bool("remember_me", true).unwrap();
        store.set_i64("note_id:4", 91).unwrap();
        let set = ["3".to_string(), "1".to_string()].into_iter().collect();
        store.set_string_set("priority_ids", &set).unwrap();

        assert!(store.get_bool("remember_me").unwrap());
        assert!(!store.get_bool("missing").unwrap());
        assert_eq!(store.get_i64("note_id:4").unwrap(), Some(91));
        assert_eq!(store.get_string_set("priority_ids").unwrap(), set);
        assert_eq!(
            store.get("priority_ids").unwrap().as_deref(),
            Some(r#"["1","3"]"#)
        );
    }

    #[test]
    fn get_i64_rejects_garbage() {
        let store = MemoryStore::new();
        store.set("note_id:1", "abc").unwrap();
        assert!(matches!(store.get_i64("note_id:1"), Err(Error::Storage(_))));
    }

    #[test]
    fn clones_share_entries() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.set("k", "v").unwrap();
        assert_eq!(other.get("k").unwrap().as_deref(), Some("v"));
        other.remove("k").unwrap();
        assert!(store.keys().unwrap().is_empty());
    }
}
