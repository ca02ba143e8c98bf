//! Keychain persistence for secret keys, layered over the profile's JSON
//! session store.

#[cfg(test)]
use std::collections::HashMap;
#[cfg(test)]
use std::sync::{Mutex, OnceLock};

#[cfg(not(test))]
use keyring::Entry;

use ajanda_core::store::{KEY_PASSWORD, KEY_TOKEN};
use ajanda_core::{Error, KeyValueStore, Result};

#[cfg(not(test))]
const KEYRING_SERVICE_NAME: &str = "ajanda-cli";

pub const KEY_API_PASSWORD: &str = "api_password";

/// Keys that never reach the JSON file.
const SECRET_KEYS: [&str; 3] = [KEY_TOKEN, KEY_PASSWORD, KEY_API_PASSWORD];

#[derive(Clone)]
struct SecretSlot {
    username: String,
}

impl SecretSlot {
    fn new(profile_name: &str, key: &str) -> Self {
        Self {
            username: format!("{key}:{profile_name}"),
        }
    }

    #[cfg(test)]
    fn test_store() -> &'static Mutex<HashMap<String, String>> {
        static STORE: OnceLock<Mutex<HashMap<String, String>>> = OnceLock::new();
        STORE.get_or_init(|| Mutex::new(HashMap::new()))
    }

    #[cfg(test)]
    fn test_guard() -> Result<std::sync::MutexGuard<'static, HashMap<String, String>>> {
        Self::test_store()
            .lock()
            .map_err(|error| Error::Storage(error.to_string()))
    }

    #[cfg(not(test))]
    fn entry(&self) -> Result<Entry> {
        Entry::new(KEYRING_SERVICE_NAME, &self.username)
            .map_err(|error| Error::Storage(error.to_string()))
    }

    #[cfg(not(test))]
    fn load(&self) -> Result<Option<String>> {
        match self.entry()?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(Error::Storage(error.to_string())),
        }
    }

    #[cfg(test)]
    fn load(&self) -> Result<Option<String>> {
        Ok(Self::test_guard()?.get(&self.username).cloned())
    }

    #[cfg(not(test))]
    fn save(&self, secret: &str) -> Result<()> {
        self.entry()?
            .set_password(secret)
            .map_err(|error| Error::Storage(error.to_string()))
    }

    #[cfg(test)]
    fn save(&self, secret: &str) -> Result<()> {
        Self::test_guard()?.insert(self.username.clone(), secret.to_string());
        Ok(())
    }

    #[cfg(not(test))]
    fn clear(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(Error::Storage(error.to_string())),
        }
    }

    #[cfg(test)]
    fn clear(&self) -> Result<()> {
        Self::test_guard()?.remove(&self.username);
        Ok(())
    }
}

/// [`KeyValueStore`] that sends the session token and passwords to the OS
/// keychain and everything else to `inner`.
#[derive(Clone)]
pub struct KeychainStore<S: KeyValueStore> {
    profile_name: String,
    inner: S,
}

impl<S: KeyValueStore> KeychainStore<S> {
    pub fn new(profile_name: &str, inner: S) -> Self {
        Self {
            profile_name: profile_name.to_string(),
            inner,
        }
    }

    fn secret(&self, key: &str) -> Option<SecretSlot> {
        SECRET_KEYS
            .contains(&key)
            .then(|| SecretSlot::new(&self.profile_name, key))
    }
}

impl<S: KeyValueStore> KeyValueStore for KeychainStore<S> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.secret(key) {
            Some(slot) => slot.load(),
            None => self.inner.get(key),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        match self.secret(key) {
            Some(slot) => slot.save(value),
            None => self.inner.set(key, value),
        }
    }

    fn remove(&self, key: &str) -> Result<()> {
        match self.secret(key) {
            Some(slot) => slot.clear(),
            None => self.inner.remove(key),
        }
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys = self.inner.keys()?;
        for key in SECRET_KEYS {
            if SecretSlot::new(&self.profile_name, key).load()?.is_some() {
                keys.push(key.to_string());
            }
        }
        keys.sort();
        keys.dedup();
        Ok(keys)
    }
}

pub fn load_api_password(profile_name: &str) -> Result<Option<String>> {
    SecretSlot::new(profile_name, KEY_API_PASSWORD).load()
}

pub fn save_api_password(profile_name: &str, secret: &str) -> Result<()> {
    SecretSlot::new(profile_name, KEY_API_PASSWORD).save(secret)
}

#[cfg(test)]
mod tests {
    use ajanda_core::store::KEY_USER_NAME;
    use ajanda_core::MemoryStore;

    use super::*;

    #[test]
    fn secrets_bypass_the_inner_store() {
        let inner = MemoryStore::new();
        let store = KeychainStore::new("keychain-split", inner.clone());

        store.set(KEY_TOKEN, "tok-1").unwrap();
        store.set(KEY_USER_NAME, "ada").unwrap();

        assert_eq!(store.get(KEY_TOKEN).unwrap().as_deref(), Some("tok-1"));
        assert_eq!(inner.get(KEY_TOKEN).unwrap(), None);
        assert_eq!(inner.get(KEY_USER_NAME).unwrap().as_deref(), Some("ada"));
        assert_eq!(
            store.keys().unwrap(),
            vec![KEY_TOKEN.to_string(), KEY_USER_NAME.to_string()]
        );

        store.remove(KEY_TOKEN).unwrap();
        assert_eq!(store.get(KEY_TOKEN).unwrap(), None);
    }

    #[test]
    fn secrets_are_scoped_per_profile() {
        let work = KeychainStore::new("keychain-work", MemoryStore::new());
        let home = KeychainStore::new("keychain-home", MemoryStore::new());

        work.set(KEY_PASSWORD, "work-secret").unwrap();

        assert_eq!(home.get(KEY_PASSWORD).unwrap(), None);
        assert_eq!(
            work.get(KEY_PASSWORD).unwrap().as_deref(),
            Some("work-secret")
        );
    }

    #[test]
    fn api_password_roundtrips_outside_the_session_store() {
        assert_eq!(load_api_password("keychain-api").unwrap(), None);
        save_api_password("keychain-api", "api-secret").unwrap();
        assert_eq!(
            load_api_password("keychain-api").unwrap().as_deref(),
            Some("api-secret")
        );
    }
}
