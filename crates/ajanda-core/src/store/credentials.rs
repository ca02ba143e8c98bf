//! Auth token, user info and remembered login credentials.

use super::KeyValueStore;
use crate::error::{Error, Result};
use crate::models::{AuthSession, Credentials, UserInfo};
use crate::util::normalize_text_option;

pub const KEY_TOKEN: &str = "auth_token";
pub const KEY_USER_ID: &str = "user_id";
pub const KEY_USER_NAME: &str = "user_name";
pub const KEY_EXPIRES_AT: &str = "expires_at";
pub const KEY_REMEMBER_ME: &str = "remember_me";
pub const KEY_TAX_ID: &str = "tax_id";
pub const KEY_USERNAME: &str = "username";
pub const KEY_PASSWORD: &str = "password";

const SESSION_KEYS: [&str; 4] = [KEY_TOKEN, KEY_EXPIRES_AT, KEY_USER_ID, KEY_USER_NAME];
const CREDENTIAL_KEYS: [&str; 4] = [KEY_TAX_ID, KEY_USERNAME, KEY_PASSWORD, KEY_REMEMBER_ME];

/// Opaque credential persistence over a [`KeyValueStore`].
#[derive(Debug, Clone)]
pub struct CredentialStore<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> CredentialStore<S> {
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Stored token, ignoring whitespace-only values.
    pub fn token(&self) -> Result<Option<String>> {
        Ok(normalize_text_option(self.store.get(KEY_TOKEN)?))
    }

    /// Stored token or [`Error::AuthRequired`].
    pub fn require_token(&self) -> Result<String> {
        self.token()?.ok_or(Error::AuthRequired)
    }

    pub fn save_session(&self, session: &AuthSession) -> Result<()> {
        self.store.set(KEY_TOKEN, &session.token)?;
        match &session.expires_at {
            Some(expires_at) => self.store.set(KEY_EXPIRES_AT, expires_at)?,
            None => self.store.remove(KEY_EXPIRES_AT)?,
        }
        match &session.user.user_id {
            Some(user_id) => self.store.set(KEY_USER_ID, user_id)?,
            None => self.store.remove(KEY_USER_ID)?,
        }
        match &session.user.user_name {
            Some(user_name) => self.store.set(KEY_USER_NAME, user_name)?,
            None => self.store.remove(KEY_USER_NAME)?,
        }
        Ok(())
    }

    /// The stored session, if a token is present.
    pub fn session(&self) -> Result<Option<AuthSession>> {
        let Some(token) = self.token()? else {
            return Ok(None);
        };
        Ok(Some(AuthSession {
            token,
            expires_at: normalize_text_option(self.store.get(KEY_EXPIRES_AT)?),
            user: UserInfo {
                user_id: normalize_text_option(self.store.get(KEY_USER_ID)?),
                user_name: normalize_text_option(self.store.get(KEY_USER_NAME)?),
                email: None,
            },
        }))
    }

    pub fn clear_session(&self) -> Result<()> {
        for key in SESSION_KEYS {
            self.store.remove(key)?;
        }
        Ok(())
    }

    pub fn remember_me(&self) -> Result<bool> {
        self.store.get_bool(KEY_REMEMBER_ME)
    }

    /// Persist credentials for auto-login and set the remember-me flag.
    pub fn remember(&self, credentials: &Credentials) -> Result<()> {
        self.store.set(KEY_TAX_ID, &credentials.tax_id)?;
        self.store.set(KEY_USERNAME, &credentials.username)?;
        self.store.set(KEY_PASSWORD, &credentials.password)?;
        self.store.set_bool(KEY_REMEMBER_ME, true)
    }

    /// Drop saved credentials and the remember-me flag; the token stays.
    pub fn forget(&self) -> Result<()> {
        for key in CREDENTIAL_KEYS {
            self.store.remove(key)?;
        }
        Ok(())
    }

    /// Saved credentials; `None` unless all three fields are present.
    pub fn saved_credentials(&self) -> Result<Option<Credentials>> {
        let tax_id = self.store.get(KEY_TAX_ID)?;
        let username = self.store.get(KEY_USERNAME)?;
        let password = self.store.get(KEY_PASSWORD)?;
        match (tax_id, username, password) {
            (Some(tax_id), Some(username), Some(password)) => {
                Ok(Credentials::new(tax_id, username, password).ok())
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn session(token: &str) -> AuthSession {
        AuthSession {
            token: token.to_string(),
            expires_at: None,
            user: UserInfo {
                user_id: Some("17".to_string()),
                user_name: Some("Ada".to_string()),
                email: None,
            },
        }
    }

    #[test]
    fn blank_token_counts_as_signed_out() {
        let store = MemoryStore::new();
        store.set(KEY_TOKEN, "   ").unwrap();
        let credentials = CredentialStore::new(store);
        assert_eq!(credentials.token().unwrap(), None);
        assert!(matches!(
            credentials.require_token(),
            Err(Error::AuthRequired)
        ));
    }

    #[test]
    fn session_roundtrip_and_clear() {
        let credentials = CredentialStore::new(MemoryStore::new());
        credentials.save_session(&session("tok")).unwrap();

        let restored = credentials.session().unwrap().unwrap();
        assert_eq!(restored.token, "tok");
        assert_eq!(restored.user.user_name.as_deref(), Some("Ada"));

        credentials.clear_session().unwrap();
        assert!(credentials.session().unwrap().is_none());
    }

    #[test]
    fn session_keeps_expiry_until_cleared() {
        let store = MemoryStore::new();
        let credentials = CredentialStore::new(store.clone());
        credentials
            .save_session(&AuthSession {
                expires_at: Some("2025-01-01T00:00:00Z".to_string()),
                ..session("tok")
            })
            .unwrap();

        let restored = credentials.session().unwrap().unwrap();
        assert_eq!(restored.expires_at.as_deref(), Some("2025-01-01T00:00:00Z"));

        // A renewed session without an expiry must not inherit the old one.
        credentials.save_session(&session("fresh")).unwrap();
        assert_eq!(credentials.session().unwrap().unwrap().expires_at, None);

        credentials
            .save_session(&AuthSession {
                expires_at: Some("2025-01-01T00:00:00Z".to_string()),
                ..session("tok")
            })
            .unwrap();
        credentials.clear_session().unwrap();
        assert_eq!(store.get(KEY_EXPIRES_AT).unwrap(), None);
    }

    #[test]
    fn remember_and_forget_credentials() {
        let credentials = CredentialStore::new(MemoryStore::new());
        let login = Credentials::new("1234567890", "ada", "secret").unwrap();

        credentials.remember(&login).unwrap();
        assert!(credentials.remember_me().unwrap());
        assert_eq!(credentials.saved_credentials().unwrap(), Some(login));

        credentials.forget().unwrap();
        assert!(!credentials.remember_me().unwrap());
        assert_eq!(credentials.saved_credentials().unwrap(), None);
    }
}
