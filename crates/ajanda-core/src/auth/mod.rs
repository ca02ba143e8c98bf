//! Login, auto-login and logout over the gateway and the credential store.

use std::sync::Arc;

use chrono::Utc;

use crate::error::Result;
use crate::gateway::NotificationGateway;
use crate::models::{AuthSession, Credentials};
use crate::store::{CredentialStore, KeyValueStore};

pub struct AuthService<G: NotificationGateway, S: KeyValueStore> {
    gateway: Arc<G>,
    credentials: CredentialStore<S>,
}

impl<G: NotificationGateway, S: KeyValueStore> AuthService<G, S> {
    pub fn new(gateway: Arc<G>, store: S) -> Self {
        Self {
            gateway,
            credentials: CredentialStore::new(store),
        }
    }

    pub const fn credentials(&self) -> &CredentialStore<S> {
        &self.credentials
    }

    /// Authenticate and persist the session.
    ///
    /// Blank fields fail with a validation error before any network call.
    /// With `remember_me` the credentials are saved for [`Self::auto_login`];
    /// without it any previously saved credentials are dropped.
    pub async fn login(
        &self,
        tax_id: &str,
        username: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<AuthSession> {
        let credentials = Credentials::new(tax_id, username, password)?;
        let session = self.gateway.login(&credentials).await?;
        self.credentials.save_session(&session)?;
        if remember_me {
            self.credentials.remember(&credentials)?;
        } else {
            self.credentials.forget()?;
        }
        tracing::info!(
            user = session.user.user_name.as_deref().unwrap_or(&credentials.username),
            remember_me,
            "Signed in"
        );
        Ok(session)
    }

    /// Sign in with saved credentials when remember-me is on.
    pub async fn auto_login(&self) -> Result<Option<AuthSession>> {
        if !self.credentials.remember_me()? {
            return Ok(None);
        }
        let Some(saved) = self.credentials.saved_credentials()? else {
            tracing::debug!("Remember-me is set but no complete credentials are saved");
            return Ok(None);
        };
        let session = self.gateway.login(&saved).await?;
        self.credentials.save_session(&session)?;
        tracing::info!(username = %saved.username, "Signed in with saved credentials");
        Ok(Some(session))
    }

    /// Clear the session.
    ///
    /// Saved credentials survive only when remember-me is set. Starred ids
    /// and note mappings are untouched.
    pub fn logout(&self) -> Result<()> {
        self.credentials.clear_session()?;
        if !self.credentials.remember_me()? {
            self.credentials.forget()?;
        }
        tracing::info!("Signed out");
        Ok(())
    }

    pub fn current_session(&self) -> Result<Option<AuthSession>> {
        self.credentials.session()
    }

    /// The stored session while it is unexpired; otherwise a fresh one from
    /// [`Self::auto_login`].
    ///
    /// Returns `None` when the token is missing or expired and remember-me
    /// is off.
    pub async fn ensure_session(&self) -> Result<Option<AuthSession>> {
        match self.credentials.session()? {
            Some(session) if !session.is_expired_at(Utc::now()) => Ok(Some(session)),
            stored => {
                if let Some(expired) = stored {
                    tracing::info!(
                        expires_at = expired.expires_at.as_deref().unwrap_or_default(),
                        "Stored session has expired"
                    );
                }
                self.auto_login().await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::gateway::fake::FakeGateway;
    use crate::store::{MemoryStore, PriorityStore};

    fn service() -> (AuthService<FakeGateway, MemoryStore>, Arc<FakeGateway>, MemoryStore) {
        let gateway = Arc::new(FakeGateway::new());
        let store = MemoryStore::new();
        (
            AuthService::new(Arc::clone(&gateway), store.clone()),
            gateway,
            store,
        )
    }

    #[tokio::test]
    async fn blank_password_fails_before_gateway_call() {
        let (auth, gateway, _) = service();
        let error = auth.login("1234567890", "ada", "  ", true).await.unwrap_err();
        assert!(matches!(error, Error::Validation(_)));
        assert!(gateway.calls().is_empty());
        assert!(auth.current_session().unwrap().is_none());
    }

    #[tokio::test]
    async fn login_stores_token_and_remembers_credentials() {
        let (auth, _, _) = service();
        let session = auth.login(" 1234567890 ", "ada", "secret", true).await.unwrap();
        assert_eq!(session.token, "token-ada");
        assert_eq!(auth.credentials().token().unwrap().as_deref(), Some("token-ada"));
        assert!(auth.credentials().remember_me().unwrap());
        assert_eq!(
            auth.credentials()
                .saved_credentials()
                .unwrap()
                .map(|saved| saved.tax_id),
            Some("1234567890".to_string())
        );
    }

    #[tokio::test]
    async fn login_without_remember_me_drops_saved_credentials() {
        let (auth, _, _) = service();
        auth.login("1", "ada", "secret", true).await.unwrap();
        auth.login("1", "ada", "secret", false).await.unwrap();
        assert!(!auth.credentials().remember_me().unwrap());
        assert!(auth.credentials().saved_credentials().unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_login_keeps_previous_state() {
        let (auth, gateway, _) = service();
        gateway.fail_next(
            "login",
            Error::AuthFailed {
                message: "Hatali sifre".to_string(),
                code: Some("401".to_string()),
            },
        );
        let error = auth.login("1", "ada", "wrong", true).await.unwrap_err();
        assert!(matches!(error, Error::AuthFailed { .. }));
        assert!(auth.current_session().unwrap().is_none());
        assert!(!auth.credentials().remember_me().unwrap());
    }

    #[tokio::test]
    async fn auto_login_uses_saved_credentials_only_with_remember_me() {
        let (auth, gateway, _) = service();
        assert!(auth.auto_login().await.unwrap().is_none());
        assert!(gateway.calls().is_empty());

        auth.login("1", "ada", "secret", true).await.unwrap();
        auth.credentials().clear_session().unwrap();
        let session = auth.auto_login().await.unwrap().unwrap();
        assert_eq!(session.token, "token-ada");
        assert_eq!(gateway.call_count("login"), 2);
    }

    fn expire_stored_session(auth: &AuthService<FakeGateway, MemoryStore>) {
        let mut session = auth.current_session().unwrap().unwrap();
        session.expires_at = Some("2000-01-01T00:00:00Z".to_string());
        auth.credentials().save_session(&session).unwrap();
    }

    #[tokio::test]
    async fn ensure_session_keeps_unexpired_token() {
        let (auth, gateway, _) = service();
        auth.login("1", "ada", "secret", true).await.unwrap();
        let mut session = auth.current_session().unwrap().unwrap();
        session.expires_at = Some("2999-01-01T00:00:00Z".to_string());
        auth.credentials().save_session(&session).unwrap();

        let ensured = auth.ensure_session().await.unwrap().unwrap();
        assert_eq!(ensured.expires_at.as_deref(), Some("2999-01-01T00:00:00Z"));
        assert_eq!(gateway.call_count("login"), 1);
    }

    #[tokio::test]
    async fn ensure_session_renews_expired_token_with_remember_me() {
        let (auth, gateway, _) = service();
        auth.login("1", "ada", "secret", true).await.unwrap();
        expire_stored_session(&auth);

        let renewed = auth.ensure_session().await.unwrap().unwrap();
        assert_eq!(renewed.token, "token-ada");
        assert_eq!(renewed.expires_at, None);
        assert_eq!(gateway.call_count("login"), 2);
        assert_eq!(auth.current_session().unwrap().unwrap().expires_at, None);
    }

    #[tokio::test]
    async fn ensure_session_signs_in_when_token_is_missing() {
        let (auth, gateway, _) = service();
        auth.login("1", "ada", "secret", true).await.unwrap();
        auth.credentials().clear_session().unwrap();

        assert!(auth.ensure_session().await.unwrap().is_some());
        assert_eq!(gateway.call_count("login"), 2);
    }

    #[tokio::test]
    async fn ensure_session_without_remember_me_rejects_expired_token() {
        let (auth, gateway, _) = service();
        auth.login("1", "ada", "secret", false).await.unwrap();
        expire_stored_session(&auth);

        assert!(auth.ensure_session().await.unwrap().is_none());
        assert_eq!(gateway.call_count("login"), 1);
    }

    #[tokio::test]
    async fn logout_keeps_priorities_and_remembered_credentials() {
        let (auth, _, store) = service();
        let priorities = PriorityStore::new(store);
        auth.login("1", "ada", "secret", true).await.unwrap();
        priorities.toggle(5).unwrap();

        auth.logout().unwrap();

        assert!(auth.current_session().unwrap().is_none());
        assert!(auth.credentials().saved_credentials().unwrap().is_some());
        assert!(priorities.contains(5).unwrap());
    }

    #[tokio::test]
    async fn logout_without_remember_me_forgets_credentials() {
        let (auth, _, store) = service();
        auth.login("1", "ada", "secret", false).await.unwrap();
        // Credentials written by an older session without the flag.
        store.set("tax_id", "1").unwrap();
        store.set("username", "ada").unwrap();
        store.set("password", "secret").unwrap();

        auth.logout().unwrap();
        assert!(auth.credentials().saved_credentials().unwrap().is_none());
    }
}
