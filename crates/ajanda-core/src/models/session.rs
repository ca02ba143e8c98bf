//! Login credentials and the session granted by the backend

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::notification::parse_occurs_at;
use crate::error::{Error, Result};

/// Backend user info returned alongside the token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(rename = "userId", default)]
    pub user_id: Option<String>,
    #[serde(rename = "userName", default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// An authenticated session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub token: String,
    pub expires_at: Option<String>,
    pub user: UserInfo,
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthSession")
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

impl AuthSession {
    /// Expiry as an instant. Offset-less timestamps are read as UTC.
    #[must_use]
    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        let raw = self.expires_at.as_deref()?.trim();
        DateTime::parse_from_rfc3339(raw)
            .map(|value| value.with_timezone(&Utc))
            .ok()
            .or_else(|| parse_occurs_at(raw).map(|value| value.and_utc()))
    }

    /// A session without a readable expiry never counts as expired.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at_utc().is_some_and(|expires_at| expires_at <= now)
    }
}

/// Tax id, username and password as typed by the user.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub tax_id: String,
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Trim every field and reject blanks.
    pub fn new(
        tax_id: impl AsRef<str>,
        username: impl AsRef<str>,
        password: impl AsRef<str>,
    ) -> Result<Self> {
        let tax_id = tax_id.as_ref().trim();
        let username = username.as_ref().trim();
        let password = password.as_ref().trim();
        if tax_id.is_empty() || username.is_empty() || password.is_empty() {
            return Err(Error::validation(
                "tax id, username and password are all required",
            ));
        }
        Ok(Self {
            tax_id: tax_id.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Credentials")
            .field("tax_id", &self.tax_id)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}
