//! Error types for ajanda-core

use thiserror::Error;

/// Result type alias using ajanda-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in ajanda-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// A local precondition failed; never sent to the network
    #[error("Invalid input: {0}")]
    Validation(String),

    /// No auth token is stored but the operation needs one
    #[error("Not signed in: an auth token is required")]
    AuthRequired,

    /// Login was answered but refused, or the grant carried no token
    #[error("Login failed: {}", display_with_code(.message, .code.as_deref()))]
    AuthFailed {
        message: String,
        code: Option<String>,
    },

    /// Transport failure, timeout, non-2xx status or undecodable response
    #[error("Network error: {0}")]
    Network(String),

    /// The backend answered with `success == false`
    #[error("{}", display_with_code(.message, .code.as_deref()))]
    RemoteRejected {
        message: String,
        code: Option<String>,
    },

    /// Lookup with no matching backend record
    #[error("Not found: {0}")]
    NotFound(String),

    /// Persisted key/value state could not be read or written
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn remote_rejected(message: Option<String>, code: Option<String>, fallback: &str) -> Self {
        Self::RemoteRejected {
            message: message
                .map(|message| message.trim().to_string())
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| fallback.to_string()),
            code,
        }
    }

    /// Whether the failure was resolved locally without a network round-trip.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::AuthRequired)
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Network(format!("request timed out: {error}"))
        } else if error.is_decode() {
            Self::Network(format!("malformed response: {error}"))
        } else {
            Self::Network(error.to_string())
        }
    }
}

fn display_with_code(message: &str, code: Option<&str>) -> String {
    match code {
        Some(code) if !code.trim().is_empty() => format!("{message} (code {code})"),
        _ => message.to_string(),
    }
}
