use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] ajanda_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Record not found: {0}")]
    RecordNotFound(i64),
    #[error("No note attached to record {0}")]
    NoteNotFound(i64),
    #[error("Note text cannot be empty")]
    EmptyNoteText,
    #[error("Invalid date '{0}' (expected dd.mm.yyyy)")]
    InvalidDate(String),
    #[error("Invalid date and time '{0}' (expected dd.mm.yyyy HH:MM)")]
    InvalidDateTime(String),
    #[error("Editor command failed: {0}")]
    EditorFailed(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(
        "Not signed in. Run `ajanda auth login --tax-id <id> --username <name> --password <password>` first."
    )]
    NotSignedIn,
}

impl CliError {
    /// Follow-up line printed under the error message.
    pub const fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Core(error) if error.is_local() => {
                Some("Nothing was sent to the agenda backend; no reminder was changed.")
            }
            Self::Core(ajanda_core::Error::Network(_)) => Some(
                "The agenda backend could not be reached. Check the profile's api_base_url or sign in again with `ajanda auth login`.",
            ),
            _ => None,
        }
    }
}
