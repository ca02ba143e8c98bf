//! Free-text note attached to a notification record

use serde::{Deserialize, Serialize};

use super::NotificationId;

/// Backend note annotating one notification record.
///
/// The backend assigns `id` independently of the parent record's id, so the
/// parent → note mapping has to be remembered by the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRecord {
    #[serde(default)]
    pub id: i64,
    #[serde(rename = "ajandaId", default)]
    pub parent_id: Option<String>,
    #[serde(rename = "notlar", default)]
    pub text: Option<String>,
}

impl NoteRecord {
    /// Request body for a note that does not exist yet.
    #[must_use]
    pub fn new_for(parent_id: NotificationId, text: impl Into<String>) -> Self {
        Self {
            id: 0,
            parent_id: Some(parent_id.to_string()),
            text: Some(text.into()),
        }
    }

    /// Parent record id, when the backend sent a numeric one.
    #[must_use]
    pub fn parent_record_id(&self) -> Option<NotificationId> {
        self.parent_id.as_deref()?.trim().parse().ok()
    }

    #[must_use]
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}
