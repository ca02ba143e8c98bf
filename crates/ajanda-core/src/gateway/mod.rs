//! Remote agenda backend boundary.
//!
//! [`NotificationGateway`] is the seam between the reconciler and the
//! network. [`HttpGateway`] talks to the real backend; tests substitute an
//! in-memory fake.

mod http;

#[cfg(test)]
pub(crate) mod fake;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::{AuthSession, Credentials, NoteRecord, NotificationRecord};

pub use http::HttpGateway;

pub const LIST_SORT_FIELD: &str = "tarih";

/// One `getall` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page_number: u32,
    pub page_size: u32,
    pub sort_field: String,
    pub descending: bool,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub search: Option<String>,
}

impl ListQuery {
    /// Newest-first listing of every record on one page.
    #[must_use]
    pub fn first_page(page_size: u32) -> Self {
        Self {
            page_number: 0,
            page_size,
            sort_field: LIST_SORT_FIELD.to_string(),
            descending: true,
            start_date: None,
            end_date: None,
            search: None,
        }
    }

    #[must_use]
    pub fn with_page(&self, page_number: u32) -> Self {
        Self {
            page_number,
            ..self.clone()
        }
    }
}

/// A successful list envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationPage {
    pub records: Vec<NotificationRecord>,
    pub total_count: i64,
}

/// Authenticated calls against the agenda backend.
///
/// Every method except `login` takes the bearer token explicitly and fails
/// with [`Error::AuthRequired`] before any I/O when it is blank.
#[async_trait]
pub trait NotificationGateway: Send + Sync + 'static {
    async fn login(&self, credentials: &Credentials) -> Result<AuthSession>;

    async fn list_notifications(&self, token: &str, query: &ListQuery)
        -> Result<NotificationPage>;

    /// Returns the created record when the backend echoes it back.
    async fn create_notification(
        &self,
        token: &str,
        record: &NotificationRecord,
    ) -> Result<Option<NotificationRecord>>;

    async fn update_notification(&self, token: &str, record: &NotificationRecord) -> Result<()>;

    async fn delete_notification(&self, token: &str, record: &NotificationRecord) -> Result<()>;

    async fn add_note(&self, token: &str, parent_id: i64, text: &str) -> Result<NoteRecord>;

    async fn get_note(&self, token: &str, note_id: i64) -> Result<NoteRecord>;

    async fn update_note(&self, token: &str, note: &NoteRecord) -> Result<()>;

    async fn delete_note(&self, token: &str, note: &NoteRecord) -> Result<()>;
}

/// Reject blank bearer tokens.
pub fn require_token(token: &str) -> Result<&str> {
    let token = token.trim();
    if token.is_empty() {
        Err(Error::AuthRequired)
    } else {
        Ok(token)
    }
}

/// List every record, working around ambiguous page numbering.
///
/// The backend does not document whether pages start at 0 or 1. Page 0 is
/// requested first; when it succeeds empty while `totalCount > 0`, page 1 is
/// requested exactly once and its outcome is final.
pub async fn fetch_all_notifications<G: NotificationGateway + ?Sized>(
    gateway: &G,
    token: &str,
    page_size: u32,
) -> Result<Vec<NotificationRecord>> {
    let query = ListQuery::first_page(page_size);
    let first = gateway.list_notifications(token, &query).await?;
    tracing::debug!(
        total_count = first.total_count,
        received = first.records.len(),
        "Fetched notification page 0"
    );
    if !first.records.is_empty() || first.total_count <= 0 {
        return Ok(first.records);
    }

    tracing::info!(
        total_count = first.total_count,
        "Page 0 came back empty with a nonzero total; retrying page 1"
    );
    let second = gateway
        .list_notifications(token, &query.with_page(1))
        .await?;
    Ok(second.records)
}
