//! In-memory backend used by unit tests.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::Notify;

use super::{require_token, ListQuery, NotificationGateway, NotificationPage};
use crate::error::{Error, Result};
use crate::models::{AuthSession, Credentials, NoteRecord, NotificationRecord, UserInfo};

/// Fake backend holding records and notes in memory.
///
/// Queued pages and queued failures take precedence over the stored data, so
/// tests can script envelope quirks and remote rejections per operation.
#[derive(Clone, Default)]
pub struct FakeGateway {
    state: Arc<Mutex<FakeState>>,
}

#[derive(Default)]
struct FakeState {
    records: Vec<NotificationRecord>,
    notes: BTreeMap<i64, NoteRecord>,
    next_record_id: i64,
    next_note_id: i64,
    echo_created: bool,
    pages: VecDeque<Result<NotificationPage>>,
    failures: HashMap<&'static str, VecDeque<Error>>,
    list_queries: Vec<ListQuery>,
    calls: Vec<&'static str>,
    stall_lists: Option<Arc<Notify>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        let gateway = Self::default();
        {
            let mut state = gateway.state();
            state.next_record_id = 100;
            state.next_note_id = 9000;
            state.echo_created = true;
        }
        gateway
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub fn with_records(self, records: Vec<NotificationRecord>) -> Self {
        self.state().records = records;
        self
    }

    pub fn push_page(&self, page: Result<NotificationPage>) {
        self.state().pages.push_back(page);
    }

    /// Make the next call of `operation` fail with `error`.
    pub fn fail_next(&self, operation: &'static str, error: Error) {
        self.state()
            .failures
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    /// Whether `create_notification` echoes the created record.
    pub fn set_echo_created(&self, echo: bool) {
        self.state().echo_created = echo;
    }

    /// Start note ids at `next` so they never coincide with record ids.
    pub fn set_next_note_id(&self, next: i64) {
        self.state().next_note_id = next;
    }

    /// Make list calls wait until the returned handle is notified.
    pub fn stall_lists(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.state().stall_lists = Some(Arc::clone(&notify));
        notify
    }

    pub fn insert_note(&self, note: NoteRecord) {
        self.state().notes.insert(note.id, note);
    }

    pub fn note(&self, note_id: i64) -> Option<NoteRecord> {
        self.state().notes.get(&note_id).cloned()
    }

    pub fn records(&self) -> Vec<NotificationRecord> {
        self.state().records.clone()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state().calls.clone()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|call| **call == operation)
            .count()
    }

    pub fn list_page_numbers(&self) -> Vec<u32> {
        self.state()
            .list_queries
            .iter()
            .map(|query| query.page_number)
            .collect()
    }

    fn begin(
        &self,
        operation: &'static str,
        token: Option<&str>,
    ) -> Result<MutexGuard<'_, FakeState>> {
        if let Some(token) = token {
            require_token(token)?;
        }
        let mut state = self.state();
        state.calls.push(operation);
        if let Some(error) = state
            .failures
            .get_mut(operation)
            .and_then(VecDeque::pop_front)
        {
            return Err(error);
        }
        Ok(state)
    }
}

#[async_trait]
impl NotificationGateway for FakeGateway {
    async fn login(&self, credentials: &Credentials) -> Result<AuthSession> {
        self.begin("login", None)?;
        Ok(AuthSession {
            token: format!("token-{}", credentials.username),
            expires_at: None,
            user: UserInfo {
                user_id: Some("1".to_string()),
                user_name: Some(credentials.username.clone()),
                email: None,
            },
        })
    }

    async fn list_notifications(
        &self,
        token: &str,
        query: &ListQuery,
    ) -> Result<NotificationPage> {
        let stall = self.state().stall_lists.clone();
        if let Some(stall) = stall {
            stall.notified().await;
        }
        let mut state = self.begin("list", Some(token))?;
        state.list_queries.push(query.clone());
        if let Some(page) = state.pages.pop_front() {
            return page;
        }
        let records = state.records.clone();
        Ok(NotificationPage {
            total_count: i64::try_from(records.len()).unwrap_or(i64::MAX),
            records,
        })
    }

    async fn create_notification(
        &self,
        token: &str,
        record: &NotificationRecord,
    ) -> Result<Option<NotificationRecord>> {
        let mut state = self.begin("create", Some(token))?;
        let mut created = record.clone();
        created.id = state.next_record_id;
        state.next_record_id += 1;
        state.records.insert(0, created.clone());
        Ok(state.echo_created.then_some(created))
    }

    async fn update_notification(&self, token: &str, record: &NotificationRecord) -> Result<()> {
        let mut state = self.begin("update", Some(token))?;
        let Some(existing) = state.records.iter_mut().find(|item| item.id == record.id) else {
            return Err(Error::remote_rejected(None, None, "record not found"));
        };
        *existing = record.clone();
        Ok(())
    }

    async fn delete_notification(&self, token: &str, record: &NotificationRecord) -> Result<()> {
        let mut state = self.begin("delete", Some(token))?;
        state.records.retain(|item| item.id != record.id);
        Ok(())
    }

    async fn add_note(&self, token: &str, parent_id: i64, text: &str) -> Result<NoteRecord> {
        let mut state = self.begin("add_note", Some(token))?;
        let mut note = NoteRecord::new_for(parent_id, text);
        note.id = state.next_note_id;
        state.next_note_id += 1;
        state.notes.insert(note.id, note.clone());
        Ok(note)
    }

    async fn get_note(&self, token: &str, note_id: i64) -> Result<NoteRecord> {
        let state = self.begin("get_note", Some(token))?;
        state
            .notes
            .get(&note_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("note {note_id}")))
    }

    async fn update_note(&self, token: &str, note: &NoteRecord) -> Result<()> {
        let mut state = self.begin("update_note", Some(token))?;
        if !state.notes.contains_key(&note.id) {
            return Err(Error::NotFound(format!("note {}", note.id)));
        }
        state.notes.insert(note.id, note.clone());
        Ok(())
    }

    async fn delete_note(&self, token: &str, note: &NoteRecord) -> Result<()> {
        let mut state = self.begin("delete_note", Some(token))?;
        state.notes.remove(&note.id);
        Ok(())
    }
}
