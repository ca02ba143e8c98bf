//! In-memory source of truth for records, starred ids and notes.
//!
//! [`NotificationReconciler`] pairs every confirmed backend mutation with the
//! matching alarm side effect, so local timers only ever reflect state the
//! backend accepted. Operations are plain `async fn`s: dropping a future
//! abandons the operation with no compensating action, and the next
//! [`NotificationReconciler::refresh`] reconciles whatever the backend holds.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};

use crate::config::DEFAULT_PAGE_SIZE;
use crate::error::{Error, Result};
use crate::filter::{self, NotificationFilter};
use crate::gateway::{fetch_all_notifications, NotificationGateway};
use crate::models::{NoteRecord, NotificationDraft, NotificationId, NotificationRecord};
use crate::scheduler::{AlarmPlatform, AlarmScheduler};
use crate::store::{CredentialStore, KeyValueStore, NoteIdMap, PriorityStore};

pub const DEFAULT_PREFETCH_CONCURRENCY: usize = 4;

/// Point-in-time copy of the reconciler state for rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilerSnapshot {
    pub records: Vec<NotificationRecord>,
    pub priority_ids: BTreeSet<NotificationId>,
    pub notes_by_record_id: BTreeMap<NotificationId, NoteRecord>,
    pub last_error: Option<String>,
    pub is_loading: bool,
}

#[derive(Default)]
struct ReconcilerState {
    records: Vec<NotificationRecord>,
    priority_ids: BTreeSet<NotificationId>,
    notes_by_record_id: BTreeMap<NotificationId, NoteRecord>,
    /// Note ids learned during this session, keyed by parent record id.
    session_note_ids: HashMap<NotificationId, i64>,
    last_error: Option<String>,
    active_loads: usize,
}

pub struct NotificationReconciler<G, P, S>
where
    G: NotificationGateway,
    P: AlarmPlatform,
    S: KeyValueStore,
{
    gateway: Arc<G>,
    scheduler: Arc<AlarmScheduler<P>>,
    credentials: CredentialStore<S>,
    priorities: PriorityStore<S>,
    note_ids: NoteIdMap<S>,
    page_size: u32,
    prefetch_concurrency: usize,
    state: Mutex<ReconcilerState>,
}

impl<G, P, S> NotificationReconciler<G, P, S>
where
    G: NotificationGateway,
    P: AlarmPlatform,
    S: KeyValueStore,
{
    /// Build a reconciler; the persisted starred ids are loaded immediately.
    pub fn new(gateway: Arc<G>, scheduler: Arc<AlarmScheduler<P>>, store: S) -> Result<Self> {
        let priorities = PriorityStore::new(store.clone());
        let state = ReconcilerState {
            priority_ids: priorities.load()?,
            ..ReconcilerState::default()
        };
        Ok(Self {
            gateway,
            scheduler,
            credentials: CredentialStore::new(store.clone()),
            priorities,
            note_ids: NoteIdMap::new(store),
            page_size: DEFAULT_PAGE_SIZE,
            prefetch_concurrency: DEFAULT_PREFETCH_CONCURRENCY,
            state: Mutex::new(state),
        })
    }

    #[must_use]
    pub const fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    #[must_use]
    pub fn with_prefetch_concurrency(mut self, concurrency: usize) -> Self {
        self.prefetch_concurrency = concurrency.max(1);
        self
    }

    pub const fn scheduler(&self) -> &Arc<AlarmScheduler<P>> {
        &self.scheduler
    }

    fn state(&self) -> MutexGuard<'_, ReconcilerState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Record `error` as the visible failure and hand it back.
    fn fail<T>(&self, operation: &str, error: Error) -> Result<T> {
        tracing::warn!(operation, %error, "Operation failed");
        self.state().last_error = Some(error.to_string());
        Err(error)
    }

    fn token(&self, operation: &str) -> Result<String> {
        match self.credentials.require_token() {
            Ok(token) => Ok(token),
            Err(error) => self.fail(operation, error),
        }
    }

    /// Reload the record list and rebuild the note cache.
    ///
    /// On failure the previous records stay in place and the error is kept
    /// in `last_error`. Note lookups are best effort: a failed lookup just
    /// leaves that record without a cached note.
    pub async fn refresh(&self) -> Result<usize> {
        let _loading = LoadingGuard::start(&self.state);
        let token = self.token("refresh")?;

        let records = match fetch_all_notifications(self.gateway.as_ref(), &token, self.page_size)
            .await
        {
            Ok(records) => records,
            Err(error) => return self.fail("refresh", error),
        };
        let count = records.len();
        let ids = records.iter().map(|record| record.id).collect::<Vec<_>>();
        {
            let mut state = self.state();
            state.records = records;
            state.last_error = None;
        }
        tracing::info!(count, "Notifications refreshed");

        let notes = self.prefetch_notes(&token, ids).await;
        self.state().notes_by_record_id = notes;
        Ok(count)
    }

    async fn prefetch_notes(
        &self,
        token: &str,
        parent_ids: Vec<NotificationId>,
    ) -> BTreeMap<NotificationId, NoteRecord> {
        let lookups = parent_ids
            .into_iter()
            .filter(|parent_id| *parent_id != 0)
            .map(|parent_id| {
                let note_id = self.resolve_note_id(parent_id);
                async move {
                    let result = self.gateway.get_note(token, note_id).await;
                    (parent_id, note_id, result)
                }
            });
        let results = stream::iter(lookups)
            .buffer_unordered(self.prefetch_concurrency)
            .collect::<Vec<_>>()
            .await;

        let mut notes = BTreeMap::new();
        let mut state = self.state();
        for (parent_id, note_id, result) in results {
            match result {
                Ok(note) => {
                    state.session_note_ids.insert(parent_id, note.id);
                    notes.insert(parent_id, note);
                }
                Err(Error::NotFound(_)) => {}
                Err(error) => {
                    tracing::debug!(parent_id, note_id, %error, "Note prefetch failed");
                }
            }
        }
        notes
    }

    /// Create a record from user input.
    ///
    /// Invalid input fails before any network call. On success the echoed
    /// record gets an alarm and the list is refreshed; a failed refresh is
    /// left in `last_error` without failing the create.
    pub async fn create(&self, draft: NotificationDraft) -> Result<Option<NotificationRecord>> {
        let record = draft.into_record();
        if let Err(error) = record.validate() {
            return self.fail("create", error);
        }
        let token = self.token("create")?;

        let created = match self.gateway.create_notification(&token, &record).await {
            Ok(created) => created,
            Err(error) => return self.fail("create", error),
        };
        match &created {
            Some(created) => {
                tracing::info!(id = created.id, "Notification created");
                self.scheduler.schedule(created);
            }
            None => tracing::info!("Notification created; backend did not echo the record"),
        }
        self.refresh_after("create").await;
        Ok(created)
    }

    /// Push an edited record; its alarm is rescheduled only on success.
    pub async fn update(&self, record: &NotificationRecord) -> Result<()> {
        if let Err(error) = record.validate() {
            return self.fail("update", error);
        }
        let token = self.token("update")?;

        if let Err(error) = self.gateway.update_notification(&token, record).await {
            return self.fail("update", error);
        }
        tracing::info!(id = record.id, "Notification updated");
        self.scheduler.reschedule(record);
        self.refresh_after("update").await;
        Ok(())
    }

    /// Delete a record; its alarm is cancelled only on success.
    pub async fn delete(&self, record: &NotificationRecord) -> Result<()> {
        if record.id == 0 {
            return self.fail(
                "delete",
                Error::validation("record has not been created yet"),
            );
        }
        let token = self.token("delete")?;

        if let Err(error) = self.gateway.delete_notification(&token, record).await {
            return self.fail("delete", error);
        }
        tracing::info!(id = record.id, "Notification deleted");
        self.scheduler.cancel(record.id);
        self.refresh_after("delete").await;
        Ok(())
    }

    async fn refresh_after(&self, operation: &str) {
        if let Err(error) = self.refresh().await {
            tracing::warn!(operation, %error, "Refresh after mutation failed");
        }
    }

    /// Star or unstar a record. Local only; returns the updated set.
    pub fn toggle_priority(&self, id: NotificationId) -> Result<BTreeSet<NotificationId>> {
        let ids = self.priorities.toggle(id)?;
        self.state().priority_ids.clone_from(&ids);
        Ok(ids)
    }

    /// Attach a note to a record and remember the backend-assigned note id.
    pub async fn add_note(&self, parent_id: NotificationId, text: &str) -> Result<NoteRecord> {
        let text = text.trim();
        if text.is_empty() {
            return self.fail("add_note", Error::validation("note text must not be empty"));
        }
        let token = self.token("add_note")?;

        let mut note = match self.gateway.add_note(&token, parent_id, text).await {
            Ok(note) => note,
            Err(error) => return self.fail("add_note", error),
        };
        if note.text.is_none() {
            note.text = Some(text.to_string());
        }
        if let Err(error) = self.note_ids.save(parent_id, note.id) {
            return self.fail("add_note", error);
        }
        let mut state = self.state();
        state.session_note_ids.insert(parent_id, note.id);
        state.notes_by_record_id.insert(parent_id, note.clone());
        drop(state);
        tracing::info!(parent_id, note_id = note.id, "Note added");
        Ok(note)
    }

    /// Fetch the note for a record.
    ///
    /// The note id is resolved from this session's lookups, then the
    /// persisted mapping, then the record id itself. Any failure other than
    /// a missing token means "no note" and clears the cached entry.
    pub async fn get_note(&self, parent_id: NotificationId) -> Result<Option<NoteRecord>> {
        let token = self.token("get_note")?;
        let note_id = self.resolve_note_id(parent_id);

        match self.gateway.get_note(&token, note_id).await {
            Ok(note) => {
                let mut state = self.state();
                state.session_note_ids.insert(parent_id, note.id);
                state.notes_by_record_id.insert(parent_id, note.clone());
                Ok(Some(note))
            }
            Err(Error::AuthRequired) => self.fail("get_note", Error::AuthRequired),
            Err(error) => {
                tracing::debug!(parent_id, note_id, %error, "No note for record");
                self.state().notes_by_record_id.remove(&parent_id);
                Ok(None)
            }
        }
    }

    /// Replace the text of the cached note for a record.
    pub async fn update_note(&self, parent_id: NotificationId, text: &str) -> Result<NoteRecord> {
        let text = text.trim();
        if text.is_empty() {
            return self.fail("update_note", Error::validation("note text must not be empty"));
        }
        let cached = match self.cached_note(parent_id) {
            Ok(cached) => cached,
            Err(error) => return self.fail("update_note", error),
        };
        let token = self.token("update_note")?;

        let note = NoteRecord {
            text: Some(text.to_string()),
            parent_id: cached
                .parent_id
                .clone()
                .or_else(|| Some(parent_id.to_string())),
            ..cached
        };
        if let Err(error) = self.gateway.update_note(&token, &note).await {
            return self.fail("update_note", error);
        }
        self.state()
            .notes_by_record_id
            .insert(parent_id, note.clone());
        tracing::info!(parent_id, note_id = note.id, "Note updated");
        Ok(note)
    }

    /// Delete the cached note for a record and forget its id mapping.
    pub async fn delete_note(&self, parent_id: NotificationId) -> Result<()> {
        let cached = match self.cached_note(parent_id) {
            Ok(cached) => cached,
            Err(error) => return self.fail("delete_note", error),
        };
        let token = self.token("delete_note")?;

        if let Err(error) = self.gateway.delete_note(&token, &cached).await {
            return self.fail("delete_note", error);
        }
        {
            let mut state = self.state();
            state.notes_by_record_id.remove(&parent_id);
            state.session_note_ids.remove(&parent_id);
        }
        if let Err(error) = self.note_ids.clear(parent_id) {
            return self.fail("delete_note", error);
        }
        tracing::info!(parent_id, note_id = cached.id, "Note deleted");
        Ok(())
    }

    fn cached_note(&self, parent_id: NotificationId) -> Result<NoteRecord> {
        self.state()
            .notes_by_record_id
            .get(&parent_id)
            .cloned()
            .ok_or_else(|| {
                Error::validation(format!(
                    "no note is loaded for record {parent_id}; fetch it first"
                ))
            })
    }

    /// Session id, then persisted mapping, then the parent id itself.
    ///
    /// The backend aliases note ids and parent ids inconsistently, so this
    /// chain is a best guess and can target the wrong note when neither id
    /// was recorded. Mappings are kept per parent; a single global "last
    /// note id" would leak across records.
    fn resolve_note_id(&self, parent_id: NotificationId) -> i64 {
        if let Some(note_id) = self.state().session_note_ids.get(&parent_id) {
            return *note_id;
        }
        match self.note_ids.get(parent_id) {
            Ok(Some(note_id)) => note_id,
            Ok(None) => parent_id,
            Err(error) => {
                tracing::warn!(parent_id, %error, "Ignoring unreadable note id mapping");
                parent_id
            }
        }
    }

    /// Re-arm alarms for every loaded record with a future time.
    pub fn restore_alarms(&self) -> usize {
        let records = self.records();
        self.scheduler.restore(&records)
    }

    pub fn records(&self) -> Vec<NotificationRecord> {
        self.state().records.clone()
    }

    pub fn record(&self, id: NotificationId) -> Option<NotificationRecord> {
        self.state()
            .records
            .iter()
            .find(|record| record.id == id)
            .cloned()
    }

    pub fn priority_ids(&self) -> BTreeSet<NotificationId> {
        self.state().priority_ids.clone()
    }

    pub fn note_for(&self, parent_id: NotificationId) -> Option<NoteRecord> {
        self.state().notes_by_record_id.get(&parent_id).cloned()
    }

    pub fn last_error(&self) -> Option<String> {
        self.state().last_error.clone()
    }

    pub fn clear_error(&self) {
        self.state().last_error = None;
    }

    pub fn is_loading(&self) -> bool {
        self.state().active_loads > 0
    }

    pub fn snapshot(&self) -> ReconcilerSnapshot {
        let state = self.state();
        ReconcilerSnapshot {
            records: state.records.clone(),
            priority_ids: state.priority_ids.clone(),
            notes_by_record_id: state.notes_by_record_id.clone(),
            last_error: state.last_error.clone(),
            is_loading: state.active_loads > 0,
        }
    }

    /// Loaded records matching `filter`, starred first.
    pub fn filtered_sorted(&self, filter: &NotificationFilter) -> Vec<NotificationRecord> {
        let state = self.state();
        filter::filtered_sorted(&state.records, &state.priority_ids, filter)
    }

    pub fn entered_by_names(&self) -> Vec<String> {
        filter::collect_entered_by(&self.state().records)
    }

    pub fn dates_with_records(&self) -> BTreeSet<NaiveDate> {
        filter::dates_with_records(&self.state().records)
    }

    pub fn records_on(&self, date: NaiveDate) -> Vec<NotificationRecord> {
        filter::records_on(&self.state().records, date)
    }
}

/// Marks a refresh in flight; released on completion, failure or drop.
struct LoadingGuard<'a> {
    state: &'a Mutex<ReconcilerState>,
}

impl<'a> LoadingGuard<'a> {
    fn start(state: &'a Mutex<ReconcilerState>) -> Self {
        lock(state).active_loads += 1;
        Self { state }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let mut state = lock(self.state);
        state.active_loads = state.active_loads.saturating_sub(1);
    }
}

fn lock(state: &Mutex<ReconcilerState>) -> MutexGuard<'_, ReconcilerState> {
    state
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}
