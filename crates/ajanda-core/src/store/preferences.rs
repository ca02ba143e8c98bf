//! Starred record ids and the parent → note id mapping.

use std::collections::BTreeSet;

use super::KeyValueStore;
use crate::error::Result;
use crate::models::NotificationId;

pub const KEY_PRIORITY_IDS: &str = "priority_ids";
pub const NOTE_ID_KEY_PREFIX: &str = "note_id:";

/// Persisted set of starred record ids.
///
/// Membership is independent of the record list: deleting a record does not
/// unstar it.
#[derive(Debug, Clone)]
pub struct PriorityStore<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> PriorityStore<S> {
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Starred ids; unparseable entries are skipped.
    pub fn load(&self) -> Result<BTreeSet<NotificationId>> {
        Ok(self
            .store
            .get_string_set(KEY_PRIORITY_IDS)?
            .iter()
            .filter_map(|raw| raw.trim().parse().ok())
            .collect())
    }

    pub fn contains(&self, id: NotificationId) -> Result<bool> {
        Ok(self.load()?.contains(&id))
    }

    /// Flip membership of `id` and return the updated set.
    pub fn toggle(&self, id: NotificationId) -> Result<BTreeSet<NotificationId>> {
        let mut ids = self.load()?;
        if !ids.remove(&id) {
            ids.insert(id);
        }
        let raw: BTreeSet<String> = ids.iter().map(ToString::to_string).collect();
        self.store.set_string_set(KEY_PRIORITY_IDS, &raw)?;
        Ok(ids)
    }
}

/// Persisted mapping from a record id to the id of its backend note.
#[derive(Debug, Clone)]
pub struct NoteIdMap<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> NoteIdMap<S> {
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    pub fn get(&self, parent_id: NotificationId) -> Result<Option<i64>> {
        self.store.get_i64(&note_key(parent_id))
    }

    pub fn save(&self, parent_id: NotificationId, note_id: i64) -> Result<()> {
        self.store.set_i64(&note_key(parent_id), note_id)
    }

    pub fn clear(&self, parent_id: NotificationId) -> Result<()> {
        self.store.remove(&note_key(parent_id))
    }
}

fn note_key(parent_id: NotificationId) -> String {
    format!("{NOTE_ID_KEY_PREFIX}{parent_id}")
}
