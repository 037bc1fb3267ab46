//! In-memory timeline index store.

use std::collections::BTreeMap;

use parking_lot::{Mutex, RwLock};
use tideline_types::{Entry, EntryFilter, EntryId};
use tokio::sync::broadcast;
use tracing::trace;

use crate::{ChangeNotifier, StoreChanged, StoreError, TimelineIndexStore};

/// Store keyed by entry id, held entirely in memory.
#[derive(Debug)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<EntryId, Entry>>,
    notifier: ChangeNotifier,
    /// Injected failure for the next fetch.
    fail_next: Mutex<Option<String>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            notifier: ChangeNotifier::new(),
            fail_next: Mutex::new(None),
        }
    }

    /// Insert or replace an entry.
    pub fn upsert(&self, entry: Entry) {
        self.entries.write().insert(entry.id, entry);
        self.notifier.notify();
    }

    /// Insert or replace a page of entries with a single notification.
    pub fn upsert_many(&self, entries: impl IntoIterator<Item = Entry>) {
        let mut map = self.entries.write();
        let before = map.len();
        let mut touched = 0;
        for entry in entries {
            map.insert(entry.id, entry);
            touched += 1;
        }
        trace!(touched, added = map.len() - before, "memory store page upserted");
        drop(map);
        if touched > 0 {
            self.notifier.notify();
        }
    }

    /// Set or clear the gap flag. Returns false if the entry is unknown or
    /// already had that value.
    pub fn set_has_more(&self, id: &EntryId, has_more: bool) -> bool {
        let changed = match self.entries.write().get_mut(id) {
            Some(entry) if entry.has_more != has_more => {
                entry.has_more = has_more;
                true
            }
            _ => false,
        };
        if changed {
            self.notifier.notify();
        }
        changed
    }

    /// Soft-delete an entry. Returns false if unknown or already deleted.
    pub fn mark_deleted(&self, id: &EntryId, deleted_at: i64) -> bool {
        let changed = match self.entries.write().get_mut(id) {
            Some(entry) if entry.deleted_at.is_none() => {
                entry.deleted_at = Some(deleted_at);
                true
            }
            _ => false,
        };
        if changed {
            self.notifier.notify();
        }
        changed
    }

    pub fn remove(&self, id: &EntryId) -> Option<Entry> {
        let removed = self.entries.write().remove(id);
        if removed.is_some() {
            self.notifier.notify();
        }
        removed
    }

    pub fn clear(&self) {
        let had_entries = {
            let mut map = self.entries.write();
            let had = !map.is_empty();
            map.clear();
            had
        };
        if had_entries {
            self.notifier.notify();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Make the next `fetch` fail with [`StoreError::Unavailable`].
    pub fn fail_next_fetch(&self, reason: impl Into<String>) {
        *self.fail_next.lock() = Some(reason.into());
    }
}

impl TimelineIndexStore for MemoryStore {
    fn fetch(&self, filter: &EntryFilter) -> Result<Vec<Entry>, StoreError> {
        if let Some(reason) = self.fail_next.lock().take() {
            return Err(StoreError::Unavailable(reason));
        }

        let mut entries: Vec<Entry> = self
            .entries
            .read()
            .values()
            .filter(|entry| filter.matches(entry))
            .cloned()
            .collect();
        entries.sort_by(Entry::store_order);
        Ok(entries)
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChanged> {
        self.notifier.subscribe()
    }
}
