//! SQLite persistence for the home timeline index.
//!
//! One row per entry; the primary sort order is served by an index on
//! `(domain, user_id, sort_key)`.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use tideline_types::{Entry, EntryFilter, EntryId, TimelineScope};
use tokio::sync::broadcast;
use tracing::{debug, trace};

use crate::{ChangeNotifier, StoreChanged, StoreError, TimelineIndexStore};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS home_timeline_index (
    id BLOB PRIMARY KEY,
    domain TEXT NOT NULL,
    user_id TEXT NOT NULL,
    sort_key INTEGER NOT NULL,
    has_more INTEGER NOT NULL DEFAULT 0,
    deleted_at INTEGER
);
CREATE INDEX IF NOT EXISTS idx_home_timeline_scope
    ON home_timeline_index(domain, user_id, sort_key);
"#;

const UPSERT: &str = r#"
INSERT INTO home_timeline_index (id, domain, user_id, sort_key, has_more, deleted_at)
VALUES (?1, ?2, ?3, ?4, ?5, ?6)
ON CONFLICT(id) DO UPDATE SET
    domain = excluded.domain,
    user_id = excluded.user_id,
    sort_key = excluded.sort_key,
    has_more = excluded.has_more,
    deleted_at = excluded.deleted_at
"#;

const SELECT_SCOPE: &str = r#"
SELECT id, domain, user_id, sort_key, has_more, deleted_at
FROM home_timeline_index
WHERE domain = ?1 AND user_id = ?2 AND (?3 OR deleted_at IS NULL)
ORDER BY sort_key DESC, id DESC
"#;

/// Raw column values, decoded outside the rusqlite row callback.
type RawRow = (Vec<u8>, String, String, i64, bool, Option<i64>);

/// Database-backed timeline index store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    notifier: ChangeNotifier,
}

impl SqliteStore {
    /// Open (or create) a store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening timeline index database");
        Self::init(Connection::open(path)?)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            notifier: ChangeNotifier::new(),
        })
    }

    /// Insert or replace an entry.
    pub fn upsert(&self, entry: &Entry) -> Result<(), StoreError> {
        upsert_with(&self.conn.lock(), entry)?;
        self.notifier.notify();
        Ok(())
    }

    /// Insert or replace a page of entries in one transaction, with a single
    /// notification after commit.
    pub fn upsert_many(&self, entries: &[Entry]) -> Result<(), StoreError> {
        if entries.is_empty() {
            return Ok(());
        }
        {
            let mut conn = self.conn.lock();
            let tx = conn.transaction()?;
            for entry in entries {
                upsert_with(&tx, entry)?;
            }
            tx.commit()?;
        }
        trace!(count = entries.len(), "sqlite store page upserted");
        self.notifier.notify();
        Ok(())
    }

    /// Set or clear the gap flag. Returns false if nothing changed.
    pub fn set_has_more(&self, id: &EntryId, has_more: bool) -> Result<bool, StoreError> {
        let changed = self.conn.lock().execute(
            "UPDATE home_timeline_index SET has_more = ?2 WHERE id = ?1 AND has_more != ?2",
            params![id.as_bytes().as_slice(), has_more],
        )?;
        self.notify_if(changed > 0)
    }

    /// Soft-delete an entry. Returns false if unknown or already deleted.
    pub fn mark_deleted(&self, id: &EntryId, deleted_at: i64) -> Result<bool, StoreError> {
        let changed = self.conn.lock().execute(
            "UPDATE home_timeline_index SET deleted_at = ?2 WHERE id = ?1 AND deleted_at IS NULL",
            params![id.as_bytes().as_slice(), deleted_at],
        )?;
        self.notify_if(changed > 0)
    }

    pub fn remove(&self, id: &EntryId) -> Result<bool, StoreError> {
        let changed = self.conn.lock().execute(
            "DELETE FROM home_timeline_index WHERE id = ?1",
            params![id.as_bytes().as_slice()],
        )?;
        self.notify_if(changed > 0)
    }

    /// Look up a single entry regardless of scope or deletion.
    pub fn get(&self, id: &EntryId) -> Result<Option<Entry>, StoreError> {
        let raw: Option<RawRow> = self
            .conn
            .lock()
            .query_row(
                "SELECT id, domain, user_id, sort_key, has_more, deleted_at
                 FROM home_timeline_index WHERE id = ?1",
                params![id.as_bytes().as_slice()],
                read_row,
            )
            .optional()?;
        raw.map(decode_row).transpose()
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM home_timeline_index", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    fn notify_if(&self, changed: bool) -> Result<bool, StoreError> {
        if changed {
            self.notifier.notify();
        }
        Ok(changed)
    }
}

impl TimelineIndexStore for SqliteStore {
    fn fetch(&self, filter: &EntryFilter) -> Result<Vec<Entry>, StoreError> {
        let rows: Vec<RawRow> = {
            let conn = self.conn.lock();
            let mut stmt = conn.prepare_cached(SELECT_SCOPE)?;
            let rows = stmt
                .query_map(
                    params![filter.scope.domain, filter.scope.user_id, filter.include_deleted],
                    read_row,
                )?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };
        rows.into_iter().map(decode_row).collect()
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChanged> {
        self.notifier.subscribe()
    }
}

fn upsert_with(conn: &Connection, entry: &Entry) -> rusqlite::Result<usize> {
    let mut stmt = conn.prepare_cached(UPSERT)?;
    stmt.execute(params![
        entry.id.as_bytes().as_slice(),
        entry.scope.domain,
        entry.scope.user_id,
        entry.sort_key,
        entry.has_more,
        entry.deleted_at,
    ])
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn decode_row((id, domain, user_id, sort_key, has_more, deleted_at): RawRow) -> Result<Entry, StoreError> {
    let id = EntryId::try_from_slice(&id)
        .ok_or_else(|| StoreError::Corrupt(format!("entry id has {} bytes, expected 16", id.len())))?;
    Ok(Entry {
        id,
        scope: TimelineScope { domain, user_id },
        sort_key,
        has_more,
        deleted_at,
    })
}
