//! Timeline index storage.
//!
//! The reconciliation pipeline only needs two things from storage: "give me
//! the matching entries as of now" and "tell me when anything changed". That
//! boundary is [`TimelineIndexStore`]. Two implementations ship here:
//!
//! - [`MemoryStore`]: `BTreeMap` behind a `parking_lot` lock, for tests and
//!   ephemeral sessions
//! - [`SqliteStore`]: rusqlite-backed persistent store
//!
//! # Concurrency Model
//!
//! - Stores are `Send + Sync`; queries run on whatever thread calls them
//! - Change notifications go out on a tokio broadcast channel and carry no
//!   payload; consumers re-query
//! - A notification is sent after every mutation that changed something

use std::sync::Arc;

use thiserror::Error;
use tideline_types::{Entry, EntryFilter};
use tokio::sync::broadcast;

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Capacity of the change-notification channel. Notifications carry no data,
/// so a lagging receiver only needs to know it lagged.
const NOTIFY_CAPACITY: usize = 64;

/// The store mutated; re-query to see what changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreChanged;

/// Errors from store queries and mutations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Stored data could not be decoded.
    #[error("corrupt row: {0}")]
    Corrupt(String),
    /// The store cannot answer right now.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Ordered, filterable timeline entries with change notification.
pub trait TimelineIndexStore: Send + Sync {
    /// Entries matching `filter`, newest first (see [`Entry::store_order`]).
    fn fetch(&self, filter: &EntryFilter) -> Result<Vec<Entry>, StoreError>;

    /// Subscribe to change notifications.
    fn subscribe(&self) -> broadcast::Receiver<StoreChanged>;
}

/// Thread-safe store handle shared between the pipeline and writers.
pub type SharedStore = Arc<dyn TimelineIndexStore>;

/// Broadcast sender shared by the store implementations.
#[derive(Debug)]
pub(crate) struct ChangeNotifier {
    tx: broadcast::Sender<StoreChanged>,
}

impl ChangeNotifier {
    pub(crate) fn new() -> Self {
        let (tx, _) = broadcast::channel(NOTIFY_CAPACITY);
        Self { tx }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<StoreChanged> {
        self.tx.subscribe()
    }

    pub(crate) fn notify(&self) {
        // No subscribers is fine; nobody is watching yet.
        let _ = self.tx.send(StoreChanged);
    }
}
