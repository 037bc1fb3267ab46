//! Timeline entries and the filter used to query them.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::ids::EntryId;

/// Which account's home timeline an entry belongs to.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct TimelineScope {
    /// Server domain, e.g. `mastodon.social`.
    pub domain: String,
    /// Account id on that server.
    pub user_id: String,
}

impl TimelineScope {
    pub fn new(domain: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            user_id: user_id.into(),
        }
    }
}

/// One persisted home-timeline record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub scope: TimelineScope,
    /// Server creation time in milliseconds; primary sort key.
    pub sort_key: i64,
    /// A contiguous predecessor is known to be missing: there is a gap
    /// between this entry and the next one in store order.
    pub has_more: bool,
    /// Soft-delete timestamp. Deleted entries stay in the store until purged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<i64>,
}

impl Entry {
    pub fn new(id: EntryId, scope: TimelineScope, sort_key: i64) -> Self {
        Self {
            id,
            scope,
            sort_key,
            has_more: false,
            deleted_at: None,
        }
    }

    /// Builder-style setter for `has_more`.
    pub fn with_has_more(mut self, has_more: bool) -> Self {
        self.has_more = has_more;
        self
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Store order: newest first (`sort_key` descending), ties broken by id
    /// descending so the order is total.
    pub fn store_order(a: &Entry, b: &Entry) -> Ordering {
        b.sort_key.cmp(&a.sort_key).then_with(|| b.id.cmp(&a.id))
    }
}

/// Caller-supplied predicate for store range queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFilter {
    pub scope: TimelineScope,
    #[serde(default)]
    pub include_deleted: bool,
}

impl EntryFilter {
    /// Live (non-deleted) entries of one account's home timeline.
    pub fn home(scope: TimelineScope) -> Self {
        Self {
            scope,
            include_deleted: false,
        }
    }

    pub fn matches(&self, entry: &Entry) -> bool {
        entry.scope == self.scope && (self.include_deleted || !entry.is_deleted())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> TimelineScope {
        TimelineScope::new("example.social", "42")
    }

    #[test]
    fn test_store_order_newest_first() {
        let older = Entry::new(EntryId::new(), scope(), 100);
        let newer = Entry::new(EntryId::new(), scope(), 200);

        let mut entries = vec![older.clone(), newer.clone()];
        entries.sort_by(Entry::store_order);
        assert_eq!(entries, vec![newer, older]);
    }

    #[test]
    fn test_store_order_ties_break_on_id() {
        let a = Entry::new(EntryId::from_bytes([1; 16]), scope(), 100);
        let b = Entry::new(EntryId::from_bytes([2; 16]), scope(), 100);

        let mut entries = vec![a.clone(), b.clone()];
        entries.sort_by(Entry::store_order);
        assert_eq!(entries[0].id, b.id);
    }

    #[test]
    fn test_filter_excludes_other_scopes_and_deleted() {
        let filter = EntryFilter::home(scope());

        let mine = Entry::new(EntryId::new(), scope(), 1);
        let theirs = Entry::new(EntryId::new(), TimelineScope::new("example.social", "7"), 1);
        let mut deleted = Entry::new(EntryId::new(), scope(), 1);
        deleted.deleted_at = Some(5);

        assert!(filter.matches(&mine));
        assert!(!filter.matches(&theirs));
        assert!(!filter.matches(&deleted));

        let with_deleted = EntryFilter {
            include_deleted: true,
            ..filter
        };
        assert!(with_deleted.matches(&deleted));
    }
}
