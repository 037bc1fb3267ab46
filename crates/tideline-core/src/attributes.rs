//! Per-entry display attributes that persist across snapshot rebuilds.

use std::collections::HashMap;

use tideline_types::{Attribute, EntryId};
use tracing::trace;

use crate::snapshot::Snapshot;

/// Keyed store of [`Attribute`] values.
///
/// An entry's attribute lives from the first snapshot containing the entry
/// until the first snapshot that no longer contains it. Snapshots carry copies;
/// this map is the single owner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeCache {
    attributes: HashMap<EntryId, Attribute>,
}

impl AttributeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a cache from the attributes carried by a snapshot.
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            attributes: snapshot.attributes().collect(),
        }
    }

    pub fn get(&self, entry_id: &EntryId) -> Option<&Attribute> {
        self.attributes.get(entry_id)
    }

    /// The cached attribute, or a fresh default one for an unseen entry.
    pub fn attribute_or_default(&self, entry_id: &EntryId) -> Attribute {
        self.attributes.get(entry_id).copied().unwrap_or_default()
    }

    /// Record the reader revealing (or re-hiding) content behind a warning.
    ///
    /// Returns true if a known entry's value changed. Unknown entries are
    /// ignored: an attribute only exists while its entry is displayed.
    pub fn set_content_revealed(&mut self, entry_id: &EntryId, revealed: bool) -> bool {
        match self.attributes.get_mut(entry_id) {
            Some(attribute) if attribute.is_content_revealed != revealed => {
                attribute.is_content_revealed = revealed;
                true
            }
            _ => false,
        }
    }

    /// Adopt the attributes of a newly applied snapshot and drop every entry
    /// that is no longer displayed.
    pub fn retain_snapshot(&mut self, snapshot: &Snapshot) {
        let before = self.attributes.len();
        self.attributes = snapshot.attributes().collect();
        trace!(
            before,
            after = self.attributes.len(),
            "attribute cache refreshed from snapshot"
        );
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}
