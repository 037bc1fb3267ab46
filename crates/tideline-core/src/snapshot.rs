//! Immutable ordered display list with an identity index.

use indexmap::IndexMap;
use tideline_types::{Attribute, DisplayItem, EntryId, ItemId};

use crate::error::CoreError;

/// One reconciliation cycle's complete display list.
///
/// Items have unique identities; the index maps each [`ItemId`] to its
/// position so diffing and anchor lookup are O(1) per item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    items: Vec<DisplayItem>,
    index: IndexMap<ItemId, usize>,
}

impl Snapshot {
    /// An empty snapshot (the baseline before the first apply).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot from items, rejecting duplicate identities.
    pub fn new(items: Vec<DisplayItem>) -> Result<Self, CoreError> {
        let mut snapshot = Self {
            items: Vec::with_capacity(items.len()),
            index: IndexMap::with_capacity(items.len()),
        };
        for item in items {
            let id = item.id();
            if !snapshot.push(item) {
                return Err(CoreError::DuplicateItem(id));
            }
        }
        Ok(snapshot)
    }

    /// Append an item. Returns false (and leaves the snapshot untouched) if
    /// an item with the same identity is already present.
    pub(crate) fn push(&mut self, item: DisplayItem) -> bool {
        let id = item.id();
        if self.index.contains_key(&id) {
            return false;
        }
        self.index.insert(id, self.items.len());
        self.items.push(item);
        true
    }

    pub fn items(&self) -> &[DisplayItem] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &DisplayItem> {
        self.items.iter()
    }

    pub fn get(&self, index: usize) -> Option<&DisplayItem> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Position of the item with this identity.
    pub fn position(&self, id: &ItemId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.index.contains_key(id)
    }

    /// Identities in display order.
    pub fn ids(&self) -> impl Iterator<Item = &ItemId> {
        self.index.keys()
    }

    /// Entry ids of the content rows, in display order.
    pub fn entry_ids(&self) -> impl Iterator<Item = EntryId> + '_ {
        self.items.iter().filter_map(DisplayItem::entry_id)
    }

    /// Content rows with their attributes.
    pub fn attributes(&self) -> impl Iterator<Item = (EntryId, Attribute)> + '_ {
        self.items.iter().filter_map(|item| match item {
            DisplayItem::Content { entry_id, attribute } => Some((*entry_id, *attribute)),
            _ => None,
        })
    }

    pub fn content_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_content()).count()
    }

    pub fn gap_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item, DisplayItem::GapMarker { .. }))
            .count()
    }

    pub fn has_bottom_loader(&self) -> bool {
        self.contains(&ItemId::BottomLoader)
    }

    pub fn into_items(self) -> Vec<DisplayItem> {
        self.items
    }
}
