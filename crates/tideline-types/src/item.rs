//! Display items and their identities.
//!
//! A [`DisplayItem`] is one row of the rendered timeline. Its [`ItemId`] is
//! what diffing and scroll anchoring match on: two `Content` items for the same
//! entry are the *same* item even when their attributes differ.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::EntryId;

/// Mutable per-entry display state.
///
/// Stored by value in the attribute cache; snapshots hold copies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attribute {
    /// Hide the row separator (a gap marker follows the row).
    /// Recomputed on every snapshot build.
    pub is_separator_hidden: bool,
    /// The reader expanded content hidden behind a content warning.
    /// User-controlled; survives rebuilds.
    pub is_content_revealed: bool,
}

/// One row of the display list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisplayItem {
    /// A timeline entry.
    Content { entry_id: EntryId, attribute: Attribute },
    /// A known discontinuity right after the entry `anchor`.
    GapMarker { anchor: EntryId },
    /// Trailing "load older" row.
    BottomLoader,
}

impl DisplayItem {
    pub fn content(entry_id: EntryId, attribute: Attribute) -> Self {
        DisplayItem::Content { entry_id, attribute }
    }

    /// Identity for diffing: variant tag + key fields.
    pub fn id(&self) -> ItemId {
        match self {
            DisplayItem::Content { entry_id, .. } => ItemId::Content(*entry_id),
            DisplayItem::GapMarker { anchor } => ItemId::Gap(*anchor),
            DisplayItem::BottomLoader => ItemId::BottomLoader,
        }
    }

    pub fn entry_id(&self) -> Option<EntryId> {
        match self {
            DisplayItem::Content { entry_id, .. } => Some(*entry_id),
            _ => None,
        }
    }

    pub fn attribute(&self) -> Option<&Attribute> {
        match self {
            DisplayItem::Content { attribute, .. } => Some(attribute),
            _ => None,
        }
    }

    pub fn is_content(&self) -> bool {
        matches!(self, DisplayItem::Content { .. })
    }
}

/// Identity key of a [`DisplayItem`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ItemId {
    Content(EntryId),
    Gap(EntryId),
    BottomLoader,
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemId::Content(id) => write!(f, "content:{}", id.short()),
            ItemId::Gap(id) => write!(f, "gap:{}", id.short()),
            ItemId::BottomLoader => f.write_str("bottom-loader"),
        }
    }
}
