//! Snapshot construction from ordered store entries.
//!
//! Builds are pure: the same entries, attributes, and pagination state always
//! produce the same snapshot.

use std::collections::HashSet;

use tideline_types::{DisplayItem, Entry, PaginationState};
use tracing::{debug, warn};

use crate::attributes::AttributeCache;
use crate::snapshot::Snapshot;

/// A built snapshot plus what went into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutput {
    pub snapshot: Snapshot,
    /// Gap markers inserted between entries.
    pub gap_count: usize,
    /// The last entry had `has_more` set (a loader was wanted).
    pub wants_bottom_loader: bool,
    /// Entries dropped because their id appeared earlier in the input.
    pub skipped_duplicates: usize,
}

/// Build the display list for `entries` (already in store order).
///
/// - Each entry becomes a `Content` row carrying its cached attribute (or a
///   default one) with the separator flag recomputed.
/// - A non-last entry with `has_more` is followed by a `GapMarker` and has its
///   separator hidden.
/// - A last entry with `has_more` asks for a trailing `BottomLoader`, which is
///   appended unless pagination reports `NoMore`.
pub fn build(
    entries: &[Entry],
    previous: &AttributeCache,
    pagination: PaginationState,
) -> BuildOutput {
    let mut seen = HashSet::with_capacity(entries.len());
    let unique: Vec<&Entry> = entries.iter().filter(|entry| seen.insert(entry.id)).collect();
    let skipped_duplicates = entries.len() - unique.len();
    if skipped_duplicates > 0 {
        warn!(skipped_duplicates, "store returned duplicate entry ids; keeping first occurrence");
    }

    let mut snapshot = Snapshot::empty();
    let mut gap_count = 0;
    let mut wants_bottom_loader = false;
    let last_index = unique.len().saturating_sub(1);

    for (i, entry) in unique.iter().enumerate() {
        let mut attribute = previous.attribute_or_default(&entry.id);
        attribute.is_separator_hidden = false;

        let is_last = i == last_index;
        let add_gap = match (is_last, entry.has_more) {
            (false, true) => true,
            // The gap below the last entry may still be filled by paging.
            (true, true) => {
                wants_bottom_loader = true;
                false
            }
            _ => false,
        };
        if add_gap {
            attribute.is_separator_hidden = true;
        }

        snapshot.push(DisplayItem::content(entry.id, attribute));
        if add_gap {
            snapshot.push(DisplayItem::GapMarker { anchor: entry.id });
            gap_count += 1;
        }
    }

    if wants_bottom_loader && pagination.allows_bottom_loader() {
        snapshot.push(DisplayItem::BottomLoader);
    }

    debug!(
        entries = unique.len(),
        items = snapshot.len(),
        gaps = gap_count,
        bottom_loader = snapshot.has_bottom_loader(),
        %pagination,
        "built timeline snapshot"
    );

    BuildOutput {
        snapshot,
        gap_count,
        wants_bottom_loader,
        skipped_duplicates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tideline_types::{Attribute, EntryId, ItemId, TimelineScope};

    fn id(n: u8) -> EntryId {
        EntryId::from_bytes([n; 16])
    }

    fn entry(n: u8, has_more: bool) -> Entry {
        Entry::new(id(n), TimelineScope::new("example.social", "1"), 1_000 - i64::from(n))
            .with_has_more(has_more)
    }

    fn content(n: u8, separator_hidden: bool) -> DisplayItem {
        DisplayItem::content(
            id(n),
            Attribute {
                is_separator_hidden: separator_hidden,
                ..Attribute::default()
            },
        )
    }

    fn items(output: &BuildOutput) -> Vec<DisplayItem> {
        output.snapshot.items().to_vec()
    }

    // =========================================================================
    // Gap Rule
    // =========================================================================

    #[test]
    fn test_no_gaps_yields_one_row_per_entry() {
        let output = build(
            &[entry(1, false), entry(2, false), entry(3, false)],
            &AttributeCache::new(),
            PaginationState::NoMore,
        );

        assert_eq!(
            items(&output),
            vec![content(1, false), content(2, false), content(3, false)]
        );
        assert_eq!(output.gap_count, 0);
        assert!(!output.snapshot.has_bottom_loader());
    }

    #[test]
    fn test_no_gaps_never_adds_loader_even_with_more_pages() {
        let output = build(
            &[entry(1, false), entry(2, false)],
            &AttributeCache::new(),
            PaginationState::HasMore,
        );
        assert!(!output.snapshot.has_bottom_loader());
    }

    #[test]
    fn test_middle_gap_adds_marker_and_hides_separator() {
        let output = build(
            &[entry(1, true), entry(2, false)],
            &AttributeCache::new(),
            PaginationState::HasMore,
        );

        assert_eq!(
            items(&output),
            vec![
                content(1, true),
                DisplayItem::GapMarker { anchor: id(1) },
                content(2, false),
            ]
        );
        assert_eq!(output.gap_count, 1);
    }

    #[test]
    fn test_last_gap_adds_bottom_loader_not_marker() {
        let output = build(&[entry(1, true)], &AttributeCache::new(), PaginationState::HasMore);

        assert_eq!(items(&output), vec![content(1, false), DisplayItem::BottomLoader]);
        assert!(output.wants_bottom_loader);
    }

    #[test]
    fn test_last_gap_with_no_more_pages_has_no_loader() {
        let output = build(
            &[entry(1, false), entry(2, true)],
            &AttributeCache::new(),
            PaginationState::NoMore,
        );

        assert_eq!(items(&output), vec![content(1, false), content(2, false)]);
        assert!(output.wants_bottom_loader);
    }

    #[test]
    fn test_consecutive_gaps_are_not_merged() {
        let output = build(
            &[entry(1, true), entry(2, true), entry(3, true)],
            &AttributeCache::new(),
            PaginationState::Idle,
        );

        assert_eq!(
            items(&output),
            vec![
                content(1, true),
                DisplayItem::GapMarker { anchor: id(1) },
                content(2, true),
                DisplayItem::GapMarker { anchor: id(2) },
                content(3, false),
                DisplayItem::BottomLoader,
            ]
        );
        assert_eq!(output.gap_count, 2);
    }

    #[test]
    fn test_empty_entries() {
        let output = build(&[], &AttributeCache::new(), PaginationState::HasMore);
        assert!(output.snapshot.is_empty());
        assert!(!output.wants_bottom_loader);
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    #[test]
    fn test_cached_attributes_carry_over_with_separator_recomputed() {
        let previous = build(
            &[entry(1, true), entry(2, false)],
            &AttributeCache::new(),
            PaginationState::HasMore,
        );
        let mut cache = AttributeCache::from_snapshot(&previous.snapshot);
        cache.set_content_revealed(&id(1), true);

        // The gap after entry 1 was filled.
        let output = build(&[entry(1, false), entry(2, false)], &cache, PaginationState::HasMore);

        let attribute = output.snapshot.items()[0].attribute().copied().unwrap();
        assert!(attribute.is_content_revealed, "reader state survives the rebuild");
        assert!(!attribute.is_separator_hidden, "separator recomputed from the gap rule");
    }

    #[test]
    fn test_duplicate_entries_keep_first() {
        let output = build(
            &[entry(1, false), entry(2, true), entry(1, true)],
            &AttributeCache::new(),
            PaginationState::HasMore,
        );

        assert_eq!(output.skipped_duplicates, 1);
        assert_eq!(output.snapshot.content_count(), 2);
        // Entry 2 is the last unique entry, so its gap becomes a loader.
        assert_eq!(output.snapshot.position(&ItemId::BottomLoader), Some(2));
    }

    #[test]
    fn test_build_is_deterministic() {
        let entries = [entry(1, true), entry(2, false), entry(3, true)];
        let a = build(&entries, &AttributeCache::new(), PaginationState::HasMore);
        let b = build(&entries, &AttributeCache::new(), PaginationState::HasMore);
        assert_eq!(a, b);
    }
}
