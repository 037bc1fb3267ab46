//! Reconciliation core for a live home timeline.
//!
//! Turns the ordered entries of a timeline store into a display list, diffs
//! successive display lists without losing item identity, and keeps the
//! reader's scroll position stable across each update.
//!
//! # Pipeline
//!
//! ```text
//! entries ──build()──▶ Snapshot ──diff(old, new)──▶ EditScript
//!    ▲                    │                             │
//!    │             AttributeCache                       ▼
//!  store            (per-entry state)      compute_anchor(old) → compute_correction(new)
//! ```
//!
//! Every snapshot is immutable once built and handed along by value; the only
//! state carried between cycles lives in [`Reconciler`] (the applied baseline
//! and the [`AttributeCache`]).
//!
//! # Gap Rule
//!
//! | is last | has_more | result                                          |
//! |---------|----------|-------------------------------------------------|
//! | no      | yes      | gap marker after the entry, separator hidden    |
//! | yes     | yes      | bottom loader (unless pagination is `NoMore`)   |
//! | any     | no       | nothing extra                                   |

mod anchor;
mod attributes;
mod builder;
mod diff;
mod error;
mod reconciler;
mod snapshot;

pub use anchor::{RowFrame, ScrollAnchor, ScrollCorrection, Viewport, compute_anchor, compute_correction};
pub use attributes::AttributeCache;
pub use builder::{BuildOutput, build};
pub use diff::{Changeset, EditScript, Move, Update, diff};
pub use error::CoreError;
pub use reconciler::{Reconciler, Reconciliation};
pub use snapshot::Snapshot;

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use tideline_types::{DisplayItem, Entry, EntryId, PaginationState, TimelineScope};

    fn entry(n: u8, has_more: bool) -> Entry {
        Entry::new(
            EntryId::from_bytes([n; 16]),
            TimelineScope::new("example.social", "1"),
            1_000 - i64::from(n),
        )
        .with_has_more(has_more)
    }

    #[test]
    fn test_full_cycle_keeps_reading_position() {
        let mut reconciler = Reconciler::new();

        let first = reconciler.build(&[entry(3, false), entry(4, false)], PaginationState::HasMore);
        let initial = reconciler.prepare(first.snapshot);
        assert_eq!(initial.script, EditScript::Reload);
        reconciler.commit(initial);

        // Reader is looking at entry 4, 6px below the overlay.
        let viewport = Viewport { content_offset: 100.0, overlay_height: 44.0, height: 600.0 };
        let rows = [RowFrame { top: 0.0, height: 150.0 }, RowFrame { top: 150.0, height: 150.0 }];
        let anchor = compute_anchor(reconciler.current(), &viewport, &rows)
            .unwrap()
            .expect("entry 4 is visible");
        assert_eq!(anchor.offset, 6.0);

        // Two newer entries arrive above.
        let next = reconciler.build(
            &[entry(1, false), entry(2, false), entry(3, false), entry(4, false)],
            PaginationState::HasMore,
        );
        let reconciliation = reconciler.prepare(next.snapshot);
        let correction = compute_correction(&reconciliation.snapshot, &anchor).expect("still present");

        assert_eq!(correction.index, 3);
        assert_eq!(correction.offset, anchor.offset);
        let changes = reconciliation.script.changeset().expect("patch");
        assert_eq!(changes.insertions, vec![0, 1]);

        reconciler.commit(reconciliation);
        assert!(matches!(
            reconciler.current().get(3),
            Some(DisplayItem::Content { entry_id, .. }) if *entry_id == EntryId::from_bytes([4; 16])
        ));
    }
}
