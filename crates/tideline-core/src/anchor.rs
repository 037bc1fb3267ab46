//! Scroll anchoring across a reconciliation.
//!
//! Before applying a new snapshot, record which item sits at the top of the
//! viewport and how far below the viewport's top edge it is. After the apply,
//! find that item again and put it back at the same offset, so content
//! changing above or below the viewport does not make the visible rows jump.
//!
//! Coordinates: `RowFrame::top` is in content coordinates (0 = top of the
//! list); a row's on-screen top is `top - content_offset`. The usable top
//! edge of the viewport is `overlay_height` (space covered by fixed chrome).

use tideline_types::ItemId;
use tracing::trace;

use crate::error::CoreError;
use crate::snapshot::Snapshot;

/// Visible window onto the list.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Viewport {
    /// Scroll position: content coordinate shown at the very top of the screen.
    pub content_offset: f64,
    /// Height of fixed chrome overlaying the top of the list.
    pub overlay_height: f64,
    /// Total visible height, overlay included.
    pub height: f64,
}

/// Laid-out position of one row.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RowFrame {
    pub top: f64,
    pub height: f64,
}

/// The item holding the reader's place, recorded before an update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollAnchor {
    pub item: ItemId,
    /// Position in the old snapshot.
    pub index: usize,
    /// Distance from the viewport's usable top edge to the row's top.
    pub offset: f64,
}

/// Where the anchor item ended up, and where it should be shown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollCorrection {
    /// Position in the new snapshot.
    pub index: usize,
    /// Offset to restore, unchanged from the anchor.
    pub offset: f64,
}

impl ScrollCorrection {
    /// Content offset that shows a row laid out at `row_top` at the recorded
    /// distance below the overlay.
    pub fn content_offset_for(&self, row_top: f64, overlay_height: f64) -> f64 {
        row_top - overlay_height - self.offset
    }
}

/// Find the first row whose top edge is at or below the usable top edge.
///
/// The row may start below the bottom of the viewport when the row above it
/// is taller than the screen. `rows` must describe `snapshot`'s items
/// one-to-one. Returns `Ok(None)` when the snapshot is empty or every row
/// starts above the overlay.
pub fn compute_anchor(
    snapshot: &Snapshot,
    viewport: &Viewport,
    rows: &[RowFrame],
) -> Result<Option<ScrollAnchor>, CoreError> {
    if snapshot.is_empty() {
        return Ok(None);
    }
    if rows.len() != snapshot.len() {
        return Err(CoreError::FrameCountMismatch {
            rows: rows.len(),
            items: snapshot.len(),
        });
    }

    let anchor = rows.iter().enumerate().find_map(|(index, row)| {
        let screen_top = row.top - viewport.content_offset;
        if screen_top >= viewport.overlay_height {
            let item = snapshot.get(index)?.id();
            Some(ScrollAnchor {
                item,
                index,
                offset: screen_top - viewport.overlay_height,
            })
        } else {
            None
        }
    });

    trace!(?anchor, "computed scroll anchor");
    Ok(anchor)
}

/// Locate the anchor item in the new snapshot.
///
/// `None` means the item is gone; the viewport should settle naturally.
pub fn compute_correction(snapshot: &Snapshot, anchor: &ScrollAnchor) -> Option<ScrollCorrection> {
    snapshot.position(&anchor.item).map(|index| ScrollCorrection {
        index,
        offset: anchor.offset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tideline_types::{Attribute, DisplayItem, EntryId};

    fn id(n: u8) -> EntryId {
        EntryId::from_bytes([n; 16])
    }

    fn contents(ns: &[u8]) -> Snapshot {
        Snapshot::new(ns.iter().map(|&n| DisplayItem::content(id(n), Attribute::default())).collect())
            .unwrap()
    }

    /// Rows of a fixed height stacked from the top.
    fn rows(count: usize, height: f64) -> Vec<RowFrame> {
        (0..count)
            .map(|i| RowFrame { top: i as f64 * height, height })
            .collect()
    }

    fn viewport(content_offset: f64) -> Viewport {
        Viewport { content_offset, overlay_height: 50.0, height: 500.0 }
    }

    // =========================================================================
    // compute_anchor
    // =========================================================================

    #[test]
    fn test_anchor_is_first_row_below_overlay() {
        let snapshot = contents(&[1, 2, 3, 4]);
        // Row 1 is at screen y=20 (under the overlay), row 2 at y=120.
        let anchor = compute_anchor(&snapshot, &viewport(80.0), &rows(4, 100.0))
            .unwrap()
            .unwrap();

        assert_eq!(anchor.item, ItemId::Content(id(3)));
        assert_eq!(anchor.index, 2);
        assert_eq!(anchor.offset, 70.0);
    }

    #[test]
    fn test_anchor_row_exactly_at_overlay_edge_qualifies() {
        let snapshot = contents(&[1, 2]);
        let anchor = compute_anchor(&snapshot, &viewport(50.0), &rows(2, 100.0))
            .unwrap()
            .unwrap();
        assert_eq!(anchor.index, 1);
        assert_eq!(anchor.offset, 0.0);
    }

    #[test]
    fn test_no_anchor_when_empty() {
        assert_eq!(compute_anchor(&Snapshot::empty(), &viewport(0.0), &[]), Ok(None));
    }

    #[test]
    fn test_no_anchor_when_no_row_top_is_visible() {
        // A single tall row scrolled so its top is above the overlay.
        let snapshot = contents(&[1]);
        let frames = [RowFrame { top: 0.0, height: 2_000.0 }];
        assert_eq!(compute_anchor(&snapshot, &viewport(400.0), &frames), Ok(None));
    }

    #[test]
    fn test_anchor_below_viewport_when_row_is_taller_than_screen() {
        // Row 0 fills the whole screen; row 1 starts past the bottom edge.
        let snapshot = contents(&[1, 2, 3]);
        let anchor = compute_anchor(&snapshot, &viewport(400.0), &rows(3, 1_000.0))
            .unwrap()
            .unwrap();

        assert_eq!(anchor.item, ItemId::Content(id(2)));
        assert_eq!(anchor.offset, 550.0);
    }

    #[test]
    fn test_frame_mismatch_is_error() {
        let snapshot = contents(&[1, 2]);
        assert_eq!(
            compute_anchor(&snapshot, &viewport(0.0), &rows(1, 100.0)),
            Err(CoreError::FrameCountMismatch { rows: 1, items: 2 })
        );
    }

    // =========================================================================
    // compute_correction
    // =========================================================================

    #[test]
    fn test_correction_keeps_offset_at_new_index() {
        let old = contents(&[3, 4, 5]);
        let anchor = compute_anchor(&old, &viewport(150.0), &rows(3, 100.0))
            .unwrap()
            .unwrap();
        assert_eq!(anchor.item, ItemId::Content(id(5)));

        let new = contents(&[1, 2, 3, 4, 5]);
        let correction = compute_correction(&new, &anchor).unwrap();
        assert_eq!(correction.index, 4);
        assert_eq!(correction.offset, anchor.offset);

        // In the new layout row 4 starts at 400; restore the same screen position.
        let offset = correction.content_offset_for(400.0, 50.0);
        assert_eq!(400.0 - offset, 50.0 + anchor.offset);
    }

    #[test]
    fn test_correction_absent_when_anchor_removed() {
        let anchor = ScrollAnchor { item: ItemId::Content(id(9)), index: 0, offset: 12.0 };
        assert_eq!(compute_correction(&contents(&[1, 2]), &anchor), None);
    }
}
