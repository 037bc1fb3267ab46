//! The display side of the pipeline.
//!
//! A [`DisplaySurface`] is whatever draws the list: a widget tree, a terminal
//! pane, or the headless [`ListSurface`]. The pipeline reads geometry from it
//! before each update and hands it exactly one [`SurfaceUpdate`] per applied
//! snapshot.

use std::cell::RefCell;
use std::rc::Rc;

use tideline_core::{EditScript, RowFrame, ScrollCorrection, Snapshot, Viewport};
use tideline_types::DisplayItem;
use tracing::{trace, warn};

/// Everything a surface needs to move from its current list to the next one.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceUpdate<'a> {
    /// The full target list.
    pub snapshot: &'a Snapshot,
    /// How to get there from what is on screen.
    pub script: &'a EditScript,
    /// Where the anchored row should end up, if one was found and survived.
    pub correction: Option<ScrollCorrection>,
    pub animated: bool,
}

/// Geometry source and update sink for a rendered list.
///
/// Surfaces are driven from the pipeline's local task and need not be `Send`.
pub trait DisplaySurface {
    fn viewport(&self) -> Viewport;

    /// Frames for the rows currently shown, in display order.
    fn row_frames(&self) -> Vec<RowFrame>;

    /// Apply one update atomically.
    fn apply(&mut self, update: SurfaceUpdate<'_>);
}

/// Share a surface with the UI code that also reads it.
impl<S: DisplaySurface> DisplaySurface for Rc<RefCell<S>> {
    fn viewport(&self) -> Viewport {
        self.borrow().viewport()
    }

    fn row_frames(&self) -> Vec<RowFrame> {
        self.borrow().row_frames()
    }

    fn apply(&mut self, update: SurfaceUpdate<'_>) {
        self.borrow_mut().apply(update);
    }
}

/// Headless surface with uniform row height.
///
/// Replays patches against its own copy of the list and honors scroll
/// corrections, so it behaves like a real list view for tests and tools.
#[derive(Debug, Clone)]
pub struct ListSurface {
    items: Vec<DisplayItem>,
    row_height: f64,
    viewport: Viewport,
    updates: usize,
    reloads: usize,
    last_correction: Option<ScrollCorrection>,
}

impl ListSurface {
    pub fn new(row_height: f64, overlay_height: f64, height: f64) -> Self {
        Self {
            items: Vec::new(),
            row_height,
            viewport: Viewport {
                content_offset: 0.0,
                overlay_height,
                height,
            },
            updates: 0,
            reloads: 0,
            last_correction: None,
        }
    }

    pub fn items(&self) -> &[DisplayItem] {
        &self.items
    }

    pub fn content_offset(&self) -> f64 {
        self.viewport.content_offset
    }

    pub fn scroll_to(&mut self, content_offset: f64) {
        self.viewport.content_offset = content_offset;
    }

    /// Scroll so row `index` sits `offset` below the overlay.
    pub fn scroll_to_row(&mut self, index: usize, offset: f64) {
        self.viewport.content_offset =
            self.row_top(index) - self.viewport.overlay_height - offset;
    }

    /// Screen position of row `index` relative to the overlay's bottom edge.
    pub fn row_offset(&self, index: usize) -> f64 {
        self.row_top(index) - self.viewport.content_offset - self.viewport.overlay_height
    }

    /// Number of updates applied so far.
    pub fn updates(&self) -> usize {
        self.updates
    }

    /// How many of those updates were full reloads.
    pub fn reloads(&self) -> usize {
        self.reloads
    }

    pub fn last_correction(&self) -> Option<ScrollCorrection> {
        self.last_correction
    }

    fn row_top(&self, index: usize) -> f64 {
        index as f64 * self.row_height
    }
}

impl DisplaySurface for ListSurface {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn row_frames(&self) -> Vec<RowFrame> {
        (0..self.items.len())
            .map(|index| RowFrame {
                top: self.row_top(index),
                height: self.row_height,
            })
            .collect()
    }

    fn apply(&mut self, update: SurfaceUpdate<'_>) {
        self.items = match update.script {
            EditScript::Reload => {
                self.reloads += 1;
                update.snapshot.items().to_vec()
            }
            EditScript::Patch(changeset) => match changeset.replay(&self.items, update.snapshot.items()) {
                Ok(items) => items,
                Err(e) => {
                    // The surface drifted from the pipeline's baseline; resync.
                    warn!(error = %e, "patch did not fit displayed list, reloading");
                    self.reloads += 1;
                    update.snapshot.items().to_vec()
                }
            },
        };

        if let Some(correction) = update.correction {
            let row_top = self.row_top(correction.index);
            self.viewport.content_offset =
                correction.content_offset_for(row_top, self.viewport.overlay_height);
        }
        self.last_correction = update.correction;
        self.updates += 1;
        trace!(
            items = self.items.len(),
            content_offset = self.viewport.content_offset,
            "list surface updated"
        );
    }
}
