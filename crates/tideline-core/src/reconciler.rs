//! Baseline tracking across reconciliation cycles.
//!
//! # State Machine
//!
//! ```text
//! +----------------+
//! |     Empty      | current = [], generation = 0
//! +-------+--------+
//!         | prepare(next) → Reload; commit()
//!         v
//! +----------------+
//! |    Applied     | current = last committed snapshot
//! +-------+--------+
//!         | prepare(next) → Patch(changes); commit()
//!         |   (empty patch: commit is a no-op)
//!         v
//!      Applied
//! ```
//!
//! `prepare` never mutates; a prepared reconciliation that is dropped (e.g.
//! the view was torn down) leaves the baseline untouched.

use tideline_types::{Entry, PaginationState};
use tracing::debug;

use crate::attributes::AttributeCache;
use crate::builder::{BuildOutput, build};
use crate::diff::{EditScript, diff};
use crate::snapshot::Snapshot;

/// A diffed-but-not-yet-applied snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub script: EditScript,
    pub snapshot: Snapshot,
}

impl Reconciliation {
    /// Applying this would change nothing.
    pub fn is_noop(&self) -> bool {
        self.script.is_empty()
    }
}

/// Owns the currently applied snapshot and the attribute cache.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    current: Snapshot,
    attributes: AttributeCache,
    generation: u64,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// The snapshot the display surface currently shows.
    pub fn current(&self) -> &Snapshot {
        &self.current
    }

    pub fn attributes(&self) -> &AttributeCache {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut AttributeCache {
        &mut self.attributes
    }

    /// Bumped on every commit that changed the display.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Build a snapshot against this reconciler's attribute cache.
    pub fn build(&self, entries: &[Entry], pagination: PaginationState) -> BuildOutput {
        build(entries, &self.attributes, pagination)
    }

    /// Diff `next` against the applied baseline.
    pub fn prepare(&self, next: Snapshot) -> Reconciliation {
        let script = diff(&self.current, &next);
        Reconciliation { script, snapshot: next }
    }

    /// Make a prepared reconciliation the new baseline.
    ///
    /// Returns false for a no-op reconciliation, which leaves the generation
    /// unchanged so re-applying an identical snapshot is idempotent.
    pub fn commit(&mut self, reconciliation: Reconciliation) -> bool {
        if reconciliation.is_noop() {
            return false;
        }
        self.attributes.retain_snapshot(&reconciliation.snapshot);
        self.current = reconciliation.snapshot;
        self.generation += 1;
        debug!(
            generation = self.generation,
            items = self.current.len(),
            "committed timeline snapshot"
        );
        true
    }
}
