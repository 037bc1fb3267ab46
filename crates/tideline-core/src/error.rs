//! Error types for the reconciliation core.

use thiserror::Error;
use tideline_types::ItemId;

/// Errors that can occur while building, diffing, or anchoring snapshots.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Two display items share an identity within one snapshot.
    #[error("duplicate display item: {0}")]
    DuplicateItem(ItemId),

    /// Row geometry does not line up with the snapshot it describes.
    #[error("row frames ({rows}) do not match snapshot items ({items})")]
    FrameCountMismatch { rows: usize, items: usize },

    /// A changeset references positions outside the snapshots it was replayed on.
    #[error("changeset does not fit snapshots: {0}")]
    ChangesetMismatch(String),
}
