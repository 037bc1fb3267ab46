//! Read-only state of the "load older" pagination machine.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Where the "load older" pagination currently stands.
///
/// Owned by the pagination state machine; the reconciliation core only reads
/// it, once per snapshot build, to decide whether a bottom loader is shown.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaginationState {
    #[default]
    Initial,
    Loading,
    HasMore,
    Idle,
    Failed,
    /// The server reported there is nothing older. Suppresses the bottom loader.
    NoMore,
}

impl PaginationState {
    /// Whether a bottom loader may be shown in this state.
    pub fn allows_bottom_loader(self) -> bool {
        self != PaginationState::NoMore
    }
}
