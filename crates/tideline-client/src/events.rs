//! Observable results of reconciliation cycles.

/// Broadcast after every cycle, to any number of observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    /// A new snapshot reached the surface.
    Applied { generation: u64, items: usize },
    /// The rebuilt snapshot matched what is already displayed.
    Unchanged,
    /// The fetch failed; the previous snapshot stays on screen.
    FetchFailed { error: String },
}

/// Reply to an explicit request on a [`PipelineHandle`](crate::PipelineHandle).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Applied {
        generation: u64,
        items: usize,
        /// The surface was told to reload rather than patch.
        reload: bool,
        /// Number of edits in the patch (zero for reloads).
        changes: usize,
    },
    Unchanged,
    Failed(String),
    /// Teardown happened while the cycle was in flight; nothing was applied.
    Cancelled,
}

impl ReconcileOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    /// The event observers see for this outcome, if any.
    pub(crate) fn event(&self) -> Option<PipelineEvent> {
        match self {
            Self::Applied { generation, items, .. } => Some(PipelineEvent::Applied {
                generation: *generation,
                items: *items,
            }),
            Self::Unchanged => Some(PipelineEvent::Unchanged),
            Self::Failed(error) => Some(PipelineEvent::FetchFailed { error: error.clone() }),
            Self::Cancelled => None,
        }
    }
}
