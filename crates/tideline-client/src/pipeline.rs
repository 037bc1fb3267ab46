//! Serialized reconciliation pipeline.
//!
//! The pipeline owns a [`Reconciler`] and a [`DisplaySurface`] inside a
//! `spawn_local` task. Store notifications and handle commands are processed
//! one at a time, so at most one fetch/build/diff/apply cycle is ever in
//! flight and the surface always sees updates in order.
//!
//! ```text
//!   PipelineHandle (Send+Sync)   mpsc       PipelineActor (spawn_local)
//!   ┌──────────────────────┐  ────────▶  ┌──────────────────────────────┐
//!   │ .refresh()           │             │ Reconciler + DisplaySurface  │
//!   │ .set_content_...()   │  ◀────────  │ store notifications          │
//!   │ .shutdown()          │   oneshot   │ fetch + build off-thread     │
//!   └──────────────────────┘             └──────────────────────────────┘
//! ```
//!
//! # Cycle
//!
//! 1. Drain pending store notifications (they are all answered by this fetch)
//! 2. Fetch and build on the blocking pool, against a copy of the attributes
//! 3. Diff against the applied snapshot; stop here if nothing changed
//! 4. Record the scroll anchor, apply to the surface, commit the baseline
//! 5. Broadcast a [`PipelineEvent`] and restart the settle timer
//!
//! A failed fetch keeps the previous snapshot on screen. Shutting down while
//! a fetch is in flight discards its result.

use std::sync::Arc;

use tideline_core::{BuildOutput, Changeset, Reconciler, ScrollCorrection, Snapshot};
use tideline_store::{SharedStore, StoreChanged, StoreError};
use tideline_types::{EntryFilter, EntryId, PaginationState};
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::PipelineConfig;
use crate::events::{PipelineEvent, ReconcileOutcome};
use crate::surface::{DisplaySurface, SurfaceUpdate};

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("pipeline shut down")]
    Shutdown,
}

// ============================================================================
// Commands (internal)
// ============================================================================

enum PipelineCommand {
    Refresh {
        reply: oneshot::Sender<ReconcileOutcome>,
    },
    SetContentRevealed {
        entry_id: EntryId,
        revealed: bool,
        reply: oneshot::Sender<ReconcileOutcome>,
    },
}

// ============================================================================
// PipelineHandle (Send + Sync public API)
// ============================================================================

/// Handle to a running pipeline. Cheap to clone and shareable across threads.
///
/// The pipeline stops when [`shutdown`](Self::shutdown) is called or every
/// handle is dropped.
#[derive(Clone)]
pub struct PipelineHandle {
    tx: mpsc::UnboundedSender<PipelineCommand>,
    events: broadcast::Sender<PipelineEvent>,
    refreshing: Arc<watch::Sender<bool>>,
    cancel: CancellationToken,
}

impl PipelineHandle {
    /// Run a cycle now, regardless of store notifications.
    pub async fn refresh(&self) -> Result<ReconcileOutcome, PipelineError> {
        let (reply, rx) = oneshot::channel();
        self.send(PipelineCommand::Refresh { reply })?;
        rx.await.map_err(|_| PipelineError::Shutdown)
    }

    /// Reveal or hide an entry's content. Rebuilds only if the cached state
    /// actually changed; unknown entries are ignored.
    pub async fn set_content_revealed(
        &self,
        entry_id: EntryId,
        revealed: bool,
    ) -> Result<ReconcileOutcome, PipelineError> {
        let (reply, rx) = oneshot::channel();
        self.send(PipelineCommand::SetContentRevealed {
            entry_id,
            revealed,
            reply,
        })?;
        rx.await.map_err(|_| PipelineError::Shutdown)
    }

    /// Raise the refreshing flag, e.g. when the user pulls to refresh.
    ///
    /// The pipeline lowers it again once a cycle completes and the settle
    /// delay has passed.
    pub fn begin_refresh(&self) {
        self.refreshing.send_replace(true);
    }

    pub fn is_refreshing(&self) -> bool {
        *self.refreshing.borrow()
    }

    /// Watch the refreshing flag.
    pub fn refreshing(&self) -> watch::Receiver<bool> {
        self.refreshing.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    /// Stop the pipeline. Any cycle in flight is discarded without touching
    /// the surface.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled() || self.tx.is_closed()
    }

    fn send(&self, cmd: PipelineCommand) -> Result<(), PipelineError> {
        if self.cancel.is_cancelled() {
            return Err(PipelineError::Shutdown);
        }
        self.tx.send(cmd).map_err(|_| PipelineError::Shutdown)
    }
}

// ============================================================================
// PipelineActor (internal, runs in spawn_local)
// ============================================================================

struct PipelineActor<S> {
    store: SharedStore,
    filter: EntryFilter,
    pagination: watch::Receiver<PaginationState>,
    surface: S,
    config: PipelineConfig,
    reconciler: Reconciler,
    changes: broadcast::Receiver<StoreChanged>,
    events: broadcast::Sender<PipelineEvent>,
    refreshing: Arc<watch::Sender<bool>>,
    cancel: CancellationToken,
    /// Pending "lower the refreshing flag" timer.
    settle: Option<JoinHandle<()>>,
}

impl<S: DisplaySurface + 'static> PipelineActor<S> {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<PipelineCommand>) {
        info!(
            domain = %self.filter.scope.domain,
            user_id = %self.filter.scope.user_id,
            "timeline pipeline started"
        );
        let mut watching_store = true;
        let mut watching_pagination = true;

        self.reconcile().await;

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!("pipeline shutting down: cancelled");
                    break;
                }
                cmd = rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd).await,
                    None => {
                        debug!("pipeline shutting down: all handles dropped");
                        break;
                    }
                },
                changed = self.changes.recv(), if watching_store => match changed {
                    Ok(StoreChanged) | Err(RecvError::Lagged(_)) => {
                        self.reconcile().await;
                    }
                    Err(RecvError::Closed) => {
                        warn!("store notifications closed, refreshing on request only");
                        watching_store = false;
                    }
                },
                changed = self.pagination.changed(), if watching_pagination => match changed {
                    Ok(()) => {
                        self.reconcile().await;
                    }
                    Err(_) => {
                        debug!("pagination state sender dropped");
                        watching_pagination = false;
                    }
                },
            }
        }

        if let Some(settle) = self.settle.take() {
            settle.abort();
        }
        self.refreshing.send_replace(false);
        info!(generation = self.reconciler.generation(), "timeline pipeline stopped");
    }

    async fn handle_command(&mut self, cmd: PipelineCommand) {
        match cmd {
            PipelineCommand::Refresh { reply } => {
                let outcome = self.reconcile().await;
                let _ = reply.send(outcome);
            }
            PipelineCommand::SetContentRevealed {
                entry_id,
                revealed,
                reply,
            } => {
                let outcome = if self
                    .reconciler
                    .attributes_mut()
                    .set_content_revealed(&entry_id, revealed)
                {
                    let outcome = self.reconcile().await;
                    if !outcome.is_applied() {
                        // The screen never showed the change; keep the cache in step with it.
                        self.reconciler
                            .attributes_mut()
                            .set_content_revealed(&entry_id, !revealed);
                        debug!(%entry_id, revealed, "reveal not applied, rolled back");
                    }
                    outcome
                } else {
                    trace!(%entry_id, revealed, "reveal state unchanged");
                    ReconcileOutcome::Unchanged
                };
                let _ = reply.send(outcome);
            }
        }
    }

    /// One full cycle. Never runs concurrently with itself.
    async fn reconcile(&mut self) -> ReconcileOutcome {
        let coalesced = drain_pending(&mut self.changes);
        if coalesced > 0 {
            trace!(coalesced, "coalesced store notifications");
        }

        let pagination = *self.pagination.borrow_and_update();
        let store = Arc::clone(&self.store);
        let filter = self.filter.clone();
        let attributes = self.reconciler.attributes().clone();
        let task = tokio::task::spawn_blocking(move || -> Result<BuildOutput, StoreError> {
            let entries = store.fetch(&filter)?;
            Ok(tideline_core::build(&entries, &attributes, pagination))
        });

        let joined = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!("pipeline cancelled mid-fetch, discarding result");
                return ReconcileOutcome::Cancelled;
            }
            joined = task => joined,
        };

        let outcome = match joined {
            Ok(Ok(output)) => self.apply(output),
            Ok(Err(e)) => {
                warn!(error = %e, "timeline fetch failed, keeping previous snapshot");
                ReconcileOutcome::Failed(e.to_string())
            }
            Err(e) => {
                warn!(error = %e, "timeline build task failed, keeping previous snapshot");
                ReconcileOutcome::Failed(e.to_string())
            }
        };

        if let Some(event) = outcome.event() {
            // No subscribers is fine.
            let _ = self.events.send(event);
        }
        if outcome != ReconcileOutcome::Cancelled {
            self.schedule_settle();
        }
        outcome
    }

    /// Diff, apply, commit.
    fn apply(&mut self, output: BuildOutput) -> ReconcileOutcome {
        let reconciliation = self.reconciler.prepare(output.snapshot);
        if reconciliation.is_noop() {
            trace!(generation = self.reconciler.generation(), "timeline snapshot unchanged");
            return ReconcileOutcome::Unchanged;
        }
        if self.cancel.is_cancelled() {
            return ReconcileOutcome::Cancelled;
        }

        let correction = self.scroll_correction(&reconciliation.snapshot);
        self.surface.apply(SurfaceUpdate {
            snapshot: &reconciliation.snapshot,
            script: &reconciliation.script,
            correction,
            animated: self.config.animate_differences,
        });

        let items = reconciliation.snapshot.len();
        let reload = reconciliation.script.is_reload();
        let changes = reconciliation.script.changeset().map_or(0, Changeset::len);
        self.reconciler.commit(reconciliation);

        let generation = self.reconciler.generation();
        debug!(
            generation,
            items,
            reload,
            changes,
            gaps = output.gap_count,
            anchored = correction.is_some(),
            "applied timeline snapshot"
        );
        ReconcileOutcome::Applied {
            generation,
            items,
            reload,
            changes,
        }
    }

    /// Anchor against what is on screen now, then find it in `next`.
    fn scroll_correction(&self, next: &Snapshot) -> Option<ScrollCorrection> {
        let viewport = self.surface.viewport();
        let rows = self.surface.row_frames();
        let anchor = match tideline_core::compute_anchor(self.reconciler.current(), &viewport, &rows) {
            Ok(Some(anchor)) => anchor,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "surface geometry out of sync, skipping scroll anchor");
                return None;
            }
        };

        let correction = tideline_core::compute_correction(next, &anchor);
        if correction.is_none() {
            debug!(item = %anchor.item, "scroll anchor removed by update");
        }
        correction
    }

    /// Lower the refreshing flag after the settle delay. A newer cycle
    /// restarts the timer.
    fn schedule_settle(&mut self) {
        if let Some(previous) = self.settle.take() {
            previous.abort();
        }
        let refreshing = Arc::clone(&self.refreshing);
        let delay = self.config.settle_delay();
        self.settle = Some(tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            refreshing.send_replace(false);
        }));
    }
}

/// Consume every queued notification; returns how many there were.
fn drain_pending(changes: &mut broadcast::Receiver<StoreChanged>) -> usize {
    let mut coalesced = 0;
    loop {
        match changes.try_recv() {
            Ok(StoreChanged) | Err(TryRecvError::Lagged(_)) => coalesced += 1,
            Err(TryRecvError::Empty | TryRecvError::Closed) => return coalesced,
        }
    }
}

// ============================================================================
// Public spawn function
// ============================================================================

/// Spawn a pipeline in the current `LocalSet` context.
///
/// The store subscription is taken before this returns, so no mutation made
/// after the call is missed. The first cycle runs as soon as the task is
/// polled and reloads the surface.
///
/// # Panics
///
/// Must be called from within a `tokio::task::LocalSet`, since surfaces are
/// generally `!Send` and stay on the spawning thread.
pub fn spawn_pipeline<S>(
    store: SharedStore,
    filter: EntryFilter,
    pagination: watch::Receiver<PaginationState>,
    surface: S,
    config: PipelineConfig,
) -> PipelineHandle
where
    S: DisplaySurface + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let (events, _) = broadcast::channel(config.event_capacity.max(1));
    let (refreshing, _) = watch::channel(false);
    let refreshing = Arc::new(refreshing);
    let cancel = CancellationToken::new();

    let actor = PipelineActor {
        changes: store.subscribe(),
        store,
        filter,
        pagination,
        surface,
        config,
        reconciler: Reconciler::new(),
        events: events.clone(),
        refreshing: Arc::clone(&refreshing),
        cancel: cancel.clone(),
        settle: None,
    };
    tokio::task::spawn_local(actor.run(rx));

    PipelineHandle {
        tx,
        events,
        refreshing,
        cancel,
    }
}
