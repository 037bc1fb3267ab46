//! Live reconciliation pipeline for a home timeline.
//!
//! Connects a [`TimelineIndexStore`](tideline_store::TimelineIndexStore) to a
//! [`DisplaySurface`]: every store change is rebuilt into a snapshot, diffed
//! against what is on screen, and applied with the reader's scroll position
//! held in place.
//!
//! ```no_run
//! use std::sync::Arc;
//! use tideline_client::{ListSurface, PipelineConfig, spawn_pipeline};
//! use tideline_store::MemoryStore;
//! use tideline_types::{EntryFilter, PaginationState, TimelineScope};
//! use tokio::sync::watch;
//!
//! # async fn demo() {
//! let store = Arc::new(MemoryStore::new());
//! let (_pagination_tx, pagination) = watch::channel(PaginationState::Idle);
//! let filter = EntryFilter::home(TimelineScope::new("example.social", "1"));
//!
//! // Inside a tokio LocalSet:
//! let pipeline = spawn_pipeline(
//!     store,
//!     filter,
//!     pagination,
//!     ListSurface::new(120.0, 44.0, 800.0),
//!     PipelineConfig::default(),
//! );
//! pipeline.refresh().await.ok();
//! # }
//! ```

pub mod constants;

mod config;
mod events;
mod pipeline;
mod surface;

pub use config::{ConfigError, PipelineConfig};
pub use events::{PipelineEvent, ReconcileOutcome};
pub use pipeline::{PipelineError, PipelineHandle, spawn_pipeline};
pub use surface::{DisplaySurface, ListSurface, SurfaceUpdate};
