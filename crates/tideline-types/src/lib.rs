//! Shared identity, entry, and display-item types for tideline.
//!
//! This is the leaf crate of the workspace: it has **no internal tideline
//! dependencies**. The store, core, and client crates all speak in these types.
//!
//! # Overview
//!
//! ```text
//! Entry (EntryId)            ← one persisted home-timeline record
//!     └── scope: TimelineScope (domain + user)
//!     └── has_more           ← a gap exists right after it in server order
//!
//! DisplayItem                ← one row of the display list
//!     ├── Content { entry_id, attribute }
//!     ├── GapMarker { anchor }
//!     └── BottomLoader
//!
//! ItemId                     ← identity of a DisplayItem for diffing/anchoring
//! ```
//!
//! # Key Types
//!
//! |--------------------|--------------------------------------------------|
//! | Type               | Purpose                                          |
//! |--------------------|--------------------------------------------------|
//! | [`EntryId`]        | Stable, time-ordered entry identifier            |
//! | [`Entry`]          | Timeline record as returned by the store         |
//! | [`EntryFilter`]    | Caller-supplied predicate for store queries      |
//! | [`PaginationState`]| Read-only "load older" state                     |
//! | [`Attribute`]      | Per-entry display state that survives rebuilds   |
//! | [`DisplayItem`]    | Content row, gap marker, or bottom loader        |
//! | [`ItemId`]         | Identity key of a display item                   |
//! |--------------------|--------------------------------------------------|

pub mod entry;
pub mod ids;
pub mod item;
pub mod pagination;

pub use entry::{Entry, EntryFilter, TimelineScope};
pub use ids::EntryId;
pub use item::{Attribute, DisplayItem, ItemId};
pub use pagination::PaginationState;
