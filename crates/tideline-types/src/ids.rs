//! Typed identifier for timeline entries.
//!
//! `EntryId` wraps a UUIDv7, so ordering by id is ordering by arrival. It is
//! opaque on disk (16 bytes) and displays as standard UUID text for logging.
//! The `short()` form (first 8 hex chars) is for human-facing output only,
//! never for lookup.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A timeline entry identifier (UUIDv7).
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(uuid::Uuid);

impl EntryId {
    /// Create a new time-ordered ID (UUIDv7).
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    /// First 8 hex characters, for human display only.
    pub fn short(&self) -> String {
        self.0.as_simple().to_string()[..8].to_string()
    }

    /// The raw 16 bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// Reconstruct from 16 bytes.
    pub fn from_bytes(b: [u8; 16]) -> Self {
        Self(uuid::Uuid::from_bytes(b))
    }

    /// Try to reconstruct from a byte slice (must be exactly 16 bytes).
    pub fn try_from_slice(b: &[u8]) -> Option<Self> {
        let arr: [u8; 16] = b.try_into().ok()?;
        Some(Self::from_bytes(arr))
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryId({})", self.short())
    }
}

// ============================================================================
// Tests
// ============================================================================
