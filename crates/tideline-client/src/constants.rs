//! Pipeline configuration defaults.
//!
//! Each one is the fallback for the matching `PipelineConfig` field.

use std::time::Duration;

/// How long the refreshing flag stays up after a cycle completes.
/// Absorbs bursts of notifications so a refresh indicator does not flicker.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Whether surfaces animate applied differences by default.
pub const DEFAULT_ANIMATE_DIFFERENCES: bool = false;

/// Capacity of the pipeline event broadcast channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;
