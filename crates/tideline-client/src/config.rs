//! Pipeline configuration, loadable from RON.
//!
//! ```ron
//! (
//!     settle_delay_ms: 250,
//!     animate_differences: true,
//! )
//! ```
//!
//! Missing fields fall back to the defaults in [`crate::constants`].

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{DEFAULT_ANIMATE_DIFFERENCES, DEFAULT_EVENT_CAPACITY, DEFAULT_SETTLE_DELAY};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Delay between a completed cycle and clearing the refreshing flag.
    pub settle_delay_ms: u64,
    /// Passed through to the display surface with every update.
    pub animate_differences: bool,
    /// Capacity of the [`PipelineEvent`](crate::PipelineEvent) channel.
    pub event_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: DEFAULT_SETTLE_DELAY.as_millis() as u64,
            animate_differences: DEFAULT_ANIMATE_DIFFERENCES,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl PipelineConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron_str(&text)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("ron: {0}")]
    Ron(#[from] ron::error::SpannedError),
}
