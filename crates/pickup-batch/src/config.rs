use serde::{Deserialize, Serialize};

use crate::error::{BatchError, BatchResult};

/// Size bounds applied to every batch before its root is computed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub min_events: usize,
    pub max_events: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            min_events: 1,
            max_events: 256,
        }
    }
}

impl BatchConfig {
    pub fn check_bounds(&self, count: usize) -> BatchResult<()> {
        if count < self.min_events.max(1) {
            return Err(BatchError::BelowMinimum {
                count,
                min: self.min_events.max(1),
            });
        }
        if count > self.max_events {
            return Err(BatchError::AboveMaximum {
                count,
                max: self.max_events,
            });
        }
        Ok(())
    }
}
