use std::sync::Mutex;

use tracing::debug;

use crate::error::{BatchError, BatchResult};

/// The single source of batch numbers.
///
/// Numbers start at 1 and strictly increase. Allocation is serialized by a
/// mutex, so concurrent sealers can never receive the same number.
#[derive(Debug)]
pub struct BatchAllocator {
    next: Mutex<u64>,
}

impl BatchAllocator {
    pub fn new() -> Self {
        Self::resume_after(0)
    }

    /// Continue numbering after the last anchored batch.
    pub fn resume_after(last: u64) -> Self {
        Self {
            next: Mutex::new(last.saturating_add(1)),
        }
    }

    pub fn allocate(&self) -> BatchResult<u64> {
        let mut next = self
            .next
            .lock()
            .map_err(|e| BatchError::Allocator(format!("lock poisoned: {e}")))?;
        let number = *next;
        *next = number
            .checked_add(1)
            .ok_or_else(|| BatchError::Allocator("batch numbers exhausted".into()))?;
        debug!(batch_number = number, "allocated batch number");
        Ok(number)
    }

    /// The number the next call to [`Self::allocate`] will return.
    pub fn peek(&self) -> BatchResult<u64> {
        self.next
            .lock()
            .map(|n| *n)
            .map_err(|e| BatchError::Allocator(format!("lock poisoned: {e}")))
    }
}

impl Default for BatchAllocator {
    fn default() -> Self {
        Self::new()
    }
}
