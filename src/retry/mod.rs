//! Retry policies
//!
//! Each policy decorates a distinct set of primitives:
//!
//! - [`exhaustion`] - `open`, whole-file read/write/append and directory
//!   listing park on the deferred queue after `EMFILE`/`ENFILE`
//! - [`transient`] - raw reads retry `EAGAIN` within a fixed budget
//! - [`rename`] - Windows-class renames retry lock contention within a
//!   time window
//!
//! The policies share nothing but the [`DeferredQueue`] and the
//! [`RetryStats`] of the layer they belong to, bundled in a
//! [`RetryContext`].

pub mod exhaustion;
pub mod rename;
pub mod transient;

use crate::queue::DeferredQueue;
use crate::stats::RetryStats;

/// What a retry policy needs from its layer
#[derive(Debug)]
pub struct RetryContext<'a, B> {
    /// The wrapped filesystem
    pub backend: &'a B,
    /// The layer's deferred queue
    pub queue: &'a DeferredQueue,
    /// The layer's counters
    pub stats: &'a RetryStats,
}

impl<B> Clone for RetryContext<'_, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B> Copy for RetryContext<'_, B> {}

impl<B> RetryContext<'_, B> {
    /// Resume one deferred operation, counting it if there was one
    pub fn release(&self) -> bool {
        let drained = self.queue.drain_one();
        if drained {
            self.stats.increment_drained();
        }
        drained
    }
}
