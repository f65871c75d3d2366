//! `EAGAIN` retry for raw reads
//!
//! A read on a non-blocking descriptor may fail with `EAGAIN` when no data
//! is ready. The read is replayed with the same descriptor, buffer and
//! position until it stops failing that way or the budget runs out, at
//! which point the `EAGAIN` surfaces.
//!
//! The async variant goes to the back of the deferred queue between
//! attempts so it does not starve operations already waiting there. The
//! blocking variant loops immediately.

use super::RetryContext;
use crate::backend::{AsyncFs, BlockingFs};
use crate::errno;
use crate::queue::{OpKind, PendingOp};
use compio::BufResult;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

/// Attempts a single read call may make
pub const READ_RETRY_BUDGET: u32 = 10;

/// Retry allowance local to one read call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    remaining: u32,
}

impl RetryBudget {
    /// Full budget
    #[must_use]
    pub const fn new() -> Self {
        Self {
            remaining: READ_RETRY_BUDGET,
        }
    }

    /// Charge one `EAGAIN`; `true` if another attempt is allowed
    pub fn spend(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining > 0
    }

    /// Retries left before the next `EAGAIN` surfaces
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self::new()
    }
}

/// Read at `position`, replaying `EAGAIN` through the deferred queue
pub async fn read<B: AsyncFs>(
    cx: RetryContext<'_, B>,
    file: &B::File,
    mut buf: Vec<u8>,
    position: u64,
) -> BufResult<usize, Vec<u8>> {
    let mut budget = RetryBudget::new();
    loop {
        let BufResult(result, returned) = cx.backend.read(file, buf, position).await;
        buf = returned;

        match result {
            Err(e) if errno::is_transient(&e) => {
                if !budget.spend() {
                    warn!("read at {} still EAGAIN after {} attempts", position, READ_RETRY_BUDGET);
                    return BufResult(Err(e), buf);
                }
                cx.stats.increment_read_retries();
                debug!("read at {} hit EAGAIN, {} retries left", position, budget.remaining());
                let resume = cx.queue.enqueue(PendingOp::new(OpKind::Read, Path::new("")));
                cx.release();
                resume.await;
            }
            result => {
                cx.release();
                return BufResult(result, buf);
            }
        }
    }
}

/// Read at `position`, replaying `EAGAIN` immediately
///
/// # Errors
///
/// Returns the backend error; `EAGAIN` only once the budget is spent.
pub fn read_sync<B: BlockingFs>(
    cx: RetryContext<'_, B>,
    file: &B::SyncFile,
    buf: &mut [u8],
    position: u64,
) -> io::Result<usize> {
    let mut budget = RetryBudget::new();
    loop {
        match cx.backend.read_sync(file, buf, position) {
            Err(e) if errno::is_transient(&e) => {
                if !budget.spend() {
                    warn!("read at {} still EAGAIN after {} attempts", position, READ_RETRY_BUDGET);
                    return Err(e);
                }
                cx.stats.increment_read_retries();
                debug!("read at {} hit EAGAIN, {} retries left", position, budget.remaining());
            }
            result => return result,
        }
    }
}
