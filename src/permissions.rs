//! Ownership and permission error normalization
//!
//! Copy tools routinely try to preserve owners and modes. On filesystems
//! without ownership semantics, or when the process is not root, those calls
//! fail in ways nobody can act on. This layer reports them as success:
//!
//! | error | privileged | unprivileged |
//! |---|---|---|
//! | `ENOSYS` | suppressed | suppressed |
//! | `EINVAL` | propagated | suppressed |
//! | `EPERM` | propagated | suppressed |
//! | anything else | propagated | propagated |
//!
//! `EACCES` always propagates.

use crate::errno::ErrorCode;
use crate::stats::RetryStats;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::debug;

/// Whether `error` from a chown/chmod family call should be reported as
/// success
#[must_use]
pub fn is_suppressible(error: &io::Error, privileged: bool) -> bool {
    match ErrorCode::of(error) {
        Some(ErrorCode::Enosys) => true,
        Some(ErrorCode::Einval | ErrorCode::Eperm) => !privileged,
        _ => false,
    }
}

/// Apply the suppression table to the outcome of `operation`
///
/// `privileged` is only consulted when the call actually failed.
///
/// # Errors
///
/// Returns `result`'s error when it is not suppressible.
pub fn normalize(
    operation: &str,
    result: io::Result<()>,
    privileged: impl FnOnce() -> bool,
    stats: &RetryStats,
) -> io::Result<()> {
    match result {
        Err(e) if is_suppressible(&e, privileged()) => {
            debug!("{} failed with {}, treating as success", operation, e);
            stats.increment_permission_errors_suppressed();
            Ok(())
        }
        result => result,
    }
}

/// Completes on its second poll, giving the runtime one turn
///
/// Used where an operation turns into a no-op so that its completion still
/// happens after the call has returned.
#[derive(Debug, Default)]
#[must_use = "futures do nothing unless polled"]
pub(crate) struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }
        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}
