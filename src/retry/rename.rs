//! Lock-contention retry for rename on Windows-class platforms
//!
//! Antivirus scanners and indexers briefly hold files open, which makes a
//! rename fail with `EACCES` or `EPERM`. While a time window is open the
//! rename backs off and checks whether the destination exists:
//!
//! - destination missing: the failure was a transient lock, try again
//! - destination present, or the probe fails otherwise: the failure is
//!   real, surface the original rename error
//!
//! Once the window closes the original error surfaces too. On other
//! platforms rename passes straight through.

use super::RetryContext;
use crate::backend::{AsyncFs, BlockingFs};
use crate::errno::{self, ErrorCode};
use crate::options::Platform;
use std::io;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Backoff growth per attempt
pub const DELAY_STEP: Duration = Duration::from_millis(10);

/// Backoff ceiling
pub const MAX_DELAY: Duration = Duration::from_millis(100);

/// Deadline and backoff of one rename call
#[derive(Debug, Clone, Copy)]
pub struct RenameWindow {
    deadline: Instant,
    delay: Duration,
}

impl RenameWindow {
    /// Open a window of `length` starting now
    #[must_use]
    pub fn new(length: Duration) -> Self {
        Self {
            deadline: Instant::now() + length,
            delay: Duration::ZERO,
        }
    }

    /// Whether another attempt may start
    #[must_use]
    pub fn is_open(&self) -> bool {
        Instant::now() < self.deadline
    }

    /// Grow the backoff by one step, up to the ceiling, and return it
    pub fn next_delay(&mut self) -> Duration {
        if self.delay < MAX_DELAY {
            self.delay += DELAY_STEP;
        }
        self.delay
    }
}

/// Rename with backoff while the destination stays absent
///
/// # Errors
///
/// Returns the backend's rename error when it is not lock contention, when
/// the destination turns out to exist, or when `window` has elapsed.
pub async fn rename<B: AsyncFs>(
    cx: RetryContext<'_, B>,
    platform: Platform,
    window: Duration,
    from: &Path,
    to: &Path,
) -> io::Result<()> {
    if !platform.retries_rename() {
        return cx.backend.rename(from, to).await;
    }

    let mut window = RenameWindow::new(window);
    loop {
        let err = match cx.backend.rename(from, to).await {
            Err(e) if errno::is_lock_contention(&e) => e,
            result => return result,
        };
        if !window.is_open() {
            warn!("rename {} -> {} still locked when the window closed", from.display(), to.display());
            return Err(err);
        }

        let delay = window.next_delay();
        compio::time::sleep(delay).await;

        match cx.backend.stat(to).await {
            Err(probe) if ErrorCode::Enoent.matches(&probe) => {
                cx.stats.increment_rename_retries();
                debug!("rename {} -> {} locked, retrying after {:?}", from.display(), to.display(), delay);
            }
            _ => return Err(err),
        }
    }
}

/// Blocking rename with the same window, retried without sleeping
///
/// # Errors
///
/// As [`rename`].
pub fn rename_sync<B: BlockingFs>(
    cx: RetryContext<'_, B>,
    platform: Platform,
    window: Duration,
    from: &Path,
    to: &Path,
) -> io::Result<()> {
    if !platform.retries_rename() {
        return cx.backend.rename_sync(from, to);
    }

    let window = RenameWindow::new(window);
    loop {
        let err = match cx.backend.rename_sync(from, to) {
            Err(e) if errno::is_lock_contention(&e) => e,
            result => return result,
        };
        if !window.is_open() {
            warn!("rename {} -> {} still locked when the window closed", from.display(), to.display());
            return Err(err);
        }

        match cx.backend.stat_sync(to) {
            Err(probe) if ErrorCode::Enoent.matches(&probe) => {
                cx.stats.increment_rename_retries();
                debug!("rename {} -> {} locked, retrying", from.display(), to.display());
            }
            _ => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_grows_by_ten_and_caps_at_hundred() {
        let mut window = RenameWindow::new(Duration::from_secs(1));
        let delays: Vec<u64> = (0..12)
            .map(|_| window.next_delay().as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![10, 20, 30, 40, 50, 60, 70, 80, 90, 100, 100, 100]);
    }

    #[test]
    fn test_window_closes() {
        let window = RenameWindow::new(Duration::from_millis(50));
        assert!(window.is_open());
        std::thread::sleep(Duration::from_millis(80));
        assert!(!window.is_open());
    }
}
