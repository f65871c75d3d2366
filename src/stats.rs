//! Retry counters for one layered filesystem
//!
//! Lock-free atomic counters recording how often each resilience policy
//! stepped in. They are diagnostics only; no policy reads them back.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Counters with interior mutability via atomics
///
/// All methods are lock-free. Atomic operations use `Ordering::Relaxed`
/// since the counters never synchronize other memory.
#[derive(Debug, Default)]
pub struct RetryStats {
    /// Operations parked on the deferred queue
    deferred: AtomicU64,
    /// Queue entries resumed by a release
    drained: AtomicU64,
    /// `EAGAIN` reads replayed
    read_retries: AtomicU64,
    /// Locked renames replayed
    rename_retries: AtomicU64,
    /// Ownership/permission errors reported as success
    permission_errors_suppressed: AtomicU64,
    /// Stats whose uid or gid had to be corrected
    stat_ids_corrected: AtomicU64,
    /// Set once the first descriptor exhaustion has been reported
    exhaustion_warned: AtomicBool,
}

impl RetryStats {
    /// All counters at zero
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn increment_deferred(&self) {
        self.deferred.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn increment_drained(&self) {
        self.drained.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn increment_read_retries(&self) {
        self.read_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn increment_rename_retries(&self) {
        self.rename_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn increment_permission_errors_suppressed(&self) {
        self.permission_errors_suppressed
            .fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn increment_stat_ids_corrected(&self) {
        self.stat_ids_corrected.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns `true` only for the first call on this instance
    pub(crate) fn first_exhaustion(&self) -> bool {
        !self.exhaustion_warned.swap(true, Ordering::Relaxed)
    }

    /// Operations parked on the deferred queue so far
    #[must_use]
    pub fn deferred(&self) -> u64 {
        self.deferred.load(Ordering::Relaxed)
    }

    /// Queue entries resumed so far
    #[must_use]
    pub fn drained(&self) -> u64 {
        self.drained.load(Ordering::Relaxed)
    }

    /// Copy every counter into a plain struct
    #[must_use]
    pub fn snapshot(&self) -> RetrySnapshot {
        RetrySnapshot {
            deferred: self.deferred.load(Ordering::Relaxed),
            drained: self.drained.load(Ordering::Relaxed),
            read_retries: self.read_retries.load(Ordering::Relaxed),
            rename_retries: self.rename_retries.load(Ordering::Relaxed),
            permission_errors_suppressed: self.permission_errors_suppressed.load(Ordering::Relaxed),
            stat_ids_corrected: self.stat_ids_corrected.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`RetryStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetrySnapshot {
    /// Operations parked on the deferred queue
    pub deferred: u64,
    /// Queue entries resumed by a release
    pub drained: u64,
    /// `EAGAIN` reads replayed
    pub read_retries: u64,
    /// Locked renames replayed
    pub rename_retries: u64,
    /// Ownership/permission errors reported as success
    pub permission_errors_suppressed: u64,
    /// Stats whose uid or gid had to be corrected
    pub stat_ids_corrected: u64,
}
