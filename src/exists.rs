//! Existence checks
//!
//! Boolean shortcuts over the stat and access family. Any error, whatever
//! its code, counts as "does not exist"; none is ever returned.

use crate::backend::{AccessMode, AsyncFs, BlockingFs};
use std::path::Path;

/// Async existence checks, available on every [`AsyncFs`]
#[allow(async_fn_in_trait)]
pub trait ExistsExt: AsyncFs {
    /// Whether `stat(path)` succeeds
    async fn exist_stat(&self, path: &Path) -> bool {
        self.stat(path).await.is_ok()
    }

    /// Whether `lstat(path)` succeeds
    async fn exist_lstat(&self, path: &Path) -> bool {
        self.lstat(path).await.is_ok()
    }

    /// Whether `fstat(file)` succeeds
    async fn exist_fstat(&self, file: &Self::File) -> bool {
        self.fstat(file).await.is_ok()
    }

    /// Whether `access(path, mode)` succeeds
    async fn exist_access(&self, path: &Path, mode: AccessMode) -> bool {
        self.access(path, mode).await.is_ok()
    }
}

impl<T: AsyncFs + ?Sized> ExistsExt for T {}

/// Blocking existence checks, available on every [`BlockingFs`]
pub trait ExistsSyncExt: BlockingFs {
    /// Whether `stat_sync(path)` succeeds
    fn exist_stat_sync(&self, path: &Path) -> bool {
        self.stat_sync(path).is_ok()
    }

    /// Whether `lstat_sync(path)` succeeds
    fn exist_lstat_sync(&self, path: &Path) -> bool {
        self.lstat_sync(path).is_ok()
    }

    /// Whether `fstat_sync(file)` succeeds
    fn exist_fstat_sync(&self, file: &Self::SyncFile) -> bool {
        self.fstat_sync(file).is_ok()
    }

    /// Whether `access_sync(path, mode)` succeeds
    fn exist_access_sync(&self, path: &Path, mode: AccessMode) -> bool {
        self.access_sync(path, mode).is_ok()
    }
}

impl<T: BlockingFs + ?Sized> ExistsSyncExt for T {}
