//! The layered filesystem
//!
//! [`GracefulFs`] wraps any backend and implements the same [`AsyncFs`] and
//! [`BlockingFs`] traits, routing each primitive through its policy:
//!
//! | primitives | policy |
//! |---|---|
//! | `open`, `read_file`, `write_file`, `append_file`, `read_dir` | [`exhaustion`] |
//! | `read` | [`transient`] |
//! | `rename` | [`rename`](crate::retry::rename) |
//! | `chown`, `fchown`, `lchown`, `chmod`, `fchmod`, `lchmod` | [`permissions`] |
//! | `stat`, `fstat`, `lstat` | [`stat::correct_ids`] |
//! | `close` | pass-through, then drain one deferred operation |
//! | `access` | pass-through |
//!
//! Blocking variants get the same policies except the exhaustion queue:
//! a blocking caller cannot be parked, so those calls pass through.

use crate::backend::{AccessMode, AsyncFs, BlockingFs, FsCapabilities, OpenOptions, OsFs};
use crate::error::Result;
use crate::options::GracefulOptions;
use crate::permissions::{self, YieldNow};
use crate::queue::DeferredQueue;
use crate::retry::exhaustion::{self, AppendFile, Open, ReadDir, ReadFile, WriteFile};
use crate::retry::{self, transient, RetryContext};
use crate::stat::{self, FileStat};
use crate::stats::RetryStats;
use compio::BufResult;
use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Resilience layer in front of a filesystem backend
///
/// Each instance owns its deferred queue; two instances never resume each
/// other's operations.
///
/// # Example
///
/// ```rust,no_run
/// use graceful_fs::{AsyncFs, GracefulFs};
/// use std::path::Path;
///
/// # async fn example() -> std::io::Result<()> {
/// let fs = GracefulFs::os();
/// fs.write_file(Path::new("out.txt"), b"hello").await?;
/// let names = fs.read_dir(Path::new(".")).await?;
/// println!("{names:?}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct GracefulFs<B> {
    backend: B,
    queue: DeferredQueue,
    stats: RetryStats,
    options: GracefulOptions,
}

impl GracefulFs<OsFs> {
    /// The host filesystem, configured from the environment
    ///
    /// Reads `GRACEFUL_FS_PLATFORM` and `GRACEFUL_FS_RENAME_WINDOW_MS` through
    /// [`GracefulOptions::from_env`]. Unusable values are logged and the
    /// defaults are used instead.
    #[must_use]
    pub fn os() -> Self {
        let options = GracefulOptions::from_env().unwrap_or_else(|e| {
            warn!("ignoring graceful-fs environment: {e}");
            GracefulOptions::new()
        });
        Self::new(OsFs::new(), options)
    }
}

impl<B> GracefulFs<B> {
    /// Wrap `backend`
    pub fn new(backend: B, options: GracefulOptions) -> Self {
        debug!(
            "graceful layer: platform {:?}, rename window {:?}",
            options.platform(),
            options.rename_window()
        );
        Self {
            backend,
            queue: DeferredQueue::new(),
            stats: RetryStats::new(),
            options,
        }
    }

    /// Wrap `backend` with default options
    pub fn with_defaults(backend: B) -> Self {
        Self::new(backend, GracefulOptions::new())
    }

    /// The wrapped backend
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Operations currently waiting for a descriptor
    pub const fn queue(&self) -> &DeferredQueue {
        &self.queue
    }

    /// Retry counters
    pub const fn stats(&self) -> &RetryStats {
        &self.stats
    }

    /// Active configuration
    pub const fn options(&self) -> &GracefulOptions {
        &self.options
    }

    /// Change the rename retry window
    ///
    /// # Errors
    ///
    /// Returns an error if `window` is zero.
    pub fn set_rename_window(&mut self, window: Duration) -> Result<()> {
        self.options = self.options.clone().with_rename_window(window)?;
        Ok(())
    }

    /// Release the wrapper, returning the backend
    pub fn into_inner(self) -> B {
        self.backend
    }

    const fn cx(&self) -> RetryContext<'_, B> {
        RetryContext {
            backend: &self.backend,
            queue: &self.queue,
            stats: &self.stats,
        }
    }

    fn normalize(&self, operation: &str, result: io::Result<()>) -> io::Result<()> {
        permissions::normalize(operation, result, || self.options.is_privileged(), &self.stats)
    }

    fn correct(&self, result: io::Result<FileStat>) -> io::Result<FileStat> {
        result.map(|mut st| {
            if stat::correct_ids(&mut st) {
                self.stats.increment_stat_ids_corrected();
                debug!("corrected negative ids to uid {} gid {}", st.uid, st.gid);
            }
            st
        })
    }
}

impl<B: FsCapabilities> FsCapabilities for GracefulFs<B> {
    fn supports_lchown(&self) -> bool {
        self.backend.supports_lchown()
    }

    fn supports_lchmod(&self) -> bool {
        self.backend.supports_lchmod()
    }

    fn name(&self) -> &'static str {
        "graceful"
    }
}

impl<B: AsyncFs> AsyncFs for GracefulFs<B> {
    type File = B::File;

    async fn open(&self, path: &Path, options: &OpenOptions) -> io::Result<Self::File> {
        exhaustion::run(self.cx(), Open { path, options }).await
    }

    async fn close(&self, file: Self::File) -> io::Result<()> {
        let result = self.backend.close(file).await;
        self.cx().release();
        result
    }

    async fn read(
        &self,
        file: &Self::File,
        buf: Vec<u8>,
        position: u64,
    ) -> BufResult<usize, Vec<u8>> {
        transient::read(self.cx(), file, buf, position).await
    }

    async fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        exhaustion::run(self.cx(), ReadFile { path }).await
    }

    async fn write_file(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        exhaustion::run(self.cx(), WriteFile { path, data }).await
    }

    async fn append_file(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        exhaustion::run(self.cx(), AppendFile { path, data }).await
    }

    async fn read_dir(&self, path: &Path) -> io::Result<Vec<OsString>> {
        exhaustion::run(self.cx(), ReadDir { path }).await
    }

    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        retry::rename::rename(
            self.cx(),
            self.options.platform(),
            self.options.rename_window(),
            from,
            to,
        )
        .await
    }

    async fn stat(&self, path: &Path) -> io::Result<FileStat> {
        self.correct(self.backend.stat(path).await)
    }

    async fn fstat(&self, file: &Self::File) -> io::Result<FileStat> {
        self.correct(self.backend.fstat(file).await)
    }

    async fn lstat(&self, path: &Path) -> io::Result<FileStat> {
        self.correct(self.backend.lstat(path).await)
    }

    async fn chown(&self, path: &Path, uid: u32, gid: u32) -> io::Result<()> {
        self.normalize("chown", self.backend.chown(path, uid, gid).await)
    }

    async fn fchown(&self, file: &Self::File, uid: u32, gid: u32) -> io::Result<()> {
        self.normalize("fchown", self.backend.fchown(file, uid, gid).await)
    }

    async fn lchown(&self, path: &Path, uid: u32, gid: u32) -> io::Result<()> {
        if !self.backend.supports_lchown() {
            trace!("lchown unsupported by {}, skipping {}", self.backend.name(), path.display());
            YieldNow::default().await;
            return Ok(());
        }
        self.normalize("lchown", self.backend.lchown(path, uid, gid).await)
    }

    async fn chmod(&self, path: &Path, mode: u32) -> io::Result<()> {
        self.normalize("chmod", self.backend.chmod(path, mode).await)
    }

    async fn fchmod(&self, file: &Self::File, mode: u32) -> io::Result<()> {
        self.normalize("fchmod", self.backend.fchmod(file, mode).await)
    }

    async fn lchmod(&self, path: &Path, mode: u32) -> io::Result<()> {
        if !self.backend.supports_lchmod() {
            trace!("lchmod unsupported by {}, skipping {}", self.backend.name(), path.display());
            YieldNow::default().await;
            return Ok(());
        }
        self.normalize("lchmod", self.backend.lchmod(path, mode).await)
    }

    async fn access(&self, path: &Path, mode: AccessMode) -> io::Result<()> {
        self.backend.access(path, mode).await
    }
}

impl<B: BlockingFs> BlockingFs for GracefulFs<B> {
    type SyncFile = B::SyncFile;

    fn open_sync(&self, path: &Path, options: &OpenOptions) -> io::Result<Self::SyncFile> {
        self.backend.open_sync(path, options)
    }

    fn close_sync(&self, file: Self::SyncFile) -> io::Result<()> {
        let result = self.backend.close_sync(file);
        self.cx().release();
        result
    }

    fn read_sync(&self, file: &Self::SyncFile, buf: &mut [u8], position: u64) -> io::Result<usize> {
        transient::read_sync(self.cx(), file, buf, position)
    }

    fn read_file_sync(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.backend.read_file_sync(path)
    }

    fn write_file_sync(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        self.backend.write_file_sync(path, data)
    }

    fn append_file_sync(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        self.backend.append_file_sync(path, data)
    }

    fn read_dir_sync(&self, path: &Path) -> io::Result<Vec<OsString>> {
        let mut names = self.backend.read_dir_sync(path)?;
        names.sort();
        Ok(names)
    }

    fn rename_sync(&self, from: &Path, to: &Path) -> io::Result<()> {
        retry::rename::rename_sync(
            self.cx(),
            self.options.platform(),
            self.options.rename_window(),
            from,
            to,
        )
    }

    fn stat_sync(&self, path: &Path) -> io::Result<FileStat> {
        self.correct(self.backend.stat_sync(path))
    }

    fn fstat_sync(&self, file: &Self::SyncFile) -> io::Result<FileStat> {
        self.correct(self.backend.fstat_sync(file))
    }

    fn lstat_sync(&self, path: &Path) -> io::Result<FileStat> {
        self.correct(self.backend.lstat_sync(path))
    }

    fn chown_sync(&self, path: &Path, uid: u32, gid: u32) -> io::Result<()> {
        self.normalize("chown", self.backend.chown_sync(path, uid, gid))
    }

    fn fchown_sync(&self, file: &Self::SyncFile, uid: u32, gid: u32) -> io::Result<()> {
        self.normalize("fchown", self.backend.fchown_sync(file, uid, gid))
    }

    fn lchown_sync(&self, path: &Path, uid: u32, gid: u32) -> io::Result<()> {
        if !self.backend.supports_lchown() {
            return Ok(());
        }
        self.normalize("lchown", self.backend.lchown_sync(path, uid, gid))
    }

    fn chmod_sync(&self, path: &Path, mode: u32) -> io::Result<()> {
        self.normalize("chmod", self.backend.chmod_sync(path, mode))
    }

    fn fchmod_sync(&self, file: &Self::SyncFile, mode: u32) -> io::Result<()> {
        self.normalize("fchmod", self.backend.fchmod_sync(file, mode))
    }

    fn lchmod_sync(&self, path: &Path, mode: u32) -> io::Result<()> {
        if !self.backend.supports_lchmod() {
            return Ok(());
        }
        self.normalize("lchmod", self.backend.lchmod_sync(path, mode))
    }

    fn access_sync(&self, path: &Path, mode: AccessMode) -> io::Result<()> {
        self.backend.access_sync(path, mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{OpKind, PendingOp};
    use futures::FutureExt;
    use tempfile::TempDir;

    #[compio::test]
    async fn test_close_drains_one_waiter() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("f");
        std::fs::write(&path, b"x").unwrap();
        let fs = GracefulFs::os();

        let mut first = fs.queue().enqueue(PendingOp::new(OpKind::Open, "a"));
        let mut second = fs.queue().enqueue(PendingOp::new(OpKind::Open, "b"));

        // open itself delivers a result and frees the head entry
        let file = fs.open(&path, &OpenOptions::read_only()).await.unwrap();
        assert!((&mut first).now_or_never().is_some());
        assert!((&mut second).now_or_never().is_none());

        fs.close(file).await.unwrap();
        assert!(second.now_or_never().is_some());
        assert_eq!(fs.stats().drained(), 2);
    }

    #[test]
    fn test_close_sync_drains_on_empty_queue() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("f");
        let fs = GracefulFs::os();

        let file = fs.open_sync(&path, &OpenOptions::write_truncate()).unwrap();
        fs.close_sync(file).unwrap();
        assert_eq!(fs.stats().drained(), 0);
        assert!(fs.queue().is_empty());
    }

    #[test]
    fn test_read_dir_sync_sorted() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["zeta", "alpha", "mid"] {
            std::fs::write(temp_dir.path().join(name), b"").unwrap();
        }
        let fs = GracefulFs::os();
        assert_eq!(
            fs.read_dir_sync(temp_dir.path()).unwrap(),
            vec!["alpha", "mid", "zeta"]
        );
    }

    #[test]
    fn test_set_rename_window() {
        let mut fs = GracefulFs::os();
        fs.set_rename_window(Duration::from_millis(60)).unwrap();
        assert_eq!(fs.options().rename_window(), Duration::from_millis(60));
        assert!(fs.set_rename_window(Duration::ZERO).is_err());
        assert_eq!(fs.options().rename_window(), Duration::from_millis(60));
    }

    #[compio::test]
    async fn test_write_then_read_through_layer() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("f");
        let fs = GracefulFs::os();

        fs.write_file(&path, b"abc").await.unwrap();
        fs.append_file(&path, b"def").await.unwrap();
        assert_eq!(fs.read_file(&path).await.unwrap(), b"abcdef");
        assert_eq!(fs.stat(&path).await.unwrap().size, 6);
    }
}
