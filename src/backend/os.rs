//! The real operating-system backend
//!
//! Async calls go through `compio::fs` where compio has the primitive and
//! through `compio::runtime::spawn_blocking` where it does not (directory
//! listing, rename, access). Ownership, permission and access checks use
//! `compio-fs-extended`. The blocking surface is plain `std::fs`.

use super::{AccessMode, AsyncFs, BlockingFs, FsCapabilities, OpenOptions};
use crate::stat::FileStat;
use compio::io::AsyncReadAt;
use compio::BufResult;
use compio_fs_extended::{OwnershipOps, PermissionOps};
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Filesystem backend talking to the host OS
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

impl OsFs {
    /// Create the backend
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

/// Run a blocking closure on compio's thread pool, flattening a panic into
/// an `io::Error`
async fn blocking<T, F>(operation: F) -> io::Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> io::Result<T> + Send + 'static,
{
    compio::runtime::spawn_blocking(operation)
        .await
        .map_err(|e| io::Error::other(format!("spawn_blocking failed: {e:?}")))?
}

fn list_dir(path: &Path) -> io::Result<Vec<OsString>> {
    std::fs::read_dir(path)?
        .map(|entry| entry.map(|e| e.file_name()))
        .collect()
}

fn append_to(path: &Path, data: &[u8]) -> io::Result<()> {
    use std::io::Write;
    OpenOptions::append_create().to_std().open(path)?.write_all(data)
}

#[cfg(unix)]
fn stat_of(metadata: &std::fs::Metadata) -> FileStat {
    FileStat::from_unix(metadata)
}

#[cfg(not(unix))]
fn stat_of(metadata: &std::fs::Metadata) -> FileStat {
    FileStat::from_std(metadata)
}

impl FsCapabilities for OsFs {
    fn supports_lchown(&self) -> bool {
        compio_fs_extended::LCHOWN_SUPPORTED
    }

    fn supports_lchmod(&self) -> bool {
        compio_fs_extended::LCHMOD_SUPPORTED
    }

    fn name(&self) -> &'static str {
        "os"
    }
}

impl AsyncFs for OsFs {
    type File = compio::fs::File;

    async fn open(&self, path: &Path, options: &OpenOptions) -> io::Result<Self::File> {
        trace!("open {}", path.display());
        options.to_compio().open(path).await
    }

    async fn close(&self, file: Self::File) -> io::Result<()> {
        file.close().await
    }

    async fn read(
        &self,
        file: &Self::File,
        buf: Vec<u8>,
        position: u64,
    ) -> BufResult<usize, Vec<u8>> {
        file.read_at(buf, position).await
    }

    async fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        compio::fs::read(path).await
    }

    async fn write_file(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        compio::fs::write(path, data.to_vec()).await.0
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    async fn append_file(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        use compio::io::AsyncWriteAtExt;

        // O_APPEND makes the kernel ignore the offset and write at the end
        let mut file = OpenOptions::append_create().to_compio().open(path).await?;
        let written = file.write_all_at(data.to_vec(), 0).await.0;
        let closed = file.close().await;
        written.and(closed)
    }

    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    async fn append_file(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        let (path, data) = (path.to_path_buf(), data.to_vec());
        blocking(move || append_to(&path, &data)).await
    }

    async fn read_dir(&self, path: &Path) -> io::Result<Vec<OsString>> {
        let path = path.to_path_buf();
        blocking(move || list_dir(&path)).await
    }

    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let (from, to): (PathBuf, PathBuf) = (from.to_path_buf(), to.to_path_buf());
        blocking(move || std::fs::rename(from, to)).await
    }

    #[cfg(unix)]
    async fn stat(&self, path: &Path) -> io::Result<FileStat> {
        let metadata = compio::fs::metadata(path).await?;
        Ok(FileStat::from_unix(&metadata))
    }

    #[cfg(not(unix))]
    async fn stat(&self, path: &Path) -> io::Result<FileStat> {
        let path = path.to_path_buf();
        blocking(move || std::fs::metadata(path).map(|m| stat_of(&m))).await
    }

    #[cfg(unix)]
    async fn fstat(&self, file: &Self::File) -> io::Result<FileStat> {
        let metadata = file.metadata().await?;
        Ok(FileStat::from_unix(&metadata))
    }

    #[cfg(not(unix))]
    async fn fstat(&self, file: &Self::File) -> io::Result<FileStat> {
        let metadata = file.metadata().await?;
        Ok(FileStat::from_compio(&metadata))
    }

    #[cfg(unix)]
    async fn lstat(&self, path: &Path) -> io::Result<FileStat> {
        let metadata = compio::fs::symlink_metadata(path).await?;
        Ok(FileStat::from_unix(&metadata))
    }

    #[cfg(not(unix))]
    async fn lstat(&self, path: &Path) -> io::Result<FileStat> {
        let path = path.to_path_buf();
        blocking(move || std::fs::symlink_metadata(path).map(|m| stat_of(&m))).await
    }

    async fn chown(&self, path: &Path, uid: u32, gid: u32) -> io::Result<()> {
        compio_fs_extended::chown(path, uid, gid)
    }

    async fn fchown(&self, file: &Self::File, uid: u32, gid: u32) -> io::Result<()> {
        file.fchown(uid, gid).await
    }

    async fn lchown(&self, path: &Path, uid: u32, gid: u32) -> io::Result<()> {
        compio_fs_extended::lchown(path, uid, gid)
    }

    async fn chmod(&self, path: &Path, mode: u32) -> io::Result<()> {
        compio_fs_extended::chmod(path, mode)
    }

    async fn fchmod(&self, file: &Self::File, mode: u32) -> io::Result<()> {
        file.fchmod(mode).await
    }

    async fn lchmod(&self, path: &Path, mode: u32) -> io::Result<()> {
        compio_fs_extended::lchmod(path, mode)
    }

    async fn access(&self, path: &Path, mode: AccessMode) -> io::Result<()> {
        let path = path.to_path_buf();
        blocking(move || compio_fs_extended::access(&path, mode.bits())).await
    }
}

impl BlockingFs for OsFs {
    type SyncFile = std::fs::File;

    fn open_sync(&self, path: &Path, options: &OpenOptions) -> io::Result<Self::SyncFile> {
        options.to_std().open(path)
    }

    fn close_sync(&self, file: Self::SyncFile) -> io::Result<()> {
        drop(file);
        Ok(())
    }

    #[cfg(unix)]
    fn read_sync(&self, file: &Self::SyncFile, buf: &mut [u8], position: u64) -> io::Result<usize> {
        use std::os::unix::fs::FileExt;
        file.read_at(buf, position)
    }

    #[cfg(windows)]
    fn read_sync(&self, file: &Self::SyncFile, buf: &mut [u8], position: u64) -> io::Result<usize> {
        use std::os::windows::fs::FileExt;
        file.seek_read(buf, position)
    }

    fn read_file_sync(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn write_file_sync(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        std::fs::write(path, data)
    }

    fn append_file_sync(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        append_to(path, data)
    }

    fn read_dir_sync(&self, path: &Path) -> io::Result<Vec<OsString>> {
        list_dir(path)
    }

    fn rename_sync(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(from, to)
    }

    fn stat_sync(&self, path: &Path) -> io::Result<FileStat> {
        std::fs::metadata(path).map(|m| stat_of(&m))
    }

    fn fstat_sync(&self, file: &Self::SyncFile) -> io::Result<FileStat> {
        file.metadata().map(|m| stat_of(&m))
    }

    fn lstat_sync(&self, path: &Path) -> io::Result<FileStat> {
        std::fs::symlink_metadata(path).map(|m| stat_of(&m))
    }

    fn chown_sync(&self, path: &Path, uid: u32, gid: u32) -> io::Result<()> {
        compio_fs_extended::chown(path, uid, gid)
    }

    #[cfg(unix)]
    fn fchown_sync(&self, file: &Self::SyncFile, uid: u32, gid: u32) -> io::Result<()> {
        use std::os::unix::io::AsRawFd;
        compio_fs_extended::fchown_fd(file.as_raw_fd(), uid, gid)
    }

    #[cfg(not(unix))]
    fn fchown_sync(&self, _file: &Self::SyncFile, _uid: u32, _gid: u32) -> io::Result<()> {
        Err(io::Error::from(io::ErrorKind::Unsupported))
    }

    fn lchown_sync(&self, path: &Path, uid: u32, gid: u32) -> io::Result<()> {
        compio_fs_extended::lchown(path, uid, gid)
    }

    fn chmod_sync(&self, path: &Path, mode: u32) -> io::Result<()> {
        compio_fs_extended::chmod(path, mode)
    }

    #[cfg(unix)]
    fn fchmod_sync(&self, file: &Self::SyncFile, mode: u32) -> io::Result<()> {
        use std::os::unix::io::AsRawFd;
        compio_fs_extended::fchmod_fd(file.as_raw_fd(), mode)
    }

    #[cfg(not(unix))]
    fn fchmod_sync(&self, file: &Self::SyncFile, mode: u32) -> io::Result<()> {
        let mut permissions = file.metadata()?.permissions();
        permissions.set_readonly(mode & 0o200 == 0);
        file.set_permissions(permissions)
    }

    fn lchmod_sync(&self, path: &Path, mode: u32) -> io::Result<()> {
        compio_fs_extended::lchmod(path, mode)
    }

    fn access_sync(&self, path: &Path, mode: AccessMode) -> io::Result<()> {
        compio_fs_extended::access(path, mode.bits())
    }
}
