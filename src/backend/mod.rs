//! Filesystem backend traits
//!
//! These traits describe the primitives the resilience layer sits in front
//! of. A backend is anything that can open, read, write, list, rename, stat
//! and change ownership of files: the real OS ([`OsFs`]) or a test double.
//! [`GracefulFs`](crate::GracefulFs) implements the same traits, so callers
//! can swap it in without changing a single call site.
//!
//! The async surface ([`AsyncFs`]) follows compio's conventions: buffers
//! are passed by value and handed back. The blocking surface
//! ([`BlockingFs`]) follows `std`.

pub mod open_options;
pub mod os;

use crate::stat::FileStat;
use compio::BufResult;
use std::ffi::OsString;
use std::io;
use std::path::Path;

pub use open_options::OpenOptions;
pub use os::OsFs;

/// Permission bits checked by `access`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccessMode(u32);

impl AccessMode {
    /// The path exists
    pub const EXISTS: Self = Self(0);
    /// Readable
    pub const READ: Self = Self(4);
    /// Writable
    pub const WRITE: Self = Self(2);
    /// Executable / searchable
    pub const EXECUTE: Self = Self(1);

    /// Raw `F_OK`/`R_OK`/`W_OK`/`X_OK` bits
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Union of two modes
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl std::ops::BitOr for AccessMode {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl Default for AccessMode {
    fn default() -> Self {
        Self::EXISTS
    }
}

/// Optional primitives a backend may lack
///
/// Some hosts have no `lchown`/`lchmod`. The permission normalizer turns
/// the missing ones into no-ops instead of calling them.
pub trait FsCapabilities {
    /// Whether `lchown` exists
    fn supports_lchown(&self) -> bool {
        true
    }

    /// Whether `lchmod` exists
    fn supports_lchmod(&self) -> bool {
        true
    }

    /// Backend name for logging
    fn name(&self) -> &'static str {
        "unknown"
    }
}

/// Async filesystem primitives
///
/// # Examples
///
/// ```rust,no_run
/// use graceful_fs::{AsyncFs, OpenOptions, OsFs};
/// use std::path::Path;
///
/// # async fn example() -> std::io::Result<()> {
/// let fs = OsFs::new();
/// let file = fs.open(Path::new("data.txt"), &OpenOptions::read_only()).await?;
/// let buf = Vec::with_capacity(4096);
/// let compio::BufResult(read, buf) = fs.read(&file, buf, 0).await;
/// println!("read {} bytes: {:?}", read?, buf);
/// fs.close(file).await?;
/// # Ok(())
/// # }
/// ```
#[allow(async_fn_in_trait)]
pub trait AsyncFs: FsCapabilities {
    /// Open file handle
    type File;

    /// Open a file
    ///
    /// # Errors
    ///
    /// Returns the OS error, e.g. `EMFILE` when the process is out of
    /// descriptors or `ENOENT` when the file is missing and not created.
    async fn open(&self, path: &Path, options: &OpenOptions) -> io::Result<Self::File>;

    /// Release a file handle
    ///
    /// # Errors
    ///
    /// Returns the OS error from `close(2)`.
    async fn close(&self, file: Self::File) -> io::Result<()>;

    /// Read at `position` into the spare capacity of `buf`
    ///
    /// Returns the number of bytes read (0 at EOF) together with the buffer,
    /// whose length has grown by that amount.
    async fn read(&self, file: &Self::File, buf: Vec<u8>, position: u64)
        -> BufResult<usize, Vec<u8>>;

    /// Read a whole file
    ///
    /// # Errors
    ///
    /// Returns the OS error from opening or reading the file.
    async fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Create or truncate a file and write `data` to it
    ///
    /// # Errors
    ///
    /// Returns the OS error from opening or writing the file.
    async fn write_file(&self, path: &Path, data: &[u8]) -> io::Result<()>;

    /// Create a file if needed and append `data` to it
    ///
    /// # Errors
    ///
    /// Returns the OS error from opening or writing the file.
    async fn append_file(&self, path: &Path, data: &[u8]) -> io::Result<()>;

    /// List the entry names of a directory, in no particular order
    ///
    /// # Errors
    ///
    /// Returns the OS error from opening or reading the directory.
    async fn read_dir(&self, path: &Path) -> io::Result<Vec<OsString>>;

    /// Rename `from` to `to`
    ///
    /// # Errors
    ///
    /// Returns the OS error from `rename(2)`.
    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Metadata of `path`, following symlinks
    ///
    /// # Errors
    ///
    /// Returns the OS error from `stat(2)`.
    async fn stat(&self, path: &Path) -> io::Result<FileStat>;

    /// Metadata of an open file
    ///
    /// # Errors
    ///
    /// Returns the OS error from `fstat(2)`.
    async fn fstat(&self, file: &Self::File) -> io::Result<FileStat>;

    /// Metadata of `path` itself, not following symlinks
    ///
    /// # Errors
    ///
    /// Returns the OS error from `lstat(2)`.
    async fn lstat(&self, path: &Path) -> io::Result<FileStat>;

    /// Change owner of `path`
    ///
    /// # Errors
    ///
    /// Returns the OS error from `chown(2)`.
    async fn chown(&self, path: &Path, uid: u32, gid: u32) -> io::Result<()>;

    /// Change owner of an open file
    ///
    /// # Errors
    ///
    /// Returns the OS error from `fchown(2)`.
    async fn fchown(&self, file: &Self::File, uid: u32, gid: u32) -> io::Result<()>;

    /// Change owner of a symlink itself
    ///
    /// # Errors
    ///
    /// Returns the OS error from `lchown(2)`.
    async fn lchown(&self, path: &Path, uid: u32, gid: u32) -> io::Result<()>;

    /// Change mode of `path`
    ///
    /// # Errors
    ///
    /// Returns the OS error from `chmod(2)`.
    async fn chmod(&self, path: &Path, mode: u32) -> io::Result<()>;

    /// Change mode of an open file
    ///
    /// # Errors
    ///
    /// Returns the OS error from `fchmod(2)`.
    async fn fchmod(&self, file: &Self::File, mode: u32) -> io::Result<()>;

    /// Change mode of a symlink itself
    ///
    /// # Errors
    ///
    /// Returns the OS error from `lchmod(2)`.
    async fn lchmod(&self, path: &Path, mode: u32) -> io::Result<()>;

    /// Check accessibility of `path`
    ///
    /// # Errors
    ///
    /// Returns the OS error from `access(2)`.
    async fn access(&self, path: &Path, mode: AccessMode) -> io::Result<()>;
}

/// Blocking filesystem primitives
///
/// The same operations as [`AsyncFs`] with `std`-style signatures.
pub trait BlockingFs: FsCapabilities {
    /// Open file handle
    type SyncFile;

    /// Open a file
    ///
    /// # Errors
    ///
    /// Returns the OS error.
    fn open_sync(&self, path: &Path, options: &OpenOptions) -> io::Result<Self::SyncFile>;

    /// Release a file handle
    ///
    /// # Errors
    ///
    /// Returns the OS error from `close(2)`.
    fn close_sync(&self, file: Self::SyncFile) -> io::Result<()>;

    /// Read at `position` into `buf`
    ///
    /// # Errors
    ///
    /// Returns the OS error, e.g. `EAGAIN` on a non-blocking descriptor.
    fn read_sync(&self, file: &Self::SyncFile, buf: &mut [u8], position: u64)
        -> io::Result<usize>;

    /// Read a whole file
    ///
    /// # Errors
    ///
    /// Returns the OS error.
    fn read_file_sync(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Create or truncate a file and write `data` to it
    ///
    /// # Errors
    ///
    /// Returns the OS error.
    fn write_file_sync(&self, path: &Path, data: &[u8]) -> io::Result<()>;

    /// Create a file if needed and append `data` to it
    ///
    /// # Errors
    ///
    /// Returns the OS error.
    fn append_file_sync(&self, path: &Path, data: &[u8]) -> io::Result<()>;

    /// List the entry names of a directory, in no particular order
    ///
    /// # Errors
    ///
    /// Returns the OS error.
    fn read_dir_sync(&self, path: &Path) -> io::Result<Vec<OsString>>;

    /// Rename `from` to `to`
    ///
    /// # Errors
    ///
    /// Returns the OS error.
    fn rename_sync(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Metadata of `path`, following symlinks
    ///
    /// # Errors
    ///
    /// Returns the OS error.
    fn stat_sync(&self, path: &Path) -> io::Result<FileStat>;

    /// Metadata of an open file
    ///
    /// # Errors
    ///
    /// Returns the OS error.
    fn fstat_sync(&self, file: &Self::SyncFile) -> io::Result<FileStat>;

    /// Metadata of `path` itself
    ///
    /// # Errors
    ///
    /// Returns the OS error.
    fn lstat_sync(&self, path: &Path) -> io::Result<FileStat>;

    /// Change owner of `path`
    ///
    /// # Errors
    ///
    /// Returns the OS error.
    fn chown_sync(&self, path: &Path, uid: u32, gid: u32) -> io::Result<()>;

    /// Change owner of an open file
    ///
    /// # Errors
    ///
    /// Returns the OS error.
    fn fchown_sync(&self, file: &Self::SyncFile, uid: u32, gid: u32) -> io::Result<()>;

    /// Change owner of a symlink itself
    ///
    /// # Errors
    ///
    /// Returns the OS error.
    fn lchown_sync(&self, path: &Path, uid: u32, gid: u32) -> io::Result<()>;

    /// Change mode of `path`
    ///
    /// # Errors
    ///
    /// Returns the OS error.
    fn chmod_sync(&self, path: &Path, mode: u32) -> io::Result<()>;

    /// Change mode of an open file
    ///
    /// # Errors
    ///
    /// Returns the OS error.
    fn fchmod_sync(&self, file: &Self::SyncFile, mode: u32) -> io::Result<()>;

    /// Change mode of a symlink itself
    ///
    /// # Errors
    ///
    /// Returns the OS error.
    fn lchmod_sync(&self, path: &Path, mode: u32) -> io::Result<()>;

    /// Check accessibility of `path`
    ///
    /// # Errors
    ///
    /// Returns the OS error.
    fn access_sync(&self, path: &Path, mode: AccessMode) -> io::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_mode_bits() {
        assert_eq!(AccessMode::EXISTS.bits(), 0);
        assert_eq!((AccessMode::READ | AccessMode::WRITE).bits(), 6);
        assert_eq!(AccessMode::default(), AccessMode::EXISTS);
    }
}
