//! File ownership operations
//!
//! # Operations
//!
//! - **chown**: change owner of a path, following symlinks
//! - **lchown**: change owner of a symlink itself
//! - **fchown_fd**: change owner of an open descriptor
//! - **OwnershipOps::fchown**: async `fchown` on a `compio::fs::File`
//!
//! On hosts without ownership semantics every operation fails with
//! [`std::io::ErrorKind::Unsupported`].

use crate::sys::cheap_call;
#[cfg(unix)]
use nix::fcntl::AtFlags;
#[cfg(unix)]
use nix::unistd::{Gid, Uid};
use std::path::Path;

/// Whether `lchown` exists on this host
pub const LCHOWN_SUPPORTED: bool = cfg!(unix);

/// Change the owner and group of `path`, following symlinks
///
/// # Errors
///
/// Returns the OS error (`EPERM`, `EINVAL`, `ENOENT`, ...) unchanged.
pub fn chown(path: &Path, uid: u32, gid: u32) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        nix::unistd::chown(path, Some(Uid::from_raw(uid)), Some(Gid::from_raw(gid)))
            .map_err(std::io::Error::from)
    }

    #[cfg(not(unix))]
    {
        let _ = (path, uid, gid);
        Err(crate::sys::unsupported())
    }
}

/// Change the owner and group of `path` without following symlinks
///
/// # Errors
///
/// Returns the OS error unchanged.
pub fn lchown(path: &Path, uid: u32, gid: u32) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        nix::unistd::fchownat(
            None,
            path,
            Some(Uid::from_raw(uid)),
            Some(Gid::from_raw(gid)),
            AtFlags::AT_SYMLINK_NOFOLLOW,
        )
        .map_err(std::io::Error::from)
    }

    #[cfg(not(unix))]
    {
        let _ = (path, uid, gid);
        Err(crate::sys::unsupported())
    }
}

/// Change the owner and group of an open file descriptor
///
/// # Errors
///
/// Returns the OS error unchanged.
#[cfg(unix)]
pub fn fchown_fd(fd: std::os::unix::io::RawFd, uid: u32, gid: u32) -> std::io::Result<()> {
    nix::unistd::fchown(fd, Some(Uid::from_raw(uid)), Some(Gid::from_raw(gid)))
        .map_err(std::io::Error::from)
}

/// Async ownership operations on open files
#[allow(async_fn_in_trait)]
pub trait OwnershipOps {
    /// Change the owner and group of this file
    ///
    /// # Errors
    ///
    /// Returns the OS error unchanged.
    async fn fchown(&self, uid: u32, gid: u32) -> std::io::Result<()>;
}

impl OwnershipOps for compio::fs::File {
    async fn fchown(&self, uid: u32, gid: u32) -> std::io::Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;

            let fd = self.as_raw_fd();
            cheap_call!(move || fchown_fd(fd, uid, gid))
        }

        #[cfg(not(unix))]
        {
            let _ = (uid, gid);
            Err(crate::sys::unsupported())
        }
    }
}
