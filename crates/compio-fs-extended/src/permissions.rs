//! File permission operations
//!
//! - **chmod**: change mode of a path, following symlinks
//! - **lchmod**: change mode of a symlink itself (not every kernel has one)
//! - **fchmod_fd**: change mode of an open descriptor
//! - **PermissionOps::fchmod**: async `fchmod` on a `compio::fs::File`
//! - **access**: check the caller's access to a path
//!
//! Linux has no `lchmod`: `fchmodat(AT_SYMLINK_NOFOLLOW)` is rejected for
//! symlinks, so [`LCHMOD_SUPPORTED`] is `false` there and [`lchmod`] fails
//! with `EOPNOTSUPP`. On non-Unix hosts `chmod` only toggles the read-only
//! attribute from the owner write bit (`0o200`).

use crate::sys::cheap_call;
#[cfg(unix)]
use nix::sys::stat::{FchmodatFlags, Mode};
#[cfg(unix)]
use nix::unistd::AccessFlags;
use std::path::Path;

/// Whether `lchmod` exists on this host
pub const LCHMOD_SUPPORTED: bool = cfg!(all(
    unix,
    not(any(target_os = "linux", target_os = "android"))
));

#[cfg(unix)]
#[allow(clippy::cast_possible_truncation, clippy::unnecessary_cast)]
fn mode_bits(mode: u32) -> Mode {
    Mode::from_bits_truncate(mode as nix::libc::mode_t)
}

/// Change the mode of `path`, following symlinks
///
/// # Errors
///
/// Returns the OS error unchanged.
pub fn chmod(path: &Path, mode: u32) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        nix::sys::stat::fchmodat(None, path, mode_bits(mode), FchmodatFlags::FollowSymlink)
            .map_err(std::io::Error::from)
    }

    #[cfg(not(unix))]
    {
        let mut permissions = std::fs::metadata(path)?.permissions();
        permissions.set_readonly(mode & 0o200 == 0);
        std::fs::set_permissions(path, permissions)
    }
}

/// Change the mode of `path` without following symlinks
///
/// # Errors
///
/// Fails with `EOPNOTSUPP` where the host has no `lchmod`; otherwise returns
/// the OS error unchanged.
pub fn lchmod(path: &Path, mode: u32) -> std::io::Result<()> {
    #[cfg(all(unix, not(any(target_os = "linux", target_os = "android"))))]
    {
        nix::sys::stat::fchmodat(None, path, mode_bits(mode), FchmodatFlags::NoFollowSymlink)
            .map_err(std::io::Error::from)
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    {
        let _ = (path, mode);
        Err(nix::errno::Errno::EOPNOTSUPP.into())
    }

    #[cfg(not(unix))]
    {
        let _ = (path, mode);
        Err(crate::sys::unsupported())
    }
}

/// Change the mode of an open file descriptor
///
/// # Errors
///
/// Returns the OS error unchanged.
#[cfg(unix)]
pub fn fchmod_fd(fd: std::os::unix::io::RawFd, mode: u32) -> std::io::Result<()> {
    nix::sys::stat::fchmod(fd, mode_bits(mode)).map_err(std::io::Error::from)
}

/// Check the caller's access to `path`
///
/// `mode` is a union of the POSIX `R_OK` (4), `W_OK` (2) and `X_OK` (1)
/// bits; zero only checks existence. Without POSIX permission bits only
/// existence and the read-only attribute are checked.
///
/// # Errors
///
/// Returns the OS error (`ENOENT`, `EACCES`, ...) unchanged.
pub fn access(path: &Path, mode: u32) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        #[allow(clippy::cast_possible_wrap)]
        let flags = AccessFlags::from_bits_truncate(mode as nix::libc::c_int);
        nix::unistd::access(path, flags).map_err(std::io::Error::from)
    }

    #[cfg(not(unix))]
    {
        let metadata = std::fs::metadata(path)?;
        if mode & 0o2 != 0 && metadata.permissions().readonly() {
            return Err(std::io::Error::from(std::io::ErrorKind::PermissionDenied));
        }
        Ok(())
    }
}

/// Async permission operations on open files
#[allow(async_fn_in_trait)]
pub trait PermissionOps {
    /// Change the mode of this file
    ///
    /// # Errors
    ///
    /// Returns the OS error unchanged.
    async fn fchmod(&self, mode: u32) -> std::io::Result<()>;
}

impl PermissionOps for compio::fs::File {
    async fn fchmod(&self, mode: u32) -> std::io::Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;

            let fd = self.as_raw_fd();
            cheap_call!(move || fchmod_fd(fd, mode))
        }

        #[cfg(not(unix))]
        {
            let _ = mode;
            Err(crate::sys::unsupported())
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn mode_of(path: &Path) -> u32 {
        std::fs::metadata(path).unwrap().permissions().mode() & 0o777
    }

    #[test]
    fn test_chmod_changes_mode() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("file.txt");
        std::fs::write(&path, b"x").unwrap();

        chmod(&path, 0o600).unwrap();
        assert_eq!(mode_of(&path), 0o600);

        chmod(&path, 0o644).unwrap();
        assert_eq!(mode_of(&path), 0o644);
    }

    #[test]
    fn test_chmod_missing_path_reports_enoent() {
        let temp_dir = TempDir::new().unwrap();
        let err = chmod(&temp_dir.path().join("missing"), 0o600).unwrap_err();

        assert_eq!(err.raw_os_error(), Some(libc::ENOENT));
    }

    #[test]
    fn test_lchmod_matches_support_flag() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("file.txt");
        std::fs::write(&path, b"x").unwrap();

        let result = lchmod(&path, 0o600);
        assert_eq!(result.is_ok(), LCHMOD_SUPPORTED);
    }

    #[test]
    fn test_access_reports_missing_and_denied() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("file.txt");
        std::fs::write(&path, b"x").unwrap();

        access(&path, 0).unwrap();
        access(&path, 4 | 2).unwrap();

        let err = access(&temp_dir.path().join("missing"), 0).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::ENOENT));

        chmod(&path, 0o644).unwrap();
        let err = access(&path, 1).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::EACCES));
    }

    #[compio::test]
    async fn test_async_fchmod_changes_mode() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("file.txt");
        std::fs::write(&path, b"x").unwrap();

        let file = compio::fs::File::open(&path).await.unwrap();
        file.fchmod(0o640).await.unwrap();

        assert_eq!(mode_of(&path), 0o640);
    }
}
