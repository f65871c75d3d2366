//! Host error-code classification
//!
//! The retry policies key off a handful of POSIX error codes. On Unix the
//! raw `errno` is compared against `libc`; on Windows the Win32 codes are
//! mapped the way libuv maps them (`ERROR_ACCESS_DENIED` is `EPERM`, and so
//! on), except that sharing and lock violations count as `EACCES` since
//! they are the lock contention rename retries exist for. Errors that carry
//! no raw code, such as those synthesized by in-process backends, fall back
//! to [`std::io::ErrorKind`].

use std::fmt;
use std::io::{Error, ErrorKind};

/// The error codes this layer reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Too many open files in this process
    Emfile,
    /// Too many open files in the system
    Enfile,
    /// Resource temporarily unavailable
    Eagain,
    /// Permission denied
    Eacces,
    /// Operation not permitted
    Eperm,
    /// No such file or directory
    Enoent,
    /// Function not implemented
    Enosys,
    /// Invalid argument
    Einval,
}

impl ErrorCode {
    /// Classify an I/O error, if it is one of the codes this layer knows
    #[must_use]
    pub fn of(error: &Error) -> Option<Self> {
        error
            .raw_os_error()
            .and_then(Self::from_raw)
            .or_else(|| Self::from_kind(error.kind()))
    }

    /// Whether `error` carries this code
    #[must_use]
    pub fn matches(self, error: &Error) -> bool {
        Self::of(error) == Some(self)
    }

    /// The symbolic name, e.g. `"EMFILE"`
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Emfile => "EMFILE",
            Self::Enfile => "ENFILE",
            Self::Eagain => "EAGAIN",
            Self::Eacces => "EACCES",
            Self::Eperm => "EPERM",
            Self::Enoent => "ENOENT",
            Self::Enosys => "ENOSYS",
            Self::Einval => "EINVAL",
        }
    }

    /// Build an [`Error`] carrying this code in the host's native numbering
    #[must_use]
    pub fn to_io_error(self) -> Error {
        Error::from_raw_os_error(self.raw())
    }

    #[cfg(unix)]
    const fn raw(self) -> i32 {
        match self {
            Self::Emfile => libc::EMFILE,
            Self::Enfile => libc::ENFILE,
            Self::Eagain => libc::EAGAIN,
            Self::Eacces => libc::EACCES,
            Self::Eperm => libc::EPERM,
            Self::Enoent => libc::ENOENT,
            Self::Enosys => libc::ENOSYS,
            Self::Einval => libc::EINVAL,
        }
    }

    #[cfg(unix)]
    fn from_raw(code: i32) -> Option<Self> {
        // EWOULDBLOCK aliases EAGAIN on every platform we target, but not by
        // definition, so it is matched separately.
        Some(match code {
            libc::EMFILE => Self::Emfile,
            libc::ENFILE => Self::Enfile,
            libc::EAGAIN => Self::Eagain,
            c if c == libc::EWOULDBLOCK => Self::Eagain,
            libc::EACCES => Self::Eacces,
            libc::EPERM => Self::Eperm,
            libc::ENOENT => Self::Enoent,
            libc::ENOSYS => Self::Enosys,
            libc::EINVAL => Self::Einval,
            _ => return None,
        })
    }

    #[cfg(windows)]
    const fn raw(self) -> i32 {
        match self {
            Self::Emfile => win32::ERROR_TOO_MANY_OPEN_FILES,
            Self::Enfile => win32::ERROR_NO_MORE_SEARCH_HANDLES,
            Self::Eagain => win32::ERROR_NO_DATA,
            Self::Eacces => win32::ERROR_SHARING_VIOLATION,
            Self::Eperm => win32::ERROR_ACCESS_DENIED,
            Self::Enoent => win32::ERROR_FILE_NOT_FOUND,
            Self::Enosys => win32::ERROR_CALL_NOT_IMPLEMENTED,
            Self::Einval => win32::ERROR_INVALID_PARAMETER,
        }
    }

    #[cfg(windows)]
    fn from_raw(code: i32) -> Option<Self> {
        Some(match code {
            win32::ERROR_TOO_MANY_OPEN_FILES => Self::Emfile,
            win32::ERROR_NO_MORE_SEARCH_HANDLES => Self::Enfile,
            win32::ERROR_NO_DATA => Self::Eagain,
            win32::ERROR_SHARING_VIOLATION | win32::ERROR_LOCK_VIOLATION => Self::Eacces,
            win32::ERROR_ACCESS_DENIED => Self::Eperm,
            win32::ERROR_FILE_NOT_FOUND | win32::ERROR_PATH_NOT_FOUND => Self::Enoent,
            win32::ERROR_CALL_NOT_IMPLEMENTED | win32::ERROR_NOT_SUPPORTED => Self::Enosys,
            win32::ERROR_INVALID_PARAMETER => Self::Einval,
            _ => return None,
        })
    }

    #[cfg(not(any(unix, windows)))]
    const fn raw(self) -> i32 {
        -1
    }

    #[cfg(not(any(unix, windows)))]
    fn from_raw(_code: i32) -> Option<Self> {
        None
    }

    fn from_kind(kind: ErrorKind) -> Option<Self> {
        match kind {
            ErrorKind::NotFound => Some(Self::Enoent),
            ErrorKind::PermissionDenied => Some(Self::Eacces),
            ErrorKind::WouldBlock => Some(Self::Eagain),
            ErrorKind::Unsupported => Some(Self::Enosys),
            ErrorKind::InvalidInput => Some(Self::Einval),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Win32 error numbers, as libuv translates them
#[cfg(windows)]
mod win32 {
    pub const ERROR_FILE_NOT_FOUND: i32 = 2;
    pub const ERROR_PATH_NOT_FOUND: i32 = 3;
    pub const ERROR_TOO_MANY_OPEN_FILES: i32 = 4;
    pub const ERROR_ACCESS_DENIED: i32 = 5;
    pub const ERROR_SHARING_VIOLATION: i32 = 32;
    pub const ERROR_LOCK_VIOLATION: i32 = 33;
    pub const ERROR_NOT_SUPPORTED: i32 = 50;
    pub const ERROR_INVALID_PARAMETER: i32 = 87;
    pub const ERROR_CALL_NOT_IMPLEMENTED: i32 = 120;
    pub const ERROR_NO_DATA: i32 = 232;
    pub const ERROR_NO_MORE_SEARCH_HANDLES: i32 = 113;
}

/// Descriptor exhaustion: `EMFILE` or `ENFILE`
#[must_use]
pub fn is_exhaustion(error: &Error) -> bool {
    matches!(
        ErrorCode::of(error),
        Some(ErrorCode::Emfile | ErrorCode::Enfile)
    )
}

/// Transient unavailability: `EAGAIN`
#[must_use]
pub fn is_transient(error: &Error) -> bool {
    ErrorCode::Eagain.matches(error)
}

/// Lock contention on rename: `EACCES` or `EPERM`
#[must_use]
pub fn is_lock_contention(error: &Error) -> bool {
    matches!(
        ErrorCode::of(error),
        Some(ErrorCode::Eacces | ErrorCode::Eperm)
    )
}
