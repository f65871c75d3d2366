//! Error types for configuration and argument parsing
//!
//! Filesystem operations never use this type: they return the backend's
//! [`std::io::Error`] untouched so callers can inspect the original code.

use thiserror::Error;

/// Result alias for configuration and parsing
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building options or parsing open flags
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Unknown platform name in configuration
    #[error("unknown platform '{0}' (expected win32, windows, posix, linux, darwin or unix)")]
    InvalidPlatform(String),

    /// Rename retry window that cannot be used
    #[error("invalid rename retry window: {0}")]
    InvalidRenameWindow(String),

    /// Unknown open flag string
    #[error("unknown open flags '{0}'")]
    InvalidFlags(String),
}
