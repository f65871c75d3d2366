//! Configuration for a [`GracefulFs`](crate::GracefulFs) instance
//!
//! # Architecture
//!
//! Each instance owns its configuration:
//! - `GracefulOptions` - tunables, built fluently or read from the environment
//! - `Platform` - which platform quirks to emulate
//!
//! The only tunable carried over from the classic graceful-fs behavior is the
//! rename retry window. The platform and privilege overrides exist so the
//! Windows rename path and both permission-normalization branches can be
//! exercised on any host.

use crate::error::{Error, Result};
use std::str::FromStr;
use std::time::Duration;

/// Default rename retry window
pub const DEFAULT_RENAME_WINDOW: Duration = Duration::from_millis(1000);

/// Environment variable overriding the detected platform
pub const PLATFORM_ENV: &str = "GRACEFUL_FS_PLATFORM";

/// Environment variable overriding the rename retry window, in milliseconds
pub const RENAME_WINDOW_ENV: &str = "GRACEFUL_FS_RENAME_WINDOW_MS";

/// Platform family whose filesystem quirks are compensated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Windows-class: antivirus and indexers hold transient locks that make
    /// `rename` fail with `EACCES`/`EPERM`
    Windows,
    /// Everything else
    Posix,
}

impl Platform {
    /// The platform this binary was compiled for
    #[must_use]
    pub const fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Posix
        }
    }

    /// Whether rename needs the lock-contention retry
    #[must_use]
    pub const fn retries_rename(self) -> bool {
        matches!(self, Self::Windows)
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::current()
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "win32" | "windows" => Ok(Self::Windows),
            "posix" | "linux" | "darwin" | "unix" => Ok(Self::Posix),
            other => Err(Error::InvalidPlatform(other.to_string())),
        }
    }
}

/// Tunables for one layered filesystem
///
/// # Example
///
/// ```rust
/// use graceful_fs::{GracefulOptions, Platform};
/// use std::time::Duration;
///
/// let options = GracefulOptions::new()
///     .with_platform(Platform::Windows)
///     .with_rename_window(Duration::from_millis(250))
///     .unwrap();
/// assert_eq!(options.rename_window(), Duration::from_millis(250));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GracefulOptions {
    /// How long a Windows-class rename keeps retrying on lock contention
    rename_window: Duration,
    /// Platform quirks to compensate
    platform: Platform,
    /// Privilege override; `None` asks the OS
    privileged: Option<bool>,
}

impl GracefulOptions {
    /// Defaults: 1000ms rename window, detected platform, probed privilege
    #[must_use]
    pub fn new() -> Self {
        Self {
            rename_window: DEFAULT_RENAME_WINDOW,
            platform: Platform::current(),
            privileged: None,
        }
    }

    /// Defaults overridden by `GRACEFUL_FS_PLATFORM` and
    /// `GRACEFUL_FS_RENAME_WINDOW_MS` when they are set
    ///
    /// # Errors
    ///
    /// Returns an error if either variable holds an unusable value.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`
    ///
    /// # Errors
    ///
    /// Returns an error if either variable holds an unusable value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::new();

        if let Some(value) = lookup(PLATFORM_ENV) {
            options.platform = value.parse()?;
        }

        if let Some(value) = lookup(RENAME_WINDOW_ENV) {
            let millis: u64 = value
                .trim()
                .parse()
                .map_err(|e| Error::InvalidRenameWindow(format!("{value}: {e}")))?;
            options = options.with_rename_window(Duration::from_millis(millis))?;
        }

        Ok(options)
    }

    /// Set the rename retry window
    ///
    /// # Errors
    ///
    /// Returns an error if `window` is zero.
    pub fn with_rename_window(mut self, window: Duration) -> Result<Self> {
        if window.is_zero() {
            return Err(Error::InvalidRenameWindow(
                "window must be greater than zero".to_string(),
            ));
        }
        self.rename_window = window;
        Ok(self)
    }

    /// Set the platform whose quirks are compensated
    #[must_use]
    pub const fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Override the privilege probe (`None` asks the OS)
    #[must_use]
    pub const fn with_privileged(mut self, privileged: Option<bool>) -> Self {
        self.privileged = privileged;
        self
    }

    /// The rename retry window
    #[must_use]
    pub const fn rename_window(&self) -> Duration {
        self.rename_window
    }

    /// The compensated platform
    #[must_use]
    pub const fn platform(&self) -> Platform {
        self.platform
    }

    /// The privilege override, if any
    #[must_use]
    pub const fn privileged(&self) -> Option<bool> {
        self.privileged
    }

    /// Whether the process counts as privileged for permission normalization
    #[must_use]
    pub fn is_privileged(&self) -> bool {
        self.privileged.unwrap_or_else(compio_fs_extended::is_privileged)
    }
}

impl Default for GracefulOptions {
    fn default() -> Self {
        Self::new()
    }
}
