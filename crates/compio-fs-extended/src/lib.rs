//! # compio-fs-extended
//!
//! Ownership and permission operations that are not available in the base
//! compio-fs crate:
//! - `chown` / `lchown` / `fchown`
//! - `chmod` / `lchmod` / `fchmod`
//! - `access`
//! - Effective-user privilege probe
//!
//! Path-based functions are plain blocking syscalls. Descriptor-based
//! operations on `compio::fs::File` are exposed as async methods through
//! [`OwnershipOps`] and [`PermissionOps`]; with the default
//! `cheap_calls_sync` feature they run inline on the runtime thread.
//!
//! Every function reports failures as the raw [`std::io::Error`] produced by
//! the OS, so callers can inspect `raw_os_error()` without unwrapping any
//! crate-specific error type.
//!
//! ## Example
//!
//! ```rust,no_run
//! # #[cfg(unix)]
//! # {
//! use compio_fs_extended::{OwnershipOps, PermissionOps};
//! use compio::fs::File;
//!
//! # async fn example() -> std::io::Result<()> {
//! let file = File::open("data.txt").await?;
//! file.fchmod(0o640).await?;
//! file.fchown(1000, 1000).await?;
//! # Ok(())
//! # }
//! # }
//! ```

pub mod ownership;
pub mod permissions;
pub mod privilege;

mod sys;

pub use ownership::{chown, lchown, OwnershipOps, LCHOWN_SUPPORTED};
#[cfg(unix)]
pub use ownership::fchown_fd;
pub use permissions::{access, chmod, lchmod, PermissionOps, LCHMOD_SUPPORTED};
#[cfg(unix)]
pub use permissions::fchmod_fd;
pub use privilege::is_privileged;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
