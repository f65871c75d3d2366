//! # graceful-fs
//!
//! A resilience layer for filesystem access on the compio runtime.
//!
//! Programs that touch many files at once run into failures that have
//! nothing to do with the files themselves: the process runs out of
//! descriptors, a non-blocking read is not ready yet, a virus scanner holds
//! a file that is being renamed, a filesystem has no notion of owners.
//! [`GracefulFs`] sits in front of a filesystem backend and absorbs them:
//!
//! - `EMFILE`/`ENFILE` from `open`, whole-file reads/writes/appends and
//!   directory listings park the call on a FIFO queue; every descriptor
//!   released through the layer resumes one parked call
//! - `EAGAIN` from `read` is retried up to 10 times
//! - on Windows-class platforms a rename that fails with `EACCES`/`EPERM`
//!   is retried with backoff while the destination is absent, for up to one
//!   second by default
//! - `chown`/`chmod` errors that only mean "not root" or "not supported"
//!   are reported as success
//! - negative `uid`/`gid` values from stat are wrapped back into `u32`
//!   range
//!
//! `GracefulFs<B>` implements the same [`AsyncFs`] and [`BlockingFs`]
//! traits as its backend, so it drops in wherever the backend was used.
//!
//! ## Example
//!
//! ```rust,no_run
//! use graceful_fs::{AsyncFs, GracefulFs, OpenOptions};
//! use std::path::PathBuf;
//!
//! #[compio::main]
//! async fn main() -> std::io::Result<()> {
//!     let fs = GracefulFs::os();
//!
//!     for i in 0..100_000 {
//!         let path = PathBuf::from(format!("out/{i}.txt"));
//!         let file = fs.open(&path, &OpenOptions::write_truncate()).await?;
//!         fs.close(file).await?;
//!     }
//!     println!("{:?}", fs.stats().snapshot());
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See [`GracefulOptions`]. [`GracefulOptions::from_env`] honours
//! `GRACEFUL_FS_PLATFORM` and `GRACEFUL_FS_RENAME_WINDOW_MS`, and
//! [`GracefulFs::os`] applies it, keeping the defaults when a value is
//! unusable.
//!
//! ## Logging
//!
//! Retries are reported through `tracing` (`debug!` per retry, `warn!` on
//! first descriptor exhaustion and when a retry gives up). The crate never
//! installs a subscriber.

pub mod backend;
pub mod errno;
pub mod error;
pub mod exists;
pub mod graceful;
pub mod options;
pub mod permissions;
pub mod queue;
pub mod retry;
pub mod stat;
pub mod stats;

pub use backend::{AccessMode, AsyncFs, BlockingFs, FsCapabilities, OpenOptions, OsFs};
pub use errno::ErrorCode;
pub use error::{Error, Result};
pub use exists::{ExistsExt, ExistsSyncExt};
pub use graceful::GracefulFs;
pub use options::{GracefulOptions, Platform};
pub use queue::{DeferredQueue, OpKind, PendingOp};
pub use stat::{FileKind, FileStat};
pub use stats::{RetrySnapshot, RetryStats};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
