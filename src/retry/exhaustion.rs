//! Descriptor-exhaustion retry
//!
//! When a primitive fails with `EMFILE` or `ENFILE` the caller never sees
//! it. The operation parks on the deferred queue, waits for some descriptor
//! to be released through the layer, and replays with the same arguments.
//! Any other outcome, success or failure, is delivered as-is and frees one
//! queued waiter, since the call may have released a descriptor of its own.
//!
//! One engine ([`run`]) handles every primitive; each primitive is an
//! [`Operation`] that knows how to call itself.

use super::RetryContext;
use crate::backend::{AsyncFs, OpenOptions};
use crate::errno::{self, ErrorCode};
use crate::queue::{OpKind, PendingOp};
use std::ffi::OsString;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

/// A primitive the exhaustion engine can replay
#[allow(async_fn_in_trait)]
pub trait Operation<B: AsyncFs> {
    /// What a successful call produces
    type Output;

    /// Queue tag
    const KIND: OpKind;

    /// The path the operation works on
    fn target(&self) -> &Path;

    /// Invoke the primitive once
    async fn call(&mut self, backend: &B) -> io::Result<Self::Output>;
}

/// Run `op`, parking it on the queue for as long as descriptors are exhausted
///
/// # Errors
///
/// Returns the first error that is not `EMFILE`/`ENFILE`.
pub async fn run<B, O>(cx: RetryContext<'_, B>, mut op: O) -> io::Result<O::Output>
where
    B: AsyncFs,
    O: Operation<B>,
{
    loop {
        match op.call(cx.backend).await {
            Err(e) if errno::is_exhaustion(&e) => {
                let code = ErrorCode::of(&e).map_or("EMFILE", ErrorCode::name);
                if cx.stats.first_exhaustion() {
                    warn!(
                        "descriptor exhaustion ({}) on {}: deferring operations until descriptors are released",
                        code,
                        cx.backend.name()
                    );
                }
                debug!("{} {} failed with {}, deferring", O::KIND, op.target().display(), code);
                cx.stats.increment_deferred();
                cx.queue.enqueue(PendingOp::new(O::KIND, op.target())).await;
                debug!("replaying {} {}", O::KIND, op.target().display());
            }
            result => {
                cx.release();
                return result;
            }
        }
    }
}

/// `open`
#[derive(Debug)]
pub struct Open<'a> {
    /// File to open
    pub path: &'a Path,
    /// How to open it
    pub options: &'a OpenOptions,
}

impl<B: AsyncFs> Operation<B> for Open<'_> {
    type Output = B::File;
    const KIND: OpKind = OpKind::Open;

    fn target(&self) -> &Path {
        self.path
    }

    async fn call(&mut self, backend: &B) -> io::Result<B::File> {
        backend.open(self.path, self.options).await
    }
}

/// Whole-file read
#[derive(Debug)]
pub struct ReadFile<'a> {
    /// File to read
    pub path: &'a Path,
}

impl<B: AsyncFs> Operation<B> for ReadFile<'_> {
    type Output = Vec<u8>;
    const KIND: OpKind = OpKind::ReadFile;

    fn target(&self) -> &Path {
        self.path
    }

    async fn call(&mut self, backend: &B) -> io::Result<Vec<u8>> {
        backend.read_file(self.path).await
    }
}

/// Whole-file write
#[derive(Debug)]
pub struct WriteFile<'a> {
    /// File to create or truncate
    pub path: &'a Path,
    /// New contents
    pub data: &'a [u8],
}

impl<B: AsyncFs> Operation<B> for WriteFile<'_> {
    type Output = ();
    const KIND: OpKind = OpKind::WriteFile;

    fn target(&self) -> &Path {
        self.path
    }

    async fn call(&mut self, backend: &B) -> io::Result<()> {
        backend.write_file(self.path, self.data).await
    }
}

/// Whole-file append
#[derive(Debug)]
pub struct AppendFile<'a> {
    /// File to append to
    pub path: &'a Path,
    /// Bytes to append
    pub data: &'a [u8],
}

impl<B: AsyncFs> Operation<B> for AppendFile<'_> {
    type Output = ();
    const KIND: OpKind = OpKind::AppendFile;

    fn target(&self) -> &Path {
        self.path
    }

    async fn call(&mut self, backend: &B) -> io::Result<()> {
        backend.append_file(self.path, self.data).await
    }
}

/// Directory listing, sorted by name
#[derive(Debug)]
pub struct ReadDir<'a> {
    /// Directory to list
    pub path: &'a Path,
}

impl<B: AsyncFs> Operation<B> for ReadDir<'_> {
    type Output = Vec<OsString>;
    const KIND: OpKind = OpKind::ReadDir;

    fn target(&self) -> &Path {
        self.path
    }

    async fn call(&mut self, backend: &B) -> io::Result<Vec<OsString>> {
        let mut names = backend.read_dir(self.path).await?;
        names.sort();
        Ok(names)
    }
}
