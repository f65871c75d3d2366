//! Deferred operation queue
//!
//! Operations that failed because the process ran out of descriptors park
//! here until some descriptor is released through the layer. Each release
//! calls [`DeferredQueue::drain_one`], which resumes exactly one waiter in
//! arrival order.
//!
//! An entry is a description of what is waiting ([`PendingOp`]) plus a
//! one-shot resume handle. The waiting wrapper keeps its own typed
//! arguments and replays them after it is resumed, so the queue never owns
//! a closure.
//!
//! # Example
//!
//! ```rust
//! use graceful_fs::queue::{DeferredQueue, OpKind, PendingOp};
//!
//! # async fn example() {
//! let queue = DeferredQueue::new();
//! let resumed = queue.enqueue(PendingOp::new(OpKind::Open, "a.txt"));
//! assert_eq!(queue.len(), 1);
//!
//! assert!(queue.drain_one());
//! resumed.await;
//! assert!(!queue.drain_one());
//! # }
//! ```

use futures::channel::oneshot;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

/// Which wrapped primitive a queue entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// `open`
    Open,
    /// whole-file read
    ReadFile,
    /// whole-file write
    WriteFile,
    /// whole-file append
    AppendFile,
    /// directory listing
    ReadDir,
    /// raw read interleaved after `EAGAIN`
    Read,
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Open => "open",
            Self::ReadFile => "read_file",
            Self::WriteFile => "write_file",
            Self::AppendFile => "append_file",
            Self::ReadDir => "read_dir",
            Self::Read => "read",
        })
    }
}

/// Description of a deferred operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOp {
    /// The primitive to replay
    pub kind: OpKind,
    /// The path it operates on; empty for descriptor reads
    pub target: PathBuf,
}

impl PendingOp {
    /// Describe a deferred `kind` on `target`
    pub fn new(kind: OpKind, target: impl AsRef<Path>) -> Self {
        Self {
            kind,
            target: target.as_ref().to_path_buf(),
        }
    }
}

struct QueuedOperation {
    op: PendingOp,
    resume: oneshot::Sender<()>,
}

/// FIFO of operations waiting for a descriptor
///
/// The mutex is held only to push or pop, never across an await, so
/// releases from blocking threads can drain it too.
#[derive(Default)]
pub struct DeferredQueue {
    entries: Mutex<VecDeque<QueuedOperation>>,
}

impl DeferredQueue {
    /// Empty queue
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, VecDeque<QueuedOperation>> {
        // A panic cannot leave a VecDeque half-pushed
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `op` to the tail
    ///
    /// The returned future completes once a drain reaches this entry.
    /// Dropping it abandons the entry; a later drain skips it.
    pub fn enqueue(&self, op: PendingOp) -> Resume {
        let (resume, waiter) = oneshot::channel();
        self.entries().push_back(QueuedOperation { op, resume });
        Resume { waiter }
    }

    /// Resume the oldest live entry
    ///
    /// Returns `false` if there was nothing to resume. Abandoned entries
    /// met on the way are discarded and do not count.
    pub fn drain_one(&self) -> bool {
        loop {
            let Some(entry) = self.entries().pop_front() else {
                return false;
            };
            if entry.resume.send(()).is_ok() {
                tracing::debug!("resumed deferred {} {}", entry.op.kind, entry.op.target.display());
                return true;
            }
            tracing::trace!("skipped abandoned {} {}", entry.op.kind, entry.op.target.display());
        }
    }

    /// Number of entries, abandoned ones included
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Whether nothing is waiting
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Descriptions of the waiting entries, head first
    #[must_use]
    pub fn pending(&self) -> Vec<PendingOp> {
        self.entries().iter().map(|entry| entry.op.clone()).collect()
    }
}

impl fmt::Debug for DeferredQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredQueue")
            .field("len", &self.len())
            .finish()
    }
}

/// Completes when the matching queue entry is drained
#[derive(Debug)]
#[must_use = "a queue entry is abandoned when its Resume is dropped"]
pub struct Resume {
    waiter: oneshot::Receiver<()>,
}

impl Future for Resume {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        // Sender dropped: the queue is gone and nothing will drain this entry
        Pin::new(&mut self.waiter).poll(cx).map(|_| ())
    }
}
