//! Update Scheduler
//!
//! Reconciliation never runs inside the `get` that asked for it. Instead each
//! manager hands a task to a [`Deferral`], which runs it once, later, after the
//! current synchronous phase has finished. This is what makes batching work:
//! every `get` and reset between two ticks collapses into one reconciliation.
//!
//! Each manager keeps an [`UpdateState`] so at most one task is outstanding
//! at a time.
//!
//! # Deferrals
//!
//! - [`FrameQueue`]: an explicit queue the host drains once per frame with
//!   [`FrameQueue::flush`]. The process-wide [`FrameQueue::global`] is the
//!   default for managers that do not configure anything else.
//! - [`TokioDeferral`]: spawns each task on a `current_thread` tokio runtime
//!   behind a `yield_now`, so it runs once the render thread, which is the
//!   runtime's only worker, returns to the executor. Multi-thread runtimes are
//!   refused: a worker there could reconcile in the middle of a render pass.
//! - Any `Fn(Task) + Send + Sync` closure.

use std::collections::VecDeque;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tokio::runtime::RuntimeFlavor;
use tracing::{trace, warn};

/// A deferred unit of work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Reconciliation state of a single manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateState {
    /// No reconciliation is outstanding.
    #[default]
    Idle,

    /// A reconciliation has been handed to the deferral and has not run yet.
    Scheduled,
}

/// Runs a task exactly once, asynchronously, after the current synchronous
/// phase completes.
pub trait Deferral: Send + Sync {
    fn defer(&self, task: Task);
}

impl<F> Deferral for F
where
    F: Fn(Task) + Send + Sync,
{
    fn defer(&self, task: Task) {
        self(task)
    }
}

/// A "next frame" task queue.
///
/// Tasks queued while a flush is running are left for the following flush.
#[derive(Clone, Default)]
pub struct FrameQueue {
    tasks: Arc<Mutex<VecDeque<Task>>>,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide queue used when a manager has no deferral configured.
    pub fn global() -> &'static FrameQueue {
        static GLOBAL: OnceLock<FrameQueue> = OnceLock::new();
        GLOBAL.get_or_init(FrameQueue::new)
    }

    /// Run every task queued before this call, in queue order.
    ///
    /// Returns the number of tasks run.
    pub fn flush(&self) -> usize {
        // Release the lock before running anything: tasks may queue more work.
        let batch = std::mem::take(&mut *self.tasks.lock());
        let count = batch.len();
        if count > 0 {
            trace!(tasks = count, "flushing frame queue");
        }
        for task in batch {
            task();
        }
        count
    }

    /// Number of tasks waiting for the next flush.
    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }
}

impl Deferral for FrameQueue {
    fn defer(&self, task: Task) {
        self.tasks.lock().push_back(task);
    }
}

impl std::fmt::Debug for FrameQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameQueue")
            .field("pending", &self.len())
            .finish()
    }
}

/// Defers tasks onto a `current_thread` tokio runtime.
///
/// The runtime must be driven by the thread that renders.
#[derive(Debug, Clone)]
pub struct TokioDeferral {
    handle: tokio::runtime::Handle,
}

impl TokioDeferral {
    /// Wrap `handle`. Returns `None` unless it belongs to a `current_thread`
    /// runtime.
    pub fn new(handle: tokio::runtime::Handle) -> Option<Self> {
        if handle.runtime_flavor() != RuntimeFlavor::CurrentThread {
            warn!(flavor = ?handle.runtime_flavor(), "TokioDeferral needs a current_thread runtime");
            return None;
        }
        Some(Self { handle })
    }

    /// Use the runtime this is called from.
    ///
    /// Returns `None` outside a tokio runtime or on a multi-thread runtime.
    pub fn current() -> Option<Self> {
        tokio::runtime::Handle::try_current()
            .ok()
            .and_then(Self::new)
    }
}

impl Deferral for TokioDeferral {
    fn defer(&self, task: Task) {
        self.handle.spawn(async move {
            tokio::task::yield_now().await;
            task();
        });
    }
}
