//! Render Context
//!
//! A [`RenderContext`] stands for one consuming component instance across all
//! of its render passes. Managers touched during a pass register a reset
//! callback on it; the next pass (or the component's teardown) fires those
//! callbacks so each manager forgets what the context previously wanted.
//!
//! # Lifecycle
//!
//! ```text
//! constructed ──> active (ambient during render) <──> idle ──> retired
//! ```
//!
//! `reset()` runs at the start of every active cycle and once more at
//! retirement. After retirement `force_update()` is a no-op.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use smallvec::SmallVec;
use tracing::{debug, warn};

use super::ambient::{self, AmbientGuard};
use super::ContextId;
use crate::error::Result;

/// Callback fired once when a context resets.
pub type ResetCallback = Box<dyn FnOnce(&RenderContext) + Send + 'static>;

struct Inner {
    id: ContextId,
    /// Pending reset callbacks, fired in registration order.
    resets: Mutex<SmallVec<[ResetCallback; 2]>>,
    force_update: Box<dyn Fn() + Send + Sync>,
    retired: AtomicBool,
}

/// A tracked rendering unit. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct RenderContext {
    inner: Arc<Inner>,
}

impl RenderContext {
    /// Create a context with a process-unique id.
    ///
    /// `force_update` asks the owning consumer to re-render outside its
    /// normal lifecycle.
    pub fn new<F>(force_update: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::with_id(ContextId::next(), force_update)
    }

    /// Create a context with an explicitly assigned id.
    pub fn with_id<F>(id: ContextId, force_update: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                id,
                resets: Mutex::new(SmallVec::new()),
                force_update: Box::new(force_update),
                retired: AtomicBool::new(false),
            }),
        }
    }

    /// A context whose `force_update` does nothing.
    pub fn detached() -> Self {
        Self::new(|| {})
    }

    pub fn id(&self) -> &ContextId {
        &self.inner.id
    }

    /// Queue `callback` to run on the next [`reset`](Self::reset).
    ///
    /// Registering the same logical callback twice makes it fire twice.
    pub fn register_reset<F>(&self, callback: F)
    where
        F: FnOnce(&RenderContext) + Send + 'static,
    {
        self.inner.resets.lock().push(Box::new(callback));
    }

    /// Fire and clear every pending reset callback.
    pub fn reset(&self) {
        // Swap the list out under the lock so a callback can never fire twice,
        // and registrations made by a callback land in the next cycle.
        let pending = std::mem::take(&mut *self.inner.resets.lock());
        if pending.is_empty() {
            return;
        }

        debug!(context = %self.inner.id, callbacks = pending.len(), "resetting render context");
        for callback in pending {
            callback(self);
        }
    }

    /// Ask the owning consumer to re-render.
    pub fn force_update(&self) {
        if self.is_retired() {
            warn!(context = %self.inner.id, "force_update on retired render context ignored");
            return;
        }
        (self.inner.force_update)();
    }

    /// Permanently retire the context, firing its final reset.
    ///
    /// Calling this more than once has no further effect.
    pub fn retire(&self) {
        if self.inner.retired.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!(context = %self.inner.id, "retiring render context");
        self.reset();
    }

    pub fn is_retired(&self) -> bool {
        self.inner.retired.load(Ordering::SeqCst)
    }

    /// Number of reset callbacks waiting for the next reset.
    pub fn pending_resets(&self) -> usize {
        self.inner.resets.lock().len()
    }

    /// Run one render pass.
    ///
    /// The context becomes ambient, discharges the previous cycle's resets and
    /// then runs `render`. The ambient slot is cleared when this returns or
    /// unwinds. Fails with `NestedRender` if another context is ambient.
    pub fn render<R, F>(&self, render: F) -> Result<R>
    where
        F: FnOnce(&RenderContext) -> R,
    {
        let guard = AmbientGuard::enter(self)?;
        self.reset();
        Ok(render(guard.context()))
    }

    /// Enter the ambient slot without resetting.
    ///
    /// For hosts that drive `reset()` themselves.
    pub fn enter(&self) -> Result<AmbientGuard> {
        AmbientGuard::enter(self)
    }

    /// The context of the render pass running on this thread, if any.
    pub fn current() -> Option<RenderContext> {
        ambient::current()
    }

    /// Check if a render pass is running on this thread.
    pub fn is_active() -> bool {
        ambient::is_active()
    }
}

impl fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderContext")
            .field("id", &self.inner.id)
            .field("pending_resets", &self.pending_resets())
            .field("retired", &self.is_retired())
            .finish()
    }
}
