//! Consumer lifecycle adapter.
//!
//! Hosts that own component instances wire them up through a [`Consumer`]:
//! mount creates the render context, each render pass goes through
//! [`Consumer::render`], and unmounting (or dropping) retires the context so
//! every manager releases what it held for this component.

use super::RenderContext;
use crate::error::Result;

/// One mounted consuming component.
#[derive(Debug)]
pub struct Consumer {
    context: RenderContext,
}

impl Consumer {
    /// Mount a consumer whose re-render is requested via `force_update`.
    pub fn mount<F>(force_update: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::with_context(RenderContext::new(force_update))
    }

    /// Mount a consumer around an existing context.
    pub fn with_context(context: RenderContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    /// Run one render pass with this consumer's context ambient.
    pub fn render<R, F>(&self, render: F) -> Result<R>
    where
        F: FnOnce(&RenderContext) -> R,
    {
        self.context.render(render)
    }

    /// Tear the consumer down, firing the context's final reset.
    pub fn unmount(self) {
        self.context.retire();
    }
}

impl Drop for Consumer {
    fn drop(&mut self) {
        // No-op if `unmount` already retired the context.
        self.context.retire();
    }
}
