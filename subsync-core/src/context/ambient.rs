//! Ambient Render Context
//!
//! Code running inside a render pass can reach the active [`RenderContext`]
//! without it being passed down explicitly. The slot is thread-local: render
//! and reconcile phases run on one logical thread, and a render pass on one
//! thread must never leak into another.
//!
//! # Implementation
//!
//! Entering a render pass fills the slot and returns an [`AmbientGuard`].
//! Dropping the guard empties the slot again, so the slot is cleared on
//! every exit path, including a panic unwinding out of the render closure.
//!
//! Nesting is rejected: at most one context is ambient per thread.

use std::cell::RefCell;

use super::RenderContext;
use crate::error::{Result, SubscriptionError};

thread_local! {
    static CURRENT: RefCell<Option<RenderContext>> = const { RefCell::new(None) };
}

/// Guard that clears the ambient slot when dropped.
#[must_use = "the context stops being ambient as soon as the guard is dropped"]
pub struct AmbientGuard {
    context: RenderContext,
}

impl AmbientGuard {
    /// Make `context` the ambient context for this thread.
    pub(crate) fn enter(context: &RenderContext) -> Result<Self> {
        CURRENT.with(|slot| {
            let mut slot = slot.borrow_mut();
            if let Some(current) = slot.as_ref() {
                return Err(SubscriptionError::NestedRender {
                    current: current.id().clone(),
                    entering: context.id().clone(),
                });
            }
            *slot = Some(context.clone());
            Ok(())
        })?;

        Ok(Self {
            context: context.clone(),
        })
    }

    pub fn context(&self) -> &RenderContext {
        &self.context
    }
}

impl Drop for AmbientGuard {
    fn drop(&mut self) {
        CURRENT.with(|slot| {
            let taken = slot.borrow_mut().take();

            if let Some(taken) = taken {
                debug_assert_eq!(
                    taken.id(),
                    self.context.id(),
                    "AmbientGuard mismatch: expected {}, got {}",
                    self.context.id(),
                    taken.id()
                );
            }
        });
    }
}

/// The ambient context of this thread, if a render pass is running.
pub(crate) fn current() -> Option<RenderContext> {
    CURRENT.with(|slot| slot.borrow().clone())
}

pub(crate) fn is_active() -> bool {
    CURRENT.with(|slot| slot.borrow().is_some())
}
