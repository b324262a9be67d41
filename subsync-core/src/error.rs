//! Error types for subscription tracking.

use thiserror::Error;

use crate::context::ContextId;
use crate::key::KeyError;

/// Boxed error returned by injected callbacks (`get`, `subscribe`, `unsubscribe`).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for subscription operations.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    /// `get` was called outside a render pass while contexts are required.
    #[error("get() called without an active render context")]
    MissingContext,

    /// A render pass was entered while another context was already ambient.
    #[error("cannot render {entering} while {current} is the active render context")]
    NestedRender {
        current: ContextId,
        entering: ContextId,
    },

    #[error("query key error: {0}")]
    Key(#[from] KeyError),

    /// The configured getter failed. The original error is kept as the source.
    #[error("query getter failed: {0}")]
    Get(#[source] BoxError),

    #[error("subscribe callback failed: {0}")]
    Subscribe(#[source] BoxError),

    #[error("unsubscribe callback failed: {0}")]
    Unsubscribe(#[source] BoxError),

    /// Bookkeeping lost track of a context that still has watched queries.
    #[error("render context not registered: {0}")]
    ContextNotFound(ContextId),
}

impl SubscriptionError {
    /// Borrow the getter's original error, if this is a `Get` failure.
    pub fn getter_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            SubscriptionError::Get(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

/// Result type for subscription operations.
pub type Result<T> = std::result::Result<T, SubscriptionError>;
