//! Render Tracking
//!
//! This module tracks which consuming component is rendering, so that reads
//! made through a [`SubscriptionManager`](crate::SubscriptionManager) can be
//! attributed to it without threading a parameter through every call.
//!
//! # Concepts
//!
//! ## Render contexts
//!
//! A [`RenderContext`] represents one component instance. It carries an id, a
//! list of pending reset callbacks, and a way to force its owner to re-render.
//!
//! ## Ambient access
//!
//! While a render pass runs, its context sits in a thread-local slot. Managers
//! consult the slot on every `get`. The slot holds at most one context and is
//! always cleared when the pass ends.
//!
//! ## Consumers
//!
//! [`Consumer`] ties a context to a host component's mount/render/unmount
//! lifecycle.

mod ambient;
mod consumer;
mod id;
mod render;

pub use ambient::AmbientGuard;
pub use consumer::Consumer;
pub use id::{ContextId, IdGenerator, SequentialIds};
pub use render::{RenderContext, ResetCallback};
