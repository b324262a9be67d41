//! Subsync Core
//!
//! This crate batches data subscriptions for a component-tree renderer.
//! Components read values synchronously while they render; once rendering
//! settles, each data source works out which queries are still needed and
//! issues subscribe/unsubscribe calls in batches, so rapid re-renders do not
//! churn subscriptions.
//!
//! It implements:
//!
//! - Render tracking (which component instance is rendering right now)
//! - Per-source watch bookkeeping and deferred, coalesced reconciliation
//! - Query key derivation for deduplication
//!
//! # Architecture
//!
//! - `context`: render contexts, the ambient render slot, consumer lifecycle
//! - `manager`: the subscription manager, its configuration and scheduler
//! - `key`: query key derivation
//! - `config`: process-wide settings
//!
//! # Example
//!
//! ```rust
//! use subsync_core::{Consumer, FrameQueue, ManagerConfig};
//!
//! let frames = FrameQueue::new();
//! let todos = ManagerConfig::new(
//!     |id: &String| Ok(format!("todo {id}")),
//!     |ids: &[String]| { println!("subscribe {ids:?}"); Ok(()) },
//!     |ids: &[String]| { println!("unsubscribe {ids:?}"); Ok(()) },
//! )
//! .deferral(frames.clone())
//! .build();
//!
//! let list = Consumer::mount(|| println!("re-render requested"));
//! list.render(|_| {
//!     todos.get(&"1".to_string()).unwrap();
//!     todos.get(&"2".to_string()).unwrap();
//! })
//! .unwrap();
//!
//! // Next frame: one batched subscribe for ["1", "2"]
//! frames.flush();
//! assert_eq!(todos.subscribed_keys(), vec!["1", "2"]);
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod key;
pub mod manager;

// Re-exports
pub use config::{require_context_for_get, set_require_context_for_get};
pub use context::{AmbientGuard, Consumer, ContextId, IdGenerator, RenderContext, SequentialIds};
pub use error::{BoxError, Result, SubscriptionError};
pub use key::{json_key, KeyError, KeyFn, QueryKey};
pub use manager::{
    Deferral, FrameQueue, ManagerConfig, ReconcileReport, SubscriptionManager, Task,
    TokioDeferral, UpdateState,
};
