//! Manager configuration.

use std::fmt;
use std::sync::Arc;

use super::scheduler::{Deferral, FrameQueue};
use super::SubscriptionManager;
use crate::error::BoxError;
use crate::key::{default_key_fn, KeyError, KeyFn, QueryKey};

/// Synchronous lookup for one query.
pub type GetFn<T, Q> = Arc<dyn Fn(&Q) -> Result<T, BoxError> + Send + Sync>;

/// Batched subscribe or unsubscribe. Always called with at least one query.
pub type BatchFn<Q> = Arc<dyn Fn(&[Q]) -> Result<(), BoxError> + Send + Sync>;

/// Constructor-time options for a [`SubscriptionManager`].
///
/// # Example
///
/// ```rust
/// use subsync_core::{FrameQueue, ManagerConfig};
///
/// let frames = FrameQueue::new();
/// let users = ManagerConfig::new(
///     |id: &String| Ok(format!("user {id}")),
///     |ids: &[String]| { println!("subscribe {ids:?}"); Ok(()) },
///     |ids: &[String]| { println!("unsubscribe {ids:?}"); Ok(()) },
/// )
/// .deferral(frames.clone())
/// .build();
/// # let _ = users;
/// ```
pub struct ManagerConfig<T, Q> {
    pub(crate) get: GetFn<T, Q>,
    pub(crate) subscribe: BatchFn<Q>,
    pub(crate) unsubscribe: BatchFn<Q>,
    pub(crate) query_to_string: KeyFn<Q>,
    pub(crate) deferral: Arc<dyn Deferral>,
}

impl<T, Q> ManagerConfig<T, Q>
where
    T: 'static,
    Q: Clone + Send + Sync + 'static,
{
    /// Configure a manager for a query type with built-in key derivation.
    ///
    /// Unless [`deferral`](Self::deferral) is set, reconciliations queue on
    /// [`FrameQueue::global`] and nothing is subscribed until the host calls
    /// `FrameQueue::global().flush()`, once per frame.
    pub fn new<G, S, U>(get: G, subscribe: S, unsubscribe: U) -> Self
    where
        Q: QueryKey,
        G: Fn(&Q) -> Result<T, BoxError> + Send + Sync + 'static,
        S: Fn(&[Q]) -> Result<(), BoxError> + Send + Sync + 'static,
        U: Fn(&[Q]) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Self::with_key_fn(get, subscribe, unsubscribe, default_key_fn::<Q>())
    }

    /// Configure a manager for any query type, supplying the key function.
    ///
    /// Defaults to [`FrameQueue::global`] like [`new`](Self::new).
    pub fn with_key_fn<G, S, U>(get: G, subscribe: S, unsubscribe: U, query_to_string: KeyFn<Q>) -> Self
    where
        G: Fn(&Q) -> Result<T, BoxError> + Send + Sync + 'static,
        S: Fn(&[Q]) -> Result<(), BoxError> + Send + Sync + 'static,
        U: Fn(&[Q]) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Self {
            get: Arc::new(get),
            subscribe: Arc::new(subscribe),
            unsubscribe: Arc::new(unsubscribe),
            query_to_string,
            deferral: Arc::new(FrameQueue::global().clone()),
        }
    }

    /// Override key derivation.
    pub fn query_to_string<F>(mut self, query_to_string: F) -> Self
    where
        F: Fn(&Q) -> Result<String, KeyError> + Send + Sync + 'static,
    {
        self.query_to_string = Arc::new(query_to_string);
        self
    }

    /// Override where reconciliations are deferred to.
    pub fn deferral<D>(mut self, deferral: D) -> Self
    where
        D: Deferral + 'static,
    {
        self.deferral = Arc::new(deferral);
        self
    }

    pub fn build(self) -> SubscriptionManager<T, Q> {
        SubscriptionManager::new(self)
    }
}

impl<T, Q> fmt::Debug for ManagerConfig<T, Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagerConfig").finish_non_exhaustive()
    }
}
