//! Subscription Manager
//!
//! A [`SubscriptionManager`] sits in front of one data source. Components read
//! through it with [`get`](SubscriptionManager::get) while rendering; the
//! manager remembers which render context read which query and, once the
//! render phase is over, reconciles that against what it is subscribed to.
//!
//! # How It Works
//!
//! 1. `get` delegates to the configured getter and returns its value.
//!
//! 2. If a render context is available, the query is recorded against it. The
//!    first query a context reads in a cycle also registers a reset callback,
//!    so the next render (or teardown) of that context clears its entries.
//!
//! 3. Every recorded read and every reset schedules a reconciliation. At most
//!    one is outstanding per manager; the rest coalesce into it.
//!
//! 4. The reconciliation recomputes the union of watched keys from scratch,
//!    then issues one batched `unsubscribe` for keys nobody watches any more,
//!    followed by one batched `subscribe` for newly watched keys.
//!
//! Managers are cheap handles; clones share state.

mod config;
mod scheduler;
mod state;

pub use config::{BatchFn, GetFn, ManagerConfig};
pub use scheduler::{Deferral, FrameQueue, Task, TokioDeferral, UpdateState};

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, error, trace, warn};

use crate::config::require_context_for_get;
use crate::context::{ContextId, RenderContext};
use crate::error::{Result, SubscriptionError};
use state::{QueryMap, WatchState};

/// Keys touched by one reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub unsubscribed: Vec<String>,
    pub subscribed: Vec<String>,
}

impl ReconcileReport {
    pub fn is_empty(&self) -> bool {
        self.unsubscribed.is_empty() && self.subscribed.is_empty()
    }
}

struct Shared<T, Q> {
    config: ManagerConfig<T, Q>,
    state: Mutex<WatchState<Q>>,
}

/// Batches query subscriptions for one data source.
///
/// # Type Parameters
///
/// - `T`: the value returned by the getter.
/// - `Q`: the query type. Cloned into bookkeeping and handed back to the
///   subscribe/unsubscribe callbacks.
pub struct SubscriptionManager<T, Q> {
    shared: Arc<Shared<T, Q>>,
}

impl<T, Q> Clone for SubscriptionManager<T, Q> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T, Q> SubscriptionManager<T, Q>
where
    T: 'static,
    Q: Clone + Send + Sync + 'static,
{
    pub fn new(config: ManagerConfig<T, Q>) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(WatchState::new()),
            }),
        }
    }

    fn from_weak(weak: &Weak<Shared<T, Q>>) -> Option<Self> {
        weak.upgrade().map(|shared| Self { shared })
    }

    /// Read `query` on behalf of the ambient render context.
    ///
    /// Fails with `MissingContext` when no render pass is running and
    /// [`require_context_for_get`] is on. A failing getter is reported as
    /// `Get` and leaves no trace in the manager.
    pub fn get(&self, query: &Q) -> Result<T> {
        let context = RenderContext::current();
        self.get_inner(query, context.as_ref())
    }

    /// Read `query` on behalf of an explicit context.
    pub fn get_with(&self, query: &Q, context: &RenderContext) -> Result<T> {
        self.get_inner(query, Some(context))
    }

    fn get_inner(&self, query: &Q, context: Option<&RenderContext>) -> Result<T> {
        if context.is_none() && require_context_for_get() {
            return Err(SubscriptionError::MissingContext);
        }

        let value = (self.shared.config.get)(query).map_err(SubscriptionError::Get)?;

        if let Some(context) = context {
            if self.register_query(context, query)? {
                self.schedule_update();
            }
        }

        Ok(value)
    }

    /// Derive the key for `query` with this manager's key function.
    pub fn query_to_string(&self, query: &Q) -> Result<String> {
        Ok((self.shared.config.query_to_string)(query)?)
    }

    /// Returns false when the context is retired and nothing was recorded.
    fn register_query(&self, context: &RenderContext, query: &Q) -> Result<bool> {
        if context.is_retired() {
            warn!(context = %context.id(), "get() on retired render context not tracked");
            return Ok(false);
        }

        let key = self.query_to_string(query)?;
        trace!(context = %context.id(), key = %key, "watching query");

        let first = self.shared.state.lock().watch(context, key, query.clone());
        if first {
            let weak = Arc::downgrade(&self.shared);
            context.register_reset(move |context| {
                if let Some(manager) = Self::from_weak(&weak) {
                    manager.handle_reset(context);
                }
            });
        }

        // Retired since the check above: its final reset may already have run
        // and will never see this entry.
        if context.is_retired() {
            self.shared.state.lock().forget(context.id());
        }

        Ok(true)
    }

    fn handle_reset(&self, context: &RenderContext) {
        let dropped = self.shared.state.lock().forget(context.id());
        trace!(context = %context.id(), queries = dropped, "forgetting watched queries");
        self.schedule_update();
    }

    fn schedule_update(&self) {
        {
            let mut state = self.shared.state.lock();
            if state.update == UpdateState::Scheduled {
                trace!("subscription update already scheduled");
                return;
            }
            state.update = UpdateState::Scheduled;
        }

        trace!("scheduling subscription update");
        let weak = Arc::downgrade(&self.shared);
        self.shared.config.deferral.defer(Box::new(move || {
            if let Some(manager) = Self::from_weak(&weak) {
                if let Err(err) = manager.run_scheduled_update() {
                    error!(error = %err, "deferred subscription update failed");
                }
            }
        }));
    }

    fn run_scheduled_update(&self) -> Result<ReconcileReport> {
        // Clear first so a failing callback cannot wedge scheduling.
        self.shared.state.lock().update = UpdateState::Idle;
        self.update_subscriptions()
    }

    /// Reconcile watched queries against active subscriptions now.
    ///
    /// Unsubscribes are committed and sent before subscribes. A failing
    /// callback aborts the rest of the run without rolling back what was
    /// already committed.
    ///
    /// Only one run is in flight at a time. Called from inside a
    /// `subscribe`/`unsubscribe` callback this does nothing and returns an
    /// empty report; reads made there schedule their own run.
    pub fn update_subscriptions(&self) -> Result<ReconcileReport> {
        let plan = {
            let mut state = self.shared.state.lock();
            if state.reconciling {
                trace!("subscription update already running");
                return Ok(ReconcileReport::default());
            }
            state.reconciling = true;
            let plan = state.plan();
            state.commit_unsubscribes(&plan);
            plan
        };
        let _running = ReconcilingGuard {
            state: &self.shared.state,
        };

        let report = ReconcileReport {
            unsubscribed: plan.to_unsubscribe.keys().cloned().collect(),
            subscribed: plan.to_subscribe.keys().cloned().collect(),
        };

        if !plan.to_unsubscribe.is_empty() {
            let queries = queries_of(&plan.to_unsubscribe);
            (self.shared.config.unsubscribe)(&queries).map_err(SubscriptionError::Unsubscribe)?;
        }

        self.shared.state.lock().commit_subscribes(&plan);
        if !plan.to_subscribe.is_empty() {
            let queries = queries_of(&plan.to_subscribe);
            (self.shared.config.subscribe)(&queries).map_err(SubscriptionError::Subscribe)?;
        }

        debug!(
            unsubscribed = report.unsubscribed.len(),
            subscribed = report.subscribed.len(),
            "subscriptions reconciled"
        );
        Ok(report)
    }

    /// Force every context watching at least one query to re-render.
    ///
    /// Returns the number of contexts updated.
    pub fn update_all(&self) -> Result<usize> {
        self.force_matching(|_, _| true)
    }

    /// Force contexts watching any of `queries` (compared by key) to re-render.
    pub fn update_queries(&self, queries: &[Q]) -> Result<usize> {
        let keys = queries
            .iter()
            .map(|query| self.query_to_string(query))
            .collect::<Result<HashSet<_>>>()?;
        self.force_matching(|key, _| keys.contains(key))
    }

    /// Force contexts watching a query accepted by `predicate` to re-render.
    pub fn update_matching<P>(&self, predicate: P) -> Result<usize>
    where
        P: Fn(&Q) -> bool,
    {
        self.force_matching(|_, query| predicate(query))
    }

    fn force_matching<M>(&self, matches: M) -> Result<usize>
    where
        M: Fn(&str, &Q) -> bool,
    {
        // Copy out first: predicates and force updates may call back into us.
        let snapshot = self.shared.state.lock().snapshot();

        let mut targets = Vec::new();
        for entry in snapshot {
            if !entry.queries.iter().any(|(key, query)| matches(key.as_str(), query)) {
                continue;
            }
            match entry.context {
                Some(context) => targets.push(context),
                None => return Err(SubscriptionError::ContextNotFound(entry.id)),
            }
        }

        for context in &targets {
            context.force_update();
        }
        Ok(targets.len())
    }

    /// Keys this manager currently holds subscriptions for.
    pub fn subscribed_keys(&self) -> Vec<String> {
        self.shared.state.lock().subscribed_keys()
    }

    /// Keys `id` has read since its last reset.
    pub fn watched_keys(&self, id: &ContextId) -> Vec<String> {
        self.shared.state.lock().watched_keys(id)
    }

    /// Number of contexts with at least one watched query.
    pub fn context_count(&self) -> usize {
        self.shared.state.lock().context_count()
    }

    pub fn is_update_pending(&self) -> bool {
        self.shared.state.lock().update == UpdateState::Scheduled
    }
}

/// Clears the in-flight flag however a reconciliation exits.
struct ReconcilingGuard<'a, Q> {
    state: &'a Mutex<WatchState<Q>>,
}

impl<Q> Drop for ReconcilingGuard<'_, Q> {
    fn drop(&mut self) {
        self.state.lock().reconciling = false;
    }
}

fn queries_of<Q: Clone>(map: &QueryMap<Q>) -> Vec<Q> {
    map.values().cloned().collect()
}

impl<T, Q: Clone> fmt::Debug for SubscriptionManager<T, Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("SubscriptionManager")
            .field("contexts", &state.context_count())
            .field("subscribed", &state.subscribed_keys().len())
            .field("update", &state.update)
            .finish()
    }
}
