//! Watch bookkeeping and diffing for one manager.

use std::collections::HashMap;

use indexmap::IndexMap;

use super::scheduler::UpdateState;
use crate::context::{ContextId, RenderContext};

/// Queries keyed by their query key, in first-seen order.
pub(crate) type QueryMap<Q> = IndexMap<String, Q>;

/// The changes one reconciliation applies.
#[derive(Debug)]
pub(crate) struct ReconcilePlan<Q> {
    pub(crate) to_unsubscribe: QueryMap<Q>,
    pub(crate) to_subscribe: QueryMap<Q>,
}

/// A context's watched queries, copied out so callers can inspect them
/// without holding the manager lock.
pub(crate) struct WatchSnapshot<Q> {
    pub(crate) id: ContextId,
    pub(crate) context: Option<RenderContext>,
    pub(crate) queries: QueryMap<Q>,
}

pub(crate) struct WatchState<Q> {
    /// What each context read since its last reset.
    watched_by_context: IndexMap<ContextId, QueryMap<Q>>,
    /// Contexts with watched queries, for force-update dispatch.
    contexts_by_id: HashMap<ContextId, RenderContext>,
    /// What the external resource is assumed to be subscribed to.
    subscribed: QueryMap<Q>,
    pub(crate) update: UpdateState,
    /// A reconciliation is between planning and its last callback.
    pub(crate) reconciling: bool,
}

impl<Q: Clone> WatchState<Q> {
    pub(crate) fn new() -> Self {
        Self {
            watched_by_context: IndexMap::new(),
            contexts_by_id: HashMap::new(),
            subscribed: IndexMap::new(),
            update: UpdateState::Idle,
            reconciling: false,
        }
    }

    /// Record that `context` wants `query`.
    ///
    /// Returns true when this is the context's first watch since its last
    /// reset, i.e. when the caller must register a reset callback.
    pub(crate) fn watch(&mut self, context: &RenderContext, key: String, query: Q) -> bool {
        let id = context.id();
        let first = !self.watched_by_context.contains_key(id);

        self.watched_by_context
            .entry(id.clone())
            .or_default()
            .insert(key, query);
        self.contexts_by_id.insert(id.clone(), context.clone());

        first
    }

    /// Drop everything `id` watched. Returns how many queries it held.
    pub(crate) fn forget(&mut self, id: &ContextId) -> usize {
        self.contexts_by_id.remove(id);
        self.watched_by_context
            .shift_remove(id)
            .map(|queries| queries.len())
            .unwrap_or(0)
    }

    /// Union of all watched queries. A key read by several contexts keeps the
    /// query value written last.
    fn being_watched(&self) -> QueryMap<Q> {
        let mut union = IndexMap::new();
        for queries in self.watched_by_context.values() {
            for (key, query) in queries {
                union.insert(key.clone(), query.clone());
            }
        }
        union
    }

    pub(crate) fn plan(&self) -> ReconcilePlan<Q> {
        let watched = self.being_watched();

        let to_unsubscribe = self
            .subscribed
            .iter()
            .filter(|(key, _)| !watched.contains_key(*key))
            .map(|(key, query)| (key.clone(), query.clone()))
            .collect();

        let to_subscribe = watched
            .into_iter()
            .filter(|(key, _)| !self.subscribed.contains_key(key))
            .collect();

        ReconcilePlan {
            to_unsubscribe,
            to_subscribe,
        }
    }

    pub(crate) fn commit_unsubscribes(&mut self, plan: &ReconcilePlan<Q>) {
        for key in plan.to_unsubscribe.keys() {
            self.subscribed.shift_remove(key);
        }
    }

    pub(crate) fn commit_subscribes(&mut self, plan: &ReconcilePlan<Q>) {
        for (key, query) in &plan.to_subscribe {
            self.subscribed.insert(key.clone(), query.clone());
        }
    }

    pub(crate) fn snapshot(&self) -> Vec<WatchSnapshot<Q>> {
        self.watched_by_context
            .iter()
            .map(|(id, queries)| WatchSnapshot {
                id: id.clone(),
                context: self.contexts_by_id.get(id).cloned(),
                queries: queries.clone(),
            })
            .collect()
    }

    pub(crate) fn subscribed_keys(&self) -> Vec<String> {
        self.subscribed.keys().cloned().collect()
    }

    pub(crate) fn watched_keys(&self, id: &ContextId) -> Vec<String> {
        self.watched_by_context
            .get(id)
            .map(|queries| queries.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn context_count(&self) -> usize {
        self.watched_by_context.len()
    }

    #[cfg(test)]
    pub(crate) fn drop_dispatch_entry(&mut self, id: &ContextId) {
        self.contexts_by_id.remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys<Q>(map: &QueryMap<Q>) -> Vec<&str> {
        map.keys().map(String::as_str).collect()
    }

    #[test]
    fn first_watch_per_cycle_is_reported_once() {
        let mut state = WatchState::new();
        let ctx = RenderContext::detached();

        assert!(state.watch(&ctx, "a".into(), "a"));
        assert!(!state.watch(&ctx, "b".into(), "b"));
        assert!(!state.watch(&ctx, "a".into(), "a"));
        assert_eq!(state.watched_keys(ctx.id()), vec!["a", "b"]);

        assert_eq!(state.forget(ctx.id()), 2);
        assert!(state.watch(&ctx, "c".into(), "c"));
    }

    #[test]
    fn plan_diffs_against_subscribed() {
        let mut state = WatchState::new();
        let ctx = RenderContext::detached();
        state.watch(&ctx, "a".into(), "a");
        state.watch(&ctx, "b".into(), "b");

        let plan = state.plan();
        assert_eq!(keys(&plan.to_subscribe), vec!["a", "b"]);
        assert!(plan.to_unsubscribe.is_empty());
        state.commit_unsubscribes(&plan);
        state.commit_subscribes(&plan);

        state.forget(ctx.id());
        state.watch(&ctx, "a".into(), "a");
        state.watch(&ctx, "c".into(), "c");

        let plan = state.plan();
        assert_eq!(keys(&plan.to_subscribe), vec!["c"]);
        assert_eq!(keys(&plan.to_unsubscribe), vec!["b"]);
    }

    #[test]
    fn shared_keys_survive_one_context_leaving() {
        let mut state = WatchState::new();
        let c1 = RenderContext::detached();
        let c2 = RenderContext::detached();
        state.watch(&c1, "shared".into(), "shared");
        state.watch(&c1, "mine".into(), "mine");
        state.watch(&c2, "shared".into(), "shared");

        let plan = state.plan();
        state.commit_subscribes(&plan);

        state.forget(c1.id());
        let plan = state.plan();
        assert!(plan.to_subscribe.is_empty());
        assert_eq!(keys(&plan.to_unsubscribe), vec!["mine"]);
        assert_eq!(state.context_count(), 1);
    }

    #[test]
    fn last_written_query_wins_per_key() {
        let mut state = WatchState::new();
        let c1 = RenderContext::detached();
        let c2 = RenderContext::detached();
        state.watch(&c1, "k".into(), 1);
        state.watch(&c2, "k".into(), 2);

        let plan = state.plan();
        assert_eq!(plan.to_subscribe.get("k"), Some(&2));
    }
}
