//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects signals, computed
//! values and effects. It owns the dependency graph and implements both
//! halves of the update algorithm.
//!
//! # How It Works
//!
//! 1. When a node is created, it is inserted into the graph.
//!
//! 2. When a node is read while another node is being evaluated, the runtime
//!    records an edge between them (see [`ReactiveContext`]).
//!
//! 3. When a signal's value changes, the runtime:
//!    a. Bumps the signal's version
//!    b. Marks every transitive consumer dirty (push phase)
//!    c. Tells newly dirtied effects, through their dirty hook
//!
//! 4. When a dirty node is read, the runtime polls its producers in recorded
//!    order, bringing each up to date first, and recomputes the node only if
//!    one of them reports a new version (pull phase).
//!
//! # Thread Safety
//!
//! There is one runtime per thread, in thread-local storage. Handles are
//! built on `Rc` and are neither `Send` nor `Sync`, so a graph and every
//! node in it stay on the thread that created them.
//!
//! The graph is kept in a `RefCell`, and no borrow of it is ever held while
//! user code (computations, equality predicates, dirty hooks) runs.

use std::cell::RefCell;
use std::rc::Weak;

use crate::config::{CyclePolicy, RuntimeConfig};
use crate::error::{ReactiveError, Result};
use crate::graph::{Graph, GraphSnapshot, NodeId, NodeKind, Recompute};

use super::context::ReactiveContext;

thread_local! {
    static RUNTIME: Runtime = Runtime::new();
}

/// The per-thread reactive runtime.
///
/// Every method is an associated function operating on the current thread's
/// instance.
pub struct Runtime {
    graph: RefCell<Graph>,
    config: RefCell<RuntimeConfig>,
}

/// Clears a node's `computing` flag when dropped.
struct ComputingGuard {
    node: NodeId,
}

impl ComputingGuard {
    fn set(node: NodeId) -> Self {
        Runtime::with_graph_mut(|graph| graph.set_computing(node, true));
        Self { node }
    }
}

impl Drop for ComputingGuard {
    fn drop(&mut self) {
        let _ = RUNTIME.try_with(|rt| {
            if let Ok(mut graph) = rt.graph.try_borrow_mut() {
                graph.set_computing(self.node, false);
            }
        });
    }
}

impl Runtime {
    fn new() -> Self {
        Self {
            graph: RefCell::new(Graph::new()),
            config: RefCell::new(RuntimeConfig::default()),
        }
    }

    /// Replace the current thread's configuration.
    pub fn configure(config: RuntimeConfig) {
        tracing::debug!(?config, "runtime configured");
        RUNTIME.with(|rt| *rt.config.borrow_mut() = config);
    }

    /// The current thread's configuration.
    pub fn config() -> RuntimeConfig {
        RUNTIME.with(|rt| rt.config.borrow().clone())
    }

    /// Number of live nodes on this thread.
    pub fn node_count() -> usize {
        Self::with_graph(Graph::len)
    }

    /// Serializable view of this thread's graph.
    pub fn snapshot() -> GraphSnapshot {
        Self::with_graph(Graph::snapshot)
    }

    /// Get the consumer currently being evaluated, if any.
    pub fn current_consumer() -> Option<NodeId> {
        ReactiveContext::current_consumer()
    }

    /// Check if reads are currently being tracked.
    pub fn is_tracking() -> bool {
        ReactiveContext::is_active()
    }

    pub(crate) fn with_graph<R>(f: impl FnOnce(&Graph) -> R) -> R {
        RUNTIME.with(|rt| f(&rt.graph.borrow()))
    }

    pub(crate) fn with_graph_mut<R>(f: impl FnOnce(&mut Graph) -> R) -> R {
        RUNTIME.with(|rt| f(&mut rt.graph.borrow_mut()))
    }

    /// Insert a node into the current thread's graph.
    pub(crate) fn insert(kind: NodeKind, recompute: Option<Weak<dyn Recompute>>) -> NodeId {
        Self::with_graph_mut(|graph| graph.insert(kind, recompute))
    }

    /// Remove a node whose last handle was dropped.
    ///
    /// Silently does nothing once the thread's runtime has been torn down.
    pub(crate) fn remove(id: NodeId) {
        let effects = RUNTIME
            .try_with(|rt| match rt.graph.try_borrow_mut() {
                Ok(mut graph) => graph.remove(id),
                Err(_) => {
                    tracing::warn!(?id, "graph busy while dropping node, edges left in place");
                    Vec::new()
                }
            })
            .unwrap_or_default();
        Self::notify_dirty(effects);
    }

    /// Record a read of `producer` by the active consumer, if there is one.
    pub(crate) fn track_read(producer: NodeId) {
        if let Some(consumer) = ReactiveContext::current_consumer() {
            Self::with_graph_mut(|graph| graph.track(consumer, producer));
        }
    }

    /// Record that `id` now holds a different value.
    ///
    /// Bumps its version and marks its consumers dirty, transitively.
    pub(crate) fn producer_changed(id: NodeId) {
        let effects = Self::with_graph_mut(|graph| {
            let version = graph.bump_version(id);
            tracing::trace!(?id, ?version, "value changed");
            graph.mark_consumers_dirty(id)
        });
        Self::notify_dirty(effects);
    }

    /// Run `f` as the evaluation of `id`.
    ///
    /// Reads inside `f` re-populate `id`'s producer list from the start.
    /// Producers that are not read again are pruned, but only if `f`
    /// succeeds.
    pub(crate) fn evaluate<R, E>(
        id: NodeId,
        f: impl FnOnce() -> std::result::Result<R, E>,
    ) -> std::result::Result<R, E> {
        Self::with_graph_mut(|graph| graph.begin_tracking(id));
        let result = {
            let _ctx = ReactiveContext::enter(id);
            f()
        };
        if result.is_ok() {
            Self::with_graph_mut(|graph| graph.prune_untracked(id));
        }
        result
    }

    /// Bring `id` up to date.
    ///
    /// Clean nodes return immediately. A dirty node that has a value polls
    /// its producers and keeps its value if none of them changed; otherwise
    /// it is recomputed. On failure the node stays dirty and keeps its old
    /// value, so the next read retries.
    pub(crate) fn refresh(id: NodeId) -> Result<()> {
        Self::update(id, false)
    }

    /// Recompute `id` unconditionally.
    pub(crate) fn force(id: NodeId) -> Result<()> {
        Self::update(id, true)
    }

    fn update(id: NodeId, force: bool) -> Result<()> {
        let (dirty, computing, recompute) = Self::with_graph(|graph| {
            graph
                .node(id)
                .map(|node| (node.is_dirty(), node.is_computing(), node.recompute_handle()))
        })
        .ok_or(ReactiveError::Disposed { node: id })?;

        if !dirty && !force {
            return Ok(());
        }
        if computing && Self::config().cycle_policy == CyclePolicy::Detect {
            tracing::debug!(?id, "dependency cycle");
            return Err(ReactiveError::Cycle { node: id });
        }
        let Some(recompute) = recompute else {
            Self::with_graph_mut(|graph| Self::mark_clean(graph, id));
            return Ok(());
        };

        let _computing = ComputingGuard::set(id);

        let stale = Self::with_graph(|graph| graph.node(id).is_some_and(|node| node.is_stale()));
        if !force && !stale && recompute.has_value() && !Self::producers_changed(id) {
            tracing::trace!(?id, "producers unchanged, keeping cached value");
            Self::with_graph_mut(|graph| Self::mark_clean(graph, id));
            return Ok(());
        }

        tracing::debug!(?id, force, "recomputing");
        Self::with_graph_mut(|graph| {
            if let Some(node) = graph.node_mut(id) {
                node.stale = true;
            }
        });
        let changed = recompute.recompute()?;

        let effects = Self::with_graph_mut(|graph| {
            Self::mark_clean(graph, id);
            if changed {
                graph.bump_version(id);
                graph.mark_consumers_dirty(id)
            } else {
                Vec::new()
            }
        });
        drop(recompute);
        Self::notify_dirty(effects);
        Ok(())
    }

    /// Poll the producers of `id` in recorded order.
    ///
    /// Each producer is brought up to date before its version is compared,
    /// so a change deep in the graph surfaces here only if every node on the
    /// way actually produced a different value.
    ///
    /// A producer that fails to refresh counts as changed: the consumer's own
    /// computation decides what the failure means to it.
    fn producers_changed(id: NodeId) -> bool {
        let mut slot = 0;
        loop {
            let edge = Self::with_graph(|graph| {
                graph
                    .node(id)
                    .and_then(|node| node.producers().get(slot).copied())
            });
            let Some(edge) = edge else {
                return false;
            };

            if Self::version_of(edge.node) != Some(edge.seen_version) {
                return true;
            }
            if let Err(err) = Self::refresh(edge.node) {
                tracing::trace!(?id, producer = ?edge.node, %err, "producer failed to refresh");
                return true;
            }
            if Self::version_of(edge.node) != Some(edge.seen_version) {
                return true;
            }
            slot += 1;
        }
    }

    fn mark_clean(graph: &mut Graph, id: NodeId) {
        if let Some(node) = graph.node_mut(id) {
            node.dirty = false;
            node.stale = false;
        }
    }

    fn notify_dirty(effects: Vec<NodeId>) {
        for id in effects {
            let handle =
                Self::with_graph(|graph| graph.node(id).and_then(|node| node.recompute_handle()));
            if let Some(handle) = handle {
                handle.on_dirty();
            }
        }
    }

    pub(crate) fn version_of(id: NodeId) -> Option<u64> {
        Self::with_graph(|graph| graph.node(id).map(|node| node.version()))
    }

    pub(crate) fn is_dirty(id: NodeId) -> bool {
        Self::with_graph(|graph| graph.node(id).is_some_and(|node| node.is_dirty()))
    }

    pub(crate) fn producer_count(id: NodeId) -> usize {
        Self::with_graph(|graph| graph.node(id).map_or(0, |node| node.producers().len()))
    }

    pub(crate) fn consumer_count(id: NodeId) -> usize {
        Self::with_graph(|graph| graph.node(id).map_or(0, |node| node.consumers().len()))
    }
}

/// Register a handle's recompute procedure and return its node id.
///
/// Used with `Rc::new_cyclic` so the node can point back at the handle.
pub(crate) fn register<R: Recompute + 'static>(kind: NodeKind, weak: &Weak<R>) -> NodeId {
    let weak: Weak<dyn Recompute> = weak.clone();
    Runtime::insert(kind, Some(weak))
}
