//! Push Phase
//!
//! A change to a node marks everything downstream of it dirty. Nothing is
//! recomputed here; recomputation waits for the next read of each dirty
//! node (the pull phase in [`crate::reactive`]).
//!
//! The walk stops at nodes that are already dirty. Everything below a dirty
//! node was marked when it became dirty, so redundant paths (diamonds) are
//! visited once and cycles terminate. Stale nodes (last evaluation did not
//! complete) are the exception: their consumers may have handled the failure
//! and gone clean, so the walk passes through them once.

use super::arena::Graph;
use super::node::{NodeId, NodeKind};

impl Graph {
    /// Record a value change of `id`.
    pub fn bump_version(&mut self, id: NodeId) -> Option<u64> {
        let node = self.nodes.get_mut(id)?;
        node.version += 1;
        Some(node.version)
    }

    /// Mark every consumer of `id` dirty, transitively.
    ///
    /// Returns the effects that went from clean to dirty.
    pub fn mark_consumers_dirty(&mut self, id: NodeId) -> Vec<NodeId> {
        let Some(node) = self.nodes.get(id) else {
            return Vec::new();
        };
        let seeds: Vec<NodeId> = node.consumers.iter().map(|edge| edge.node).collect();
        self.mark_dirty_from(seeds)
    }

    pub(super) fn mark_dirty_from(
        &mut self,
        seeds: impl IntoIterator<Item = NodeId>,
    ) -> Vec<NodeId> {
        let mut stack: Vec<NodeId> = seeds.into_iter().collect();
        let mut effects = Vec::new();
        let mut crossed: Vec<NodeId> = Vec::new();
        let mut marked = 0usize;

        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get_mut(id) else {
                continue;
            };
            if node.dirty {
                // A failed evaluation leaves its node dirty while consumers
                // that handled the failure went clean, so walk through it.
                if !node.stale || crossed.contains(&id) {
                    continue;
                }
                crossed.push(id);
            } else {
                node.dirty = true;
                marked += 1;
                if node.kind() == NodeKind::Effect {
                    effects.push(id);
                }
            }
            stack.extend(node.consumers.iter().map(|edge| edge.node));
        }

        if marked > 0 {
            tracing::trace!(marked, effects = effects.len(), "push phase");
        }
        effects
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(graph: &mut Graph, consumer: NodeId, producers: &[NodeId]) {
        graph.begin_tracking(consumer);
        for &producer in producers {
            graph.track(consumer, producer);
        }
        graph.prune_untracked(consumer);
        graph.nodes[consumer].dirty = false;
    }

    #[test]
    fn mark_propagates_through_chain() {
        let mut graph = Graph::new();
        let source = graph.insert(NodeKind::Signal, None);
        let derived1 = graph.insert(NodeKind::Computed, None);
        let derived2 = graph.insert(NodeKind::Computed, None);
        link(&mut graph, derived1, &[source]);
        link(&mut graph, derived2, &[derived1]);

        let effects = graph.mark_consumers_dirty(source);

        assert!(effects.is_empty());
        assert!(graph.nodes[derived1].dirty);
        assert!(graph.nodes[derived2].dirty);
        assert!(!graph.nodes[source].dirty);
    }

    #[test]
    fn diamond_marks_each_node_once_and_reports_effects() {
        let mut graph = Graph::new();
        let a = graph.insert(NodeKind::Signal, None);
        let b = graph.insert(NodeKind::Computed, None);
        let c = graph.insert(NodeKind::Computed, None);
        let d = graph.insert(NodeKind::Computed, None);
        let e = graph.insert(NodeKind::Effect, None);
        link(&mut graph, b, &[a]);
        link(&mut graph, c, &[a]);
        link(&mut graph, d, &[b, c]);
        link(&mut graph, e, &[d]);

        let effects = graph.mark_consumers_dirty(a);
        assert_eq!(effects, vec![e]);

        // Already dirty: a second write reports nothing new.
        let effects = graph.mark_consumers_dirty(a);
        assert!(effects.is_empty());
    }

    #[test]
    fn dirty_node_stops_the_walk() {
        let mut graph = Graph::new();
        let a = graph.insert(NodeKind::Signal, None);
        let b = graph.insert(NodeKind::Computed, None);
        let c = graph.insert(NodeKind::Computed, None);
        link(&mut graph, b, &[a]);
        link(&mut graph, c, &[b]);
        graph.nodes[b].dirty = true;

        graph.mark_consumers_dirty(a);
        assert!(!graph.nodes[c].dirty);
    }

    #[test]
    fn stale_node_does_not_stop_the_walk() {
        let mut graph = Graph::new();
        let a = graph.insert(NodeKind::Signal, None);
        let b = graph.insert(NodeKind::Computed, None);
        let c = graph.insert(NodeKind::Computed, None);
        let e = graph.insert(NodeKind::Effect, None);
        link(&mut graph, b, &[a]);
        link(&mut graph, c, &[b]);
        link(&mut graph, e, &[c]);
        graph.nodes[b].dirty = true;
        graph.nodes[b].stale = true;

        let effects = graph.mark_consumers_dirty(a);
        assert!(graph.nodes[c].dirty);
        assert_eq!(effects, vec![e]);
    }

    #[test]
    fn stale_cycle_terminates() {
        let mut graph = Graph::new();
        let a = graph.insert(NodeKind::Signal, None);
        let b = graph.insert(NodeKind::Computed, None);
        let c = graph.insert(NodeKind::Computed, None);
        link(&mut graph, b, &[a, c]);
        link(&mut graph, c, &[b]);
        for id in [b, c] {
            graph.nodes[id].dirty = true;
            graph.nodes[id].stale = true;
        }

        assert!(graph.mark_consumers_dirty(a).is_empty());
    }

    #[test]
    fn bump_version_increments() {
        let mut graph = Graph::new();
        let a = graph.insert(NodeKind::Signal, None);
        assert_eq!(graph.bump_version(a), Some(1));
        assert_eq!(graph.bump_version(a), Some(2));
        assert_eq!(graph.node(a).map(|n| n.version()), Some(2));
    }
}
