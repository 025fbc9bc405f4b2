//! Node arena and edge maintenance.

use std::rc::Weak;

use serde::Serialize;
use slotmap::SlotMap;
use smallvec::SmallVec;

use super::node::{ConsumerEdge, NodeId, NodeKind, ProducerEdge, ReactiveNode, Recompute};

/// The arena of reactive nodes.
#[derive(Debug, Default)]
pub struct Graph {
    pub(super) nodes: SlotMap<NodeId, ReactiveNode>,
}

impl Graph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
        }
    }

    /// Add a node.
    pub fn insert(&mut self, kind: NodeKind, recompute: Option<Weak<dyn Recompute>>) -> NodeId {
        let id = self.nodes.insert(ReactiveNode::new(kind, recompute));
        tracing::trace!(?id, ?kind, "node inserted");
        id
    }

    /// Remove a node and every edge touching it.
    ///
    /// Former consumers are marked dirty, since one of their inputs is gone.
    /// Returns the effects newly marked dirty by that.
    pub fn remove(&mut self, id: NodeId) -> Vec<NodeId> {
        let Some(node) = self.nodes.remove(id) else {
            return Vec::new();
        };

        for edge in &node.producers {
            self.remove_consumer_edge(edge.node, edge.consumer_slot);
        }

        let mut former = SmallVec::<[NodeId; 4]>::new();
        for edge in &node.consumers {
            self.remove_producer_entry(edge.node, edge.producer_slot);
            former.push(edge.node);
        }

        tracing::trace!(
            ?id,
            producers = node.producers.len(),
            consumers = former.len(),
            "node removed"
        );
        self.mark_dirty_from(former)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node(&self, id: NodeId) -> Option<&ReactiveNode> {
        self.nodes.get(id)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut ReactiveNode> {
        self.nodes.get_mut(id)
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Start a new evaluation of `id`: rewind its producer cursor.
    pub fn begin_tracking(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.next_producer = 0;
        }
    }

    /// Flag `id` as being brought up to date (or not).
    pub fn set_computing(&mut self, id: NodeId, computing: bool) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.computing = computing;
        }
    }

    /// Record that `consumer` read `producer` in its current evaluation.
    ///
    /// The entry at the consumer's cursor is reconciled with `producer`:
    /// reused when it already matches, swapped into place when the producer
    /// sits later in the list, or replaced when it names a producer not yet
    /// seen this round. Reading a producer twice in one evaluation records it
    /// once.
    pub fn track(&mut self, consumer: NodeId, producer: NodeId) {
        if consumer == producer {
            return;
        }
        let Some(version) = self.nodes.get(producer).map(ReactiveNode::version) else {
            return;
        };
        let Some(node) = self.nodes.get(consumer) else {
            return;
        };
        let cursor = node.next_producer;

        match node.producer_position(producer) {
            Some(pos) if pos < cursor => return,
            Some(pos) => {
                if pos > cursor {
                    self.swap_producers(consumer, cursor, pos);
                }
                if let Some(edge) = self.nodes[consumer].producers.get_mut(cursor) {
                    edge.seen_version = version;
                }
            }
            None => {
                if let Some(stale) = node.producers.get(cursor).copied() {
                    self.remove_consumer_edge(stale.node, stale.consumer_slot);
                }
                let consumer_slot = self.add_consumer_edge(producer, consumer, cursor);
                let edge = ProducerEdge {
                    node: producer,
                    consumer_slot,
                    seen_version: version,
                };
                let producers = &mut self.nodes[consumer].producers;
                match producers.get_mut(cursor) {
                    Some(slot) => *slot = edge,
                    None => producers.push(edge),
                }
            }
        }

        self.nodes[consumer].next_producer += 1;
    }

    /// Drop every producer of `id` that its last evaluation did not confirm.
    ///
    /// Returns the number of pruned edges.
    pub fn prune_untracked(&mut self, id: NodeId) -> usize {
        let Some(node) = self.nodes.get_mut(id) else {
            return 0;
        };
        let cursor = node.next_producer.min(node.producers.len());
        let stale: SmallVec<[ProducerEdge; 4]> = node.producers.drain(cursor..).collect();

        for edge in &stale {
            self.remove_consumer_edge(edge.node, edge.consumer_slot);
        }
        if !stale.is_empty() {
            tracing::trace!(?id, pruned = stale.len(), "stale dependencies pruned");
        }
        stale.len()
    }

    /// Serializable view of the whole graph.
    pub fn snapshot(&self) -> GraphSnapshot {
        let nodes = self
            .nodes
            .iter()
            .map(|(id, node)| NodeSnapshot {
                id,
                kind: node.kind(),
                dirty: node.dirty,
                version: node.version,
                producers: node.producers.iter().map(|edge| edge.node).collect(),
                consumers: node.consumers.iter().map(|edge| edge.node).collect(),
            })
            .collect();
        GraphSnapshot { nodes }
    }

    fn add_consumer_edge(
        &mut self,
        producer: NodeId,
        consumer: NodeId,
        producer_slot: usize,
    ) -> usize {
        let consumers = &mut self.nodes[producer].consumers;
        consumers.push(ConsumerEdge {
            node: consumer,
            producer_slot,
        });
        consumers.len() - 1
    }

    /// Swap-remove the consumer edge at `slot` of `producer`, then point the
    /// edge moved into `slot` back at its new position.
    fn remove_consumer_edge(&mut self, producer: NodeId, slot: usize) {
        let Some(node) = self.nodes.get_mut(producer) else {
            return;
        };
        if slot >= node.consumers.len() {
            debug_assert!(false, "consumer slot {slot} out of range");
            return;
        }
        node.consumers.swap_remove(slot);

        let Some(moved) = node.consumers.get(slot).copied() else {
            return;
        };
        if let Some(edge) = self
            .nodes
            .get_mut(moved.node)
            .and_then(|consumer| consumer.producers.get_mut(moved.producer_slot))
        {
            edge.consumer_slot = slot;
        }
    }

    /// Remove the producer entry at `slot` of `consumer`, keeping the order
    /// of the entries after it and patching their back-references.
    fn remove_producer_entry(&mut self, consumer: NodeId, slot: usize) {
        let Some(node) = self.nodes.get_mut(consumer) else {
            return;
        };
        if slot >= node.producers.len() {
            return;
        }
        node.producers.remove(slot);
        if node.next_producer > slot {
            node.next_producer -= 1;
        }

        let shifted: SmallVec<[ProducerEdge; 4]> = node.producers[slot..].iter().copied().collect();
        for (offset, edge) in shifted.iter().enumerate() {
            if let Some(back) = self
                .nodes
                .get_mut(edge.node)
                .and_then(|producer| producer.consumers.get_mut(edge.consumer_slot))
            {
                back.producer_slot = slot + offset;
            }
        }
    }

    fn swap_producers(&mut self, consumer: NodeId, a: usize, b: usize) {
        let producers = &mut self.nodes[consumer].producers;
        producers.swap(a, b);
        let moved = [(a, producers[a]), (b, producers[b])];

        for (slot, edge) in moved {
            if let Some(back) = self
                .nodes
                .get_mut(edge.node)
                .and_then(|producer| producer.consumers.get_mut(edge.consumer_slot))
            {
                back.producer_slot = slot;
            }
        }
    }
}

/// Point-in-time view of the graph, for debugging.
#[derive(Debug, Clone, Serialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<NodeSnapshot>,
}

/// One node of a [`GraphSnapshot`].
#[derive(Debug, Clone, Serialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub kind: NodeKind,
    pub dirty: bool,
    pub version: u64,
    pub producers: Vec<NodeId>,
    pub consumers: Vec<NodeId>,
}
