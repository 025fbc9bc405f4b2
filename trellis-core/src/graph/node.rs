//! Graph Nodes
//!
//! This module defines the node type stored in the dependency graph arena
//! and the two halves of every producer/consumer edge.

use std::rc::Weak;

use serde::Serialize;
use slotmap::new_key_type;
use smallvec::SmallVec;

use crate::error::Result;

new_key_type! {
    /// Stable handle of a node in the graph arena.
    pub struct NodeId;
}

/// The kind of node in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// A writable source. Never dirty, never recomputed.
    Signal,

    /// A derived, memoized value. Recomputed lazily on read.
    Computed,

    /// A leaf consumer. Evaluated at creation and whenever the host re-runs it.
    Effect,
}

/// Typed side of a node, seen by the graph through dynamic dispatch.
///
/// Signals have no recompute procedure. Computed values and effects register
/// one so that the pull phase can refresh a producer it only knows by id.
pub trait Recompute {
    /// Whether a value has been computed at least once.
    fn has_value(&self) -> bool;

    /// Run the computation as the active consumer.
    ///
    /// Returns `true` when the stored value changed by the node's equality.
    fn recompute(&self) -> Result<bool>;

    /// Called after the push phase marked this node dirty.
    fn on_dirty(&self) {}
}

/// Edge entry on the consumer side: a node this node read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProducerEdge {
    /// The producer.
    pub node: NodeId,

    /// Index of the matching [`ConsumerEdge`] in the producer's consumer list.
    pub consumer_slot: usize,

    /// Producer version observed when the edge was last confirmed.
    pub seen_version: u64,
}

/// Edge entry on the producer side: a node that read this node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConsumerEdge {
    /// The consumer.
    pub node: NodeId,

    /// Index of the matching [`ProducerEdge`] in the consumer's producer list.
    pub producer_slot: usize,
}

/// A vertex of the dependency graph.
pub struct ReactiveNode {
    kind: NodeKind,

    /// A producer may have changed; recheck before trusting the value.
    pub(crate) dirty: bool,

    /// Bumped exactly when the value changes.
    pub(crate) version: u64,

    /// Producers read during the last evaluation, in read order.
    pub(crate) producers: SmallVec<[ProducerEdge; 4]>,

    /// Consumers that read this node. Order is not significant.
    pub(crate) consumers: SmallVec<[ConsumerEdge; 4]>,

    /// Producer-discovery cursor for the evaluation in progress.
    pub(crate) next_producer: usize,

    /// Set while the node is being brought up to date (polled or recomputed).
    pub(crate) computing: bool,

    /// An evaluation started but did not complete. Edge versions recorded by
    /// it cannot be trusted, so the next refresh recomputes.
    pub(crate) stale: bool,

    recompute: Option<Weak<dyn Recompute>>,
}

impl ReactiveNode {
    /// Create a node of the given kind.
    ///
    /// Computed and effect nodes start dirty so that their first read
    /// evaluates them.
    pub fn new(kind: NodeKind, recompute: Option<Weak<dyn Recompute>>) -> Self {
        Self {
            kind,
            dirty: kind != NodeKind::Signal,
            version: 0,
            producers: SmallVec::new(),
            consumers: SmallVec::new(),
            next_producer: 0,
            computing: false,
            stale: false,
            recompute,
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_computing(&self) -> bool {
        self.computing
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn producers(&self) -> &[ProducerEdge] {
        &self.producers
    }

    pub fn consumers(&self) -> &[ConsumerEdge] {
        &self.consumers
    }

    /// Position of `producer` in this node's producer list, if present.
    pub fn producer_position(&self, producer: NodeId) -> Option<usize> {
        self.producers.iter().position(|edge| edge.node == producer)
    }

    /// The typed recompute procedure, if the node has one and it is alive.
    pub(crate) fn recompute_handle(&self) -> Option<std::rc::Rc<dyn Recompute>> {
        self.recompute.as_ref().and_then(Weak::upgrade)
    }
}

impl std::fmt::Debug for ReactiveNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactiveNode")
            .field("kind", &self.kind)
            .field("dirty", &self.dirty)
            .field("version", &self.version)
            .field("producers", &self.producers)
            .field("consumers", &self.consumers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_node_starts_clean() {
        let node = ReactiveNode::new(NodeKind::Signal, None);
        assert_eq!(node.kind(), NodeKind::Signal);
        assert!(!node.is_dirty());
        assert_eq!(node.version(), 0);
    }

    #[test]
    fn derived_nodes_start_dirty() {
        assert!(ReactiveNode::new(NodeKind::Computed, None).is_dirty());
        assert!(ReactiveNode::new(NodeKind::Effect, None).is_dirty());
    }

    #[test]
    fn missing_recompute_handle_is_none() {
        let node = ReactiveNode::new(NodeKind::Computed, None);
        assert!(node.recompute_handle().is_none());
        assert!(node.producers().is_empty());
        assert!(node.consumers().is_empty());
    }
}
