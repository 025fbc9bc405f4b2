//! Dependency Graph
//!
//! This module implements the graph that connects signals, computed values
//! and effects.
//!
//! # Overview
//!
//! - Nodes live in an arena and are addressed by a stable [`NodeId`].
//! - Every edge is stored twice: as a [`ProducerEdge`] on the consumer and as a
//!   [`ConsumerEdge`] on the producer. Each half records the index of the
//!   other, so either side can be removed in O(1) by swap-removal plus a
//!   back-reference patch.
//! - A consumer's producer list is ordered by first read during its last
//!   evaluation. The order decides polling order in the pull phase.
//!
//! The graph holds no values. Typed state lives in the handles in
//! [`crate::reactive`]; the graph reaches it through [`Recompute`].

mod arena;
mod node;
mod propagate;

pub use arena::{Graph, GraphSnapshot, NodeSnapshot};
pub use node::{ConsumerEdge, NodeId, NodeKind, ProducerEdge, ReactiveNode, Recompute};
