//! Error types for the reactive engine.

use thiserror::Error;

use crate::graph::NodeId;

/// Boxed error returned by fallible computations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout the crate.
pub type Result<T, E = ReactiveError> = std::result::Result<T, E>;

/// Errors surfaced by reads of computed values and effects.
///
/// A failed computation never marks its node clean: the cached value and
/// the dirty flag are left as they were, so the next read retries.
#[derive(Debug, Error)]
pub enum ReactiveError {
    /// A fallible computation returned an error.
    #[error("computation of node {node:?} failed: {source}")]
    Computation {
        node: NodeId,
        #[source]
        source: BoxError,
    },

    /// A node was re-entered while its own computation was running.
    ///
    /// Only reported under [`CyclePolicy::Detect`](crate::CyclePolicy::Detect).
    #[error("dependency cycle detected at node {node:?}")]
    Cycle { node: NodeId },

    /// The node is no longer part of the graph.
    #[error("node {node:?} has been removed from the graph")]
    Disposed { node: NodeId },
}

impl ReactiveError {
    /// Attribute an error returned by `node`'s computation.
    ///
    /// Errors raised by nested reads pass through unchanged.
    pub(crate) fn from_computation(node: NodeId, source: BoxError) -> Self {
        match source.downcast::<ReactiveError>() {
            Ok(err) => *err,
            Err(source) => Self::Computation { node, source },
        }
    }

    /// The node the error was reported for.
    pub fn node(&self) -> NodeId {
        match self {
            Self::Computation { node, .. } | Self::Cycle { node } | Self::Disposed { node } => {
                *node
            }
        }
    }
}
