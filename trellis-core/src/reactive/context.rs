//! Reactive Context
//!
//! The reactive context tracks which node is currently being evaluated.
//! This enables automatic dependency tracking: when a signal or computed
//! value is read, the runtime records an edge from it to the current
//! consumer.
//!
//! # Implementation
//!
//! There is a single thread-local slot. Entering a context saves the slot's
//! previous value and installs the new consumer; the returned guard restores
//! the previous value when dropped. Nested evaluations (a computed value
//! reading another computed value) therefore nest through save and restore,
//! and the slot is restored even if a computation panics.

use std::cell::Cell;
use std::marker::PhantomData;

use crate::graph::NodeId;

thread_local! {
    static ACTIVE_CONSUMER: Cell<Option<NodeId>> = const { Cell::new(None) };
}

/// Guard that owns the active-consumer slot until dropped.
pub struct ReactiveContext {
    installed: Option<NodeId>,
    previous: Option<NodeId>,
    _not_send: PhantomData<*const ()>,
}

impl ReactiveContext {
    /// Make `consumer` the active consumer.
    ///
    /// While the guard lives, every tracked read registers `consumer` as a
    /// dependent of the node read.
    pub fn enter(consumer: NodeId) -> Self {
        Self::install(Some(consumer))
    }

    /// Suspend tracking until the guard is dropped.
    pub fn untracked() -> Self {
        Self::install(None)
    }

    /// Check if there is an active consumer.
    pub fn is_active() -> bool {
        Self::current_consumer().is_some()
    }

    /// Get the active consumer, if any.
    pub fn current_consumer() -> Option<NodeId> {
        ACTIVE_CONSUMER.with(Cell::get)
    }

    fn install(consumer: Option<NodeId>) -> Self {
        let previous = ACTIVE_CONSUMER.with(|slot| slot.replace(consumer));
        Self {
            installed: consumer,
            previous,
            _not_send: PhantomData,
        }
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        let _ = ACTIVE_CONSUMER.try_with(|slot| {
            let popped = slot.replace(self.previous);
            debug_assert_eq!(
                popped, self.installed,
                "ReactiveContext mismatch: expected {:?}, got {:?}",
                self.installed, popped
            );
        });
    }
}

/// Run `f` without registering any dependencies.
///
/// Reads inside `f` still bring computed values up to date; they just do not
/// become producers of the surrounding computation.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    let _ctx = ReactiveContext::untracked();
    f()
}
