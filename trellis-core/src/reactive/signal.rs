//! Signal Implementation
//!
//! A Signal is the writable source of the reactive graph. It holds ground
//! truth, so it is never dirty and never recomputed.
//!
//! # How Signals Work
//!
//! 1. When a signal is read while a computed value or effect is evaluating,
//!    that consumer is recorded as a dependent.
//!
//! 2. When a signal is written with a value its equality predicate considers
//!    different, its version is bumped and every dependent, transitively, is
//!    marked dirty.
//!
//! 3. A write of an equal value is a no-op: no version bump, no propagation.
//!
//! # Memory Layout
//!
//! A `Signal<T>` is a reference-counted handle. Clones share the value.
//! When the last clone is dropped the node leaves the graph.

use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;

use crate::graph::{NodeId, NodeKind};

use super::equal::{Equality, SignalOptions};
use super::runtime::Runtime;

struct SignalInner<T> {
    id: NodeId,
    value: RefCell<T>,
    equal: Equality<T>,
}

impl<T> Drop for SignalInner<T> {
    fn drop(&mut self) {
        Runtime::remove(self.id);
    }
}

/// A writable reactive value.
///
/// # Example
///
/// ```rust
/// use trellis_core::reactive::Signal;
///
/// let count = Signal::new(0);
/// assert_eq!(count.get(), 0);
///
/// count.set(5);
/// count.update(|v| v + 1);
/// assert_eq!(count.get(), 6);
/// ```
pub struct Signal<T: 'static> {
    inner: Rc<SignalInner<T>>,
}

impl<T: PartialEq + 'static> Signal<T> {
    /// Create a new signal compared with `PartialEq`.
    pub fn new(value: T) -> Self {
        Self::with_options(value, SignalOptions::default())
    }
}

impl<T: 'static> Signal<T> {
    /// Create a new signal with explicit options.
    pub fn with_options(value: T, options: SignalOptions<T>) -> Self {
        let id = Runtime::insert(NodeKind::Signal, None);
        Self {
            inner: Rc::new(SignalInner {
                id,
                value: RefCell::new(value),
                equal: options.equal,
            }),
        }
    }

    /// Get the signal's node id.
    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    /// Get a clone of the current value, recording a dependency.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.with(T::clone)
    }

    /// Borrow the current value, recording a dependency.
    ///
    /// # Panics
    ///
    /// Writing this signal from inside `f` panics, since the value is
    /// borrowed.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        Runtime::track_read(self.inner.id);
        f(&self.inner.value.borrow())
    }

    /// Get a clone of the current value without recording a dependency.
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.inner.value.borrow().clone()
    }

    /// Set a new value.
    ///
    /// If the new value equals the current one this does nothing. Otherwise
    /// the value is replaced and every dependent is marked dirty.
    pub fn set(&self, value: T) {
        let unchanged = {
            let current = self.inner.value.borrow();
            self.inner.equal.equals(&current, &value)
        };
        if unchanged {
            tracing::trace!(id = ?self.inner.id, "equal value written, nothing to propagate");
            return;
        }

        let _previous = self.inner.value.replace(value);
        Runtime::producer_changed(self.inner.id);
    }

    /// Update the value using a function of the current one.
    ///
    /// Same semantics as [`set`](Self::set).
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let next = {
            let current = self.inner.value.borrow();
            f(&current)
        };
        self.set(next);
    }

    /// Number of observed value changes.
    pub fn version(&self) -> u64 {
        Runtime::version_of(self.inner.id).unwrap_or_default()
    }

    /// Number of nodes that read this signal in their last evaluation.
    pub fn consumer_count(&self) -> usize {
        Runtime::consumer_count(self.inner.id)
    }
}

impl<T: 'static> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Debug + 'static> Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.inner.id)
            .field("value", &*self.inner.value.borrow())
            .field("version", &self.version())
            .finish()
    }
}

/// Create a signal compared with `PartialEq`.
pub fn signal<T: PartialEq + 'static>(value: T) -> Signal<T> {
    Signal::new(value)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_get_and_set() {
        let signal = Signal::new(0);
        assert_eq!(signal.get(), 0);

        signal.set(42);
        assert_eq!(signal.get(), 42);
    }

    #[test]
    fn signal_update() {
        let signal = Signal::new(10);
        signal.update(|v| v + 5);
        assert_eq!(signal.get(), 15);
    }

    #[test]
    fn version_bumps_only_on_change() {
        let signal = Signal::new("New York".to_string());
        assert_eq!(signal.version(), 0);

        signal.set("Vienna".to_string());
        assert_eq!(signal.version(), 1);

        signal.set("Vienna".to_string());
        assert_eq!(signal.version(), 1);

        signal.update(|v| v.clone());
        assert_eq!(signal.version(), 1);
    }

    #[test]
    fn custom_equality_suppresses_changes() {
        let options = SignalOptions::default().equal(|a: &f64, b: &f64| (a - b).abs() < 1e-3);
        let signal = Signal::with_options(1.0, options);

        signal.set(1.0001);
        assert_eq!(signal.version(), 0);
        assert_eq!(signal.get(), 1.0);

        signal.set(2.0);
        assert_eq!(signal.version(), 1);
    }

    #[test]
    fn signal_clone_shares_state() {
        let signal1 = Signal::new(0);
        let signal2 = signal1.clone();

        signal1.set(42);
        assert_eq!(signal2.get(), 42);
        assert_eq!(signal1.id(), signal2.id());
    }

    #[test]
    fn dropping_last_handle_removes_node() {
        let before = Runtime::node_count();
        let signal = Signal::new(1);
        let clone = signal.clone();
        assert_eq!(Runtime::node_count(), before + 1);

        drop(signal);
        assert_eq!(Runtime::node_count(), before + 1);

        drop(clone);
        assert_eq!(Runtime::node_count(), before);
    }
}
