//! Computed Implementation
//!
//! A Computed is a cached derived value that re-evaluates only when its
//! dependencies change.
//!
//! # How Computed Values Work
//!
//! 1. Creation runs nothing. The first read runs the computation and caches
//!    the result.
//!
//! 2. A read of a clean computed value returns the cache.
//!
//! 3. When a dependency changes, the computed value is marked dirty.
//!
//! 4. On the next read, its producers are polled in the order they were read
//!    last time. Each is brought up to date first; if none reports a new
//!    version the cache is kept without running the computation.
//!
//! 5. Otherwise the computation runs again, re-discovering its dependencies.
//!    The new value only counts as a change (new version, dependents
//!    dirtied) if the equality predicate says it differs from the old one.
//!
//! # Failure
//!
//! A computation may be fallible (see [`Computed::try_new`]). When it fails,
//! the cached value and the dirty flag are left untouched and the error is
//! returned from the read. The next read tries again.

use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;

use crate::error::{BoxError, ReactiveError, Result};
use crate::graph::{NodeId, NodeKind, Recompute};

use super::equal::{Equality, SignalOptions};
use super::runtime::{self, Runtime};

type Computation<T> = Box<dyn Fn() -> Result<T, BoxError>>;

struct ComputedInner<T> {
    id: NodeId,
    value: RefCell<Option<T>>,
    compute: Computation<T>,
    equal: Equality<T>,
}

impl<T: 'static> Recompute for ComputedInner<T> {
    fn has_value(&self) -> bool {
        self.value.borrow().is_some()
    }

    fn recompute(&self) -> Result<bool> {
        let next = Runtime::evaluate(self.id, || (self.compute)())
            .map_err(|source| ReactiveError::from_computation(self.id, source))?;

        let changed = match &*self.value.borrow() {
            Some(current) => !self.equal.equals(current, &next),
            None => true,
        };
        if changed {
            let _previous = self.value.replace(Some(next));
        }
        Ok(changed)
    }
}

impl<T> Drop for ComputedInner<T> {
    fn drop(&mut self) {
        Runtime::remove(self.id);
    }
}

/// A cached value derived from other reactive values.
///
/// # Example
///
/// ```rust
/// use trellis_core::reactive::{Computed, Signal};
///
/// let price = Signal::new(10.5);
/// let total = {
///     let price = price.clone();
///     Computed::new(move || price.get() * 2.0)
/// };
///
/// assert_eq!(total.get(), 21.0);
/// price.set(12.0);
/// assert_eq!(total.get(), 24.0);
/// ```
pub struct Computed<T: 'static> {
    inner: Rc<ComputedInner<T>>,
}

impl<T: PartialEq + 'static> Computed<T> {
    /// Create a computed value compared with `PartialEq`.
    ///
    /// The computation is not run until the first read.
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        Self::with_options(compute, SignalOptions::default())
    }

    /// Create a computed value from a fallible computation.
    pub fn try_new<F, E>(compute: F) -> Self
    where
        F: Fn() -> Result<T, E> + 'static,
        E: Into<BoxError>,
    {
        Self::try_with_options(compute, SignalOptions::default())
    }
}

impl<T: 'static> Computed<T> {
    /// Create a computed value with explicit options.
    pub fn with_options<F>(compute: F, options: SignalOptions<T>) -> Self
    where
        F: Fn() -> T + 'static,
    {
        Self::build(Box::new(move || Ok(compute())), options.equal)
    }

    /// Create a computed value from a fallible computation, with options.
    pub fn try_with_options<F, E>(compute: F, options: SignalOptions<T>) -> Self
    where
        F: Fn() -> Result<T, E> + 'static,
        E: Into<BoxError>,
    {
        Self::build(Box::new(move || compute().map_err(Into::into)), options.equal)
    }

    fn build(compute: Computation<T>, equal: Equality<T>) -> Self {
        let inner = Rc::new_cyclic(|weak| ComputedInner {
            id: runtime::register(NodeKind::Computed, weak),
            value: RefCell::new(None),
            compute,
            equal,
        });
        Self { inner }
    }

    /// Get the node id.
    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    /// Get the current value, recomputing if necessary.
    ///
    /// # Panics
    ///
    /// Panics if the computation fails. Use [`try_get`](Self::try_get) for
    /// fallible computations.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.with(T::clone)
    }

    /// Get the current value, recomputing if necessary.
    pub fn try_get(&self) -> Result<T>
    where
        T: Clone,
    {
        self.try_with(T::clone)
    }

    /// Borrow the current value, recomputing if necessary.
    ///
    /// # Panics
    ///
    /// Panics if the computation fails.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        match self.try_with(f) {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    /// Borrow the current value, recomputing if necessary.
    ///
    /// The read is recorded as a dependency of the active consumer even when
    /// the computation fails, so the consumer retries once it recovers.
    pub fn try_with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        let id = self.inner.id;
        let refreshed = Runtime::refresh(id);
        Runtime::track_read(id);
        refreshed?;

        let value = self.inner.value.borrow();
        match value.as_ref() {
            Some(value) => Ok(f(value)),
            None => Err(ReactiveError::Disposed { node: id }),
        }
    }

    /// Whether the next read has to check its producers.
    pub fn is_dirty(&self) -> bool {
        Runtime::is_dirty(self.inner.id)
    }

    /// Whether the computation has completed at least once.
    pub fn has_value(&self) -> bool {
        self.inner.has_value()
    }

    /// Number of observed value changes.
    pub fn version(&self) -> u64 {
        Runtime::version_of(self.inner.id).unwrap_or_default()
    }

    /// Number of producers read in the last evaluation.
    pub fn producer_count(&self) -> usize {
        Runtime::producer_count(self.inner.id)
    }

    /// Number of nodes that read this value in their last evaluation.
    pub fn consumer_count(&self) -> usize {
        Runtime::consumer_count(self.inner.id)
    }
}

impl<T: 'static> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Debug + 'static> Debug for Computed<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.inner.id)
            .field("dirty", &self.is_dirty())
            .field("value", &*self.inner.value.borrow())
            .field("version", &self.version())
            .finish()
    }
}

/// Create a computed value compared with `PartialEq`.
pub fn computed<T, F>(compute: F) -> Computed<T>
where
    T: PartialEq + 'static,
    F: Fn() -> T + 'static,
{
    Computed::new(compute)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Signal;
    use std::cell::Cell;

    fn counter() -> (Rc<Cell<u32>>, Rc<Cell<u32>>) {
        let count = Rc::new(Cell::new(0));
        (count.clone(), count)
    }

    #[test]
    fn computed_is_lazy() {
        let (calls, calls_clone) = counter();
        let memo = Computed::new(move || {
            calls_clone.set(calls_clone.get() + 1);
            42
        });

        assert!(!memo.has_value());
        assert!(memo.is_dirty());
        assert_eq!(calls.get(), 0);

        assert_eq!(memo.get(), 42);
        assert_eq!(calls.get(), 1);
        assert!(!memo.is_dirty());
    }

    #[test]
    fn computed_caches_value_when_clean() {
        let (calls, calls_clone) = counter();
        let memo = Computed::new(move || {
            calls_clone.set(calls_clone.get() + 1);
            42
        });

        assert_eq!(memo.get(), 42);
        assert_eq!(memo.get(), 42);
        assert_eq!(memo.get(), 42);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn computed_version_tracks_value_changes() {
        let source = Signal::new(1);
        let parity = {
            let source = source.clone();
            Computed::new(move || source.get() % 2)
        };

        parity.get();
        assert_eq!(parity.version(), 1);

        source.set(3);
        parity.get();
        assert_eq!(parity.version(), 1, "same parity is not a change");

        source.set(4);
        parity.get();
        assert_eq!(parity.version(), 2);
    }

    #[test]
    fn failed_computation_keeps_old_value_and_retries() {
        let source = Signal::new(1);
        let (calls, calls_clone) = counter();
        let checked = {
            let source = source.clone();
            Computed::try_new(move || {
                calls_clone.set(calls_clone.get() + 1);
                let value = source.get();
                if value < 0 {
                    return Err(format!("negative input {value}"));
                }
                Ok(value * 10)
            })
        };

        assert_eq!(checked.try_get().unwrap(), 10);

        source.set(-1);
        let err = checked.try_get().unwrap_err();
        assert!(matches!(err, ReactiveError::Computation { .. }));
        assert!(err.to_string().contains("negative input -1"));
        assert!(checked.is_dirty());
        assert_eq!(checked.version(), 1);

        // Still failing: retried, not cached.
        assert!(checked.try_get().is_err());
        assert_eq!(calls.get(), 3);

        source.set(2);
        assert_eq!(checked.try_get().unwrap(), 20);
        assert!(!checked.is_dirty());
        assert_eq!(checked.version(), 2);
    }

    #[test]
    fn panicking_computation_leaves_node_dirty() {
        let source = Signal::new(0);
        let fragile = {
            let source = source.clone();
            Computed::new(move || {
                let value = source.get();
                assert!(value != 13, "unlucky");
                value
            })
        };
        assert_eq!(fragile.get(), 0);

        source.set(13);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| fragile.get()));
        assert!(result.is_err());
        assert!(fragile.is_dirty());
        assert!(!Runtime::is_tracking());

        source.set(14);
        assert_eq!(fragile.get(), 14);
    }

    #[test]
    fn custom_equality_stops_propagation() {
        let source = Signal::new(vec![1, 2, 3]);
        let len = {
            let source = source.clone();
            Computed::with_options(
                move || source.get(),
                SignalOptions::default().equal(|a: &Vec<i32>, b: &Vec<i32>| a.len() == b.len()),
            )
        };

        len.get();
        source.set(vec![4, 5, 6]);
        len.get();
        assert_eq!(len.version(), 1);
        assert_eq!(len.get(), vec![1, 2, 3], "equal value keeps the cached one");
    }
}
