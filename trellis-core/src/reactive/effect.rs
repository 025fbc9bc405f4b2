//! Effect Implementation
//!
//! An Effect is a side-effecting computation at the leaf of the graph.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately to establish
//!    initial dependencies.
//!
//! 2. When any dependency changes, the push phase marks the effect dirty and
//!    calls its dirty hook, if one was given. Nothing is re-run at that
//!    point: the hook typically queues the effect with a host scheduler.
//!
//! 3. The host later calls [`Effect::run_if_dirty`]. The effect polls its
//!    producers like a computed value would and runs its function only if
//!    one of them actually produced a different value.
//!
//! 4. Each run re-discovers dependencies. Producers not read again are
//!    dropped.
//!
//! # Differences from Computed
//!
//! - Computed values return a value; effects do not.
//! - Computed values are refreshed by reads; effects are refreshed by the host.
//! - Nothing can depend on an effect.

use std::cell::Cell;
use std::rc::Rc;

use crate::error::{BoxError, ReactiveError, Result};
use crate::graph::{NodeId, NodeKind, Recompute};

use super::runtime::{self, Runtime};

type EffectFn = Box<dyn Fn() -> Result<(), BoxError>>;

struct EffectInner {
    id: NodeId,
    run: EffectFn,
    on_dirty: Option<Box<dyn Fn(NodeId)>>,
    run_count: Cell<usize>,
}

impl Recompute for EffectInner {
    fn has_value(&self) -> bool {
        self.run_count.get() > 0
    }

    fn recompute(&self) -> Result<bool> {
        let result = Runtime::evaluate(self.id, || (self.run)());
        self.run_count.set(self.run_count.get() + 1);
        result.map_err(|source| ReactiveError::from_computation(self.id, source))?;
        Ok(false)
    }

    fn on_dirty(&self) {
        if let Some(hook) = &self.on_dirty {
            hook(self.id);
        }
    }
}

impl Drop for EffectInner {
    fn drop(&mut self) {
        Runtime::remove(self.id);
    }
}

/// A side-effecting computation that re-runs when its dependencies change.
///
/// Dropping the last handle removes the effect from the graph.
///
/// # Example
///
/// ```rust
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use trellis_core::reactive::{Effect, Signal};
///
/// let count = Signal::new(0);
/// let seen = Rc::new(RefCell::new(Vec::new()));
///
/// let effect = {
///     let (count, seen) = (count.clone(), seen.clone());
///     Effect::new(move || seen.borrow_mut().push(count.get()))
/// };
///
/// count.set(5);
/// assert!(effect.is_dirty());
/// effect.run_if_dirty().unwrap();
/// assert_eq!(*seen.borrow(), vec![0, 5]);
/// ```
pub struct Effect {
    inner: Rc<EffectInner>,
}

impl Effect {
    /// Create an effect and run it once.
    ///
    /// # Panics
    ///
    /// Panics if the first run fails.
    #[must_use = "dropping the handle removes the effect from the graph"]
    pub fn new<F>(run: F) -> Self
    where
        F: Fn() + 'static,
    {
        Self::spawn(Self::infallible(run), None).unwrap_or_else(|err| panic!("{err}"))
    }

    /// Create an effect from a fallible function and run it once.
    ///
    /// If the first run fails the effect is dropped and the error returned.
    #[must_use = "dropping the handle removes the effect from the graph"]
    pub fn try_new<F, E>(run: F) -> Result<Self>
    where
        F: Fn() -> Result<(), E> + 'static,
        E: Into<BoxError>,
    {
        Self::spawn(Box::new(move || run().map_err(Into::into)), None)
    }

    /// Create an effect with a dirty hook and run it once.
    ///
    /// `on_dirty` is called with the effect's id every time the push phase
    /// marks the effect dirty. It runs outside any graph borrow, so it may
    /// read signals, but it is meant to queue work rather than do it.
    ///
    /// # Panics
    ///
    /// Panics if the first run fails.
    #[must_use = "dropping the handle removes the effect from the graph"]
    pub fn with_notify<F, N>(run: F, on_dirty: N) -> Self
    where
        F: Fn() + 'static,
        N: Fn(NodeId) + 'static,
    {
        Self::spawn(Self::infallible(run), Some(Box::new(on_dirty)))
            .unwrap_or_else(|err| panic!("{err}"))
    }

    /// Create an effect without running it.
    ///
    /// It starts dirty and has no dependencies until the first
    /// [`run_if_dirty`](Self::run_if_dirty) or [`run`](Self::run).
    #[must_use = "dropping the handle removes the effect from the graph"]
    pub fn new_lazy<F>(run: F) -> Self
    where
        F: Fn() + 'static,
    {
        Self::build(Self::infallible(run), None)
    }

    fn infallible<F>(run: F) -> EffectFn
    where
        F: Fn() + 'static,
    {
        Box::new(move || {
            run();
            Ok(())
        })
    }

    fn build(run: EffectFn, on_dirty: Option<Box<dyn Fn(NodeId)>>) -> Self {
        let inner = Rc::new_cyclic(|weak| EffectInner {
            id: runtime::register(NodeKind::Effect, weak),
            run,
            on_dirty,
            run_count: Cell::new(0),
        });
        Self { inner }
    }

    fn spawn(run: EffectFn, on_dirty: Option<Box<dyn Fn(NodeId)>>) -> Result<Self> {
        let effect = Self::build(run, on_dirty);
        Runtime::refresh(effect.id())?;
        Ok(effect)
    }

    /// Get the node id.
    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    /// Run the function now, whether or not anything changed.
    pub fn run(&self) -> Result<()> {
        Runtime::force(self.inner.id)
    }

    /// Bring the effect up to date.
    ///
    /// Returns `true` if the function ran. A dirty effect whose producers
    /// all settled back to their previous values is marked clean without
    /// running.
    pub fn run_if_dirty(&self) -> Result<bool> {
        if !self.is_dirty() {
            return Ok(false);
        }
        let before = self.run_count();
        Runtime::refresh(self.inner.id)?;
        Ok(self.run_count() != before)
    }

    /// Whether a producer may have changed since the last run.
    pub fn is_dirty(&self) -> bool {
        Runtime::is_dirty(self.inner.id)
    }

    /// Number of times the function has run.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.get()
    }

    /// Number of producers read in the last run.
    pub fn producer_count(&self) -> usize {
        Runtime::producer_count(self.inner.id)
    }
}

impl Clone for Effect {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.id)
            .field("dirty", &self.is_dirty())
            .field("run_count", &self.run_count())
            .finish()
    }
}

/// Create an effect and run it once.
#[must_use = "dropping the handle removes the effect from the graph"]
pub fn effect<F>(run: F) -> Effect
where
    F: Fn() + 'static,
{
    Effect::new(run)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
