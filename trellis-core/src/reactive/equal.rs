//! Equality Predicates
//!
//! Every signal and computed value owns an equality predicate. A write or a
//! recomputation that produces a value equal to the current one is not a
//! change: the version stays put and nothing downstream is disturbed.

use std::fmt::Debug;
use std::rc::Rc;

/// Shared equality predicate over `T`.
pub struct Equality<T> {
    eq: Rc<dyn Fn(&T, &T) -> bool>,
}

impl<T: 'static> Equality<T> {
    /// Use a custom predicate.
    ///
    /// Useful when freshly built values compare equal structurally but
    /// `PartialEq` is missing, too strict, or too expensive.
    pub fn new<F>(eq: F) -> Self
    where
        F: Fn(&T, &T) -> bool + 'static,
    {
        Self { eq: Rc::new(eq) }
    }

    /// Treat every write as a change.
    pub fn never() -> Self {
        Self::new(|_, _| false)
    }

    /// Compare by a derived key.
    pub fn by_key<K, F>(key: F) -> Self
    where
        K: PartialEq,
        F: Fn(&T) -> K + 'static,
    {
        Self::new(move |a, b| key(a) == key(b))
    }

    /// Whether `a` and `b` count as the same value.
    pub fn equals(&self, a: &T, b: &T) -> bool {
        (self.eq)(a, b)
    }
}

impl<T: PartialEq + 'static> Equality<T> {
    /// Compare with `PartialEq`. The default.
    pub fn partial_eq() -> Self {
        Self::new(<T as PartialEq>::eq)
    }
}

impl<T: PartialEq + 'static> Default for Equality<T> {
    fn default() -> Self {
        Self::partial_eq()
    }
}

impl<T> Clone for Equality<T> {
    fn clone(&self) -> Self {
        Self { eq: Rc::clone(&self.eq) }
    }
}

impl<T> Debug for Equality<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Equality").finish_non_exhaustive()
    }
}

/// Options shared by signals and computed values.
#[derive(Debug, Clone)]
pub struct SignalOptions<T> {
    pub(crate) equal: Equality<T>,
}

impl<T: 'static> SignalOptions<T> {
    /// Options with the given equality.
    pub fn with_equal(equal: Equality<T>) -> Self {
        Self { equal }
    }

    /// Replace the equality predicate.
    pub fn equal<F>(mut self, eq: F) -> Self
    where
        F: Fn(&T, &T) -> bool + 'static,
    {
        self.equal = Equality::new(eq);
        self
    }
}

/// Options for computed values. Identical to [`SignalOptions`].
pub type ComputedOptions<T> = SignalOptions<T>;

impl<T: PartialEq + 'static> Default for SignalOptions<T> {
    fn default() -> Self {
        Self::with_equal(Equality::partial_eq())
    }
}
