//! Reactive Primitives
//!
//! This module implements the typed surface of the engine: signals, computed
//! values and effects, plus the runtime that drives them.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal's value is read
//! while a computed value or effect is evaluating, that consumer is recorded
//! as a dependent. When the value changes, every dependent is marked dirty.
//!
//! ## Computed Values
//!
//! A Computed is a derived value that caches its result. It is evaluated on
//! first read and re-evaluated only when a producer it read last time has
//! actually changed.
//!
//! ## Effects
//!
//! An Effect is a side-effecting consumer at the leaf of the graph. Writes
//! only mark it dirty; the host decides when to re-run it.
//!
//! # Implementation Notes
//!
//! Updates are push-pull. Writes push a cheap dirty flag to every
//! transitive dependent. Reads pull: a dirty node asks its producers, in the
//! order it read them, whether their version moved, and only then recomputes.
//! A computation never observes an inconsistent mix of old and new values,
//! and a dependent whose inputs settle back to equal values is not re-run.

mod computed;
mod context;
mod effect;
mod equal;
mod runtime;
mod signal;

pub use computed::{computed, Computed};
pub use context::{untracked, ReactiveContext};
pub use effect::{effect, Effect};
pub use equal::{ComputedOptions, Equality, SignalOptions};
pub use runtime::Runtime;
pub use signal::{signal, Signal};
