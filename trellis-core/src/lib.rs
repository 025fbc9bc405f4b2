//! Trellis Core
//!
//! A fine-grained reactive dependency graph with push-pull propagation.
//!
//! - Reactive primitives (signals, computed values, effects)
//! - Automatic dependency tracking with dynamic dependency sets
//! - Glitch-free, lazy, memoized re-evaluation
//!
//! # Architecture
//!
//! - `graph`: the node arena, edge bookkeeping and dirty propagation
//! - `reactive`: typed handles and the per-thread runtime
//! - `config`: runtime configuration
//! - `error`: error types
//!
//! # Example
//!
//! ```rust
//! use trellis_core::{Computed, Signal};
//!
//! let price = Signal::new(10.5);
//! let count = Signal::new(2);
//!
//! let total = {
//!     let (price, count) = (price.clone(), count.clone());
//!     Computed::new(move || price.get() * f64::from(count.get()))
//! };
//! assert_eq!(total.get(), 21.0);
//!
//! count.set(3);
//! assert!(total.is_dirty());
//! assert_eq!(total.get(), 31.5);
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod reactive;

pub use config::{CyclePolicy, RuntimeConfig};
pub use error::{BoxError, ReactiveError, Result};
pub use graph::{GraphSnapshot, NodeId, NodeKind};
pub use reactive::{
    computed, effect, signal, untracked, Computed, ComputedOptions, Effect, Equality, Runtime,
    Signal, SignalOptions,
};
