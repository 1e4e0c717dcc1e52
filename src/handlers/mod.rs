//! # Handler Registry
//!
//! Ordered storage of `(handler, params, constraints, store)` entries on a
//! tree node, plus the cached unconstrained handler and the lazily compiled
//! constraint matcher.
//!
//! Entries are kept sorted by ascending constraint count (stable, so equal
//! counts keep registration order). Every registration invalidates the
//! node's compiled matcher; the next constrained lookup recompiles it.

mod entry;
mod registry;

pub use entry::{Constraints, HandlerEntry};
