//! # Constraints Module
//!
//! Request-derived constraints and the machinery that turns a node's
//! handler list into a constant-per-constraint decision procedure.
//!
//! ## Overview
//!
//! A node may hold several handlers for the same path, each registered with
//! a different set of constraints (e.g. `{version: "1.0.0"}` and
//! `{host: "*.example.com"}`). Selecting among them must not cost
//! O(handlers × constraints) per request, so the handler list is compiled
//! once into bitmask tables:
//!
//! - **[`Constrainer`]** supplies one [`ConstraintStore`] per constraint name,
//!   each implementing that constraint's notion of equality
//! - **[`MatcherCompiler`]** builds a [`CompiledMatcher`] from the handler list
//! - **[`DerivedConstraints`]** carries the values read from a request
//!
//! ## Built-in strategies
//!
//! | Name      | Source header    | Store                    | Must match |
//! |-----------|------------------|--------------------------|------------|
//! | `version` | `Accept-Version` | [`SemVerStore`] (ranges) | yes        |
//! | `host`    | `Host`           | [`HostStore`] (patterns) | no         |
//!
//! Any other constraint name is compared verbatim through [`ExactStore`].

mod compiler;
mod constrainer;
mod derived;
mod host;
mod store;
mod version;

pub use compiler::{CompiledMatcher, MatcherCompiler};
pub use constrainer::{ConstraintStrategy, Constrainer, StrategyConstrainer};
pub use derived::{ConstraintVec, DerivedConstraints, MAX_INLINE_CONSTRAINTS};
pub use host::{HostStore, HostStrategy};
pub use store::{all_handlers, ConstraintStore, ExactStore, HandlerMask, MAX_CONSTRAINED_HANDLERS};
pub use version::{SemVerStore, VersionStrategy, ACCEPT_VERSION};
