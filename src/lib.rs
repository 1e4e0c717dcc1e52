//! # BRRTree
//!
//! **BRRTree** is the matching core of a URL-path router: a compressed prefix
//! tree whose nodes store route segments, resolve an incoming path one level
//! at a time, and pick between several handlers registered on the same path
//! using request-derived constraints such as `version` or `host`.
//!
//! ## Overview
//!
//! The crate is organized into the following modules:
//!
//! - **[`tree`]** - Arena-backed radix tree: child insertion by kind, prefix
//!   splitting, parametric fallbacks and single-level child resolution
//! - **[`handlers`]** - Per-node handler registry with duplicate detection and
//!   the cached unconstrained handler
//! - **[`constraints`]** - Constraint strategies, request-derived values and the
//!   compiler turning handler lists into bitmask matchers
//! - **[`config`]** - Compiler configuration from the environment or TOML
//!
//! ### Request Matching Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Router as Router<br/>(caller)
//!     participant Tree as Tree
//!     participant Node as Node
//!     participant Matcher as CompiledMatcher
//!
//!     Router->>Router: derive_constraints(request)
//!     loop until path consumed
//!         Router->>Tree: find_matching_child(node, derived, path)
//!         Tree->>Node: static / parametric / wildcard candidate
//!         Node->>Matcher: get_matching_handler(derived) (leaves only)
//!         Tree-->>Router: Some(child) or None
//!         alt dead end
//!             Router->>Node: parametric_brother()
//!         end
//!     end
//!     Router->>Tree: get_matching_handler(node, derived)
//!     Tree->>Matcher: select(derived)
//!     Matcher-->>Router: handler entry or None
//! ```
//!
//! ## Lifecycle
//!
//! Trees are built during a registration phase through `&mut Tree` and then
//! served read-only. Registration errors ([`TreeError`]) describe a malformed
//! route table and are meant to abort startup; matching never fails, it only
//! returns `None`.
//!
//! ## Example
//!
//! ```rust
//! use brrtree::constraints::DerivedConstraints;
//! use brrtree::handlers::Constraints;
//! use brrtree::tree::{Node, NodeKind, Tree};
//! use http::Method;
//!
//! # fn main() -> Result<(), brrtree::TreeError> {
//! let mut tree: Tree<&str> = Tree::new(Method::GET);
//! let pets = tree.add_child(tree.root(), Node::new("pets", NodeKind::Static))?;
//!
//! let v2: Constraints = [("version".to_string(), "2.0.0".to_string())].into();
//! tree.add_handler(pets, Some("list_pets"), Vec::new(), (), Constraints::new())?;
//! tree.add_handler(pets, Some("list_pets_v2"), Vec::new(), (), v2)?;
//! tree.precompile();
//!
//! let derived = DerivedConstraints::new().with("version", "2.x").requiring_match();
//! let entry = tree.get_matching_handler(pets, &derived).unwrap();
//! assert_eq!(entry.handler, "list_pets_v2");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constraints;
mod error;
pub mod handlers;
pub mod tree;

pub use config::TreeConfig;
pub use constraints::{Constrainer, DerivedConstraints, StrategyConstrainer};
pub use error::TreeError;
pub use handlers::{Constraints, HandlerEntry};
pub use tree::{Node, NodeId, NodeKind, Tree};
