//! # Tree Module
//!
//! The radix tree behind BRRTree-based routers: prefix storage, child
//! insertion by kind, prefix splitting and single-level child resolution.
//!
//! ## Overview
//!
//! Each [`Node`] owns a prefix and dispatches to at most one child per key:
//!
//! | Child kind                        | Key                     |
//! |-----------------------------------|-------------------------|
//! | [`NodeKind::Static`]              | first prefix character  |
//! | `Param` / `Regex` / `MultiParam`  | `:`                     |
//! | [`NodeKind::MatchAll`]            | `*`                     |
//!
//! Nodes live in an arena owned by [`Tree`]; the match-all shortcut and the
//! parametric fallback ("brother") are plain [`NodeId`]s into that arena and
//! never own anything.
//!
//! ## Example
//!
//! ```rust
//! use brrtree::constraints::DerivedConstraints;
//! use brrtree::tree::{Node, NodeKind, Tree};
//! use http::Method;
//!
//! # fn main() -> Result<(), brrtree::TreeError> {
//! let mut tree: Tree<&str> = Tree::new(Method::GET);
//! let users = tree.add_child(tree.root(), Node::new("users", NodeKind::Static))?;
//! tree.add_handler(users, Some("list_users"), Vec::new(), (), Default::default())?;
//!
//! let derived = DerivedConstraints::new();
//! let next = tree.find_matching_child(tree.root(), &derived, "users");
//! assert_eq!(next, Some(users));
//! let entry = tree.get_matching_handler(users, &derived).unwrap();
//! assert_eq!(entry.handler, "list_users");
//! # Ok(())
//! # }
//! ```
//!
//! ## Performance
//!
//! Child resolution is one hash lookup per kind tried, plus the constraint
//! matcher's O(#constraints) selection when a candidate is a leaf.

mod core;
mod node;

pub use self::core::Tree;
pub use self::node::{Node, NodeId, NodeKind, PARAMETRIC_KEY, WILDCARD_KEY};
