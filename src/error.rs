//! Registration-time errors.
//!
//! Every variant describes a malformed route table. None of them are
//! recoverable at request time: the router is expected to surface them while
//! building the tree and refuse to serve until the routes are fixed. Runtime
//! matching never produces a `TreeError`; a miss is always `None`.

use thiserror::Error;

use crate::handlers::Constraints;

/// Structural violation detected while building a tree
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// A child with the same dispatch key already exists under the parent.
    ///
    /// Static children are keyed by the first character of their prefix,
    /// every parametric-family child shares `:` and the match-all child
    /// uses `*`.
    #[error("child with label '{label}' already exists under node '{parent_prefix}'")]
    DuplicateChildLabel {
        /// The dispatch key that collided
        label: char,
        /// Prefix of the node the insertion targeted
        parent_prefix: String,
    },

    /// A raw node kind code did not map to any known kind
    #[error("unknown node kind code {0}")]
    UnknownNodeKind(u8),

    /// A handler with a structurally equal constraint set is already registered
    #[error("handler for constraints {constraints:?} already registered on node '{prefix}'")]
    DuplicateHandler {
        /// Prefix of the node holding the duplicate
        prefix: String,
        /// The constraint set both registrations share
        constraints: Constraints,
    },

    /// Registering this handler would overflow the bitmask width
    #[error("node '{prefix}' cannot hold more than {limit} handlers once any of them is constrained")]
    TooManyConstrainedHandlers {
        /// Prefix of the saturated node
        prefix: String,
        /// The fixed bitmask width
        limit: usize,
    },

    /// A static child was inserted with an empty prefix and has no dispatch key
    #[error("static child has an empty prefix")]
    EmptyStaticPrefix,

    /// A split offset outside the prefix or not on a character boundary
    #[error("cannot split prefix '{prefix}' at byte {at}")]
    InvalidSplit {
        /// Prefix of the node being split
        prefix: String,
        /// Requested offset
        at: usize,
    },

    /// A constraint strategy rejected a registered value
    #[error("invalid value '{value}' for constraint '{name}'")]
    InvalidConstraintValue {
        /// Constraint name
        name: String,
        /// Rejected value
        value: String,
    },
}
