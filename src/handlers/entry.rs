use std::collections::BTreeMap;

/// Constraint name to required value.
///
/// A `BTreeMap` so that two maps holding the same pairs compare equal
/// regardless of insertion order.
pub type Constraints = BTreeMap<String, String>;

/// One registered route target at a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerEntry<H, S = ()> {
    /// Opaque handler, returned unchanged and never invoked by the tree
    pub handler: H,
    /// Parameter names the route binds, in path order
    pub params: Vec<String>,
    /// Required constraint values; empty means unconstrained
    pub constraints: Constraints,
    /// Opaque per-handler payload
    pub store: S,
}

impl<H, S> HandlerEntry<H, S> {
    pub fn new(handler: H, params: Vec<String>, store: S, constraints: Constraints) -> Self {
        Self {
            handler,
            params,
            constraints,
            store,
        }
    }

    #[inline]
    #[must_use]
    pub fn params_length(&self) -> usize {
        self.params.len()
    }

    #[inline]
    #[must_use]
    pub fn is_constrained(&self) -> bool {
        !self.constraints.is_empty()
    }
}
