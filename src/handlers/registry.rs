use once_cell::sync::OnceCell;
use tracing::trace;

use super::entry::{Constraints, HandlerEntry};
use crate::constraints::{CompiledMatcher, DerivedConstraints, MatcherCompiler, MAX_CONSTRAINED_HANDLERS};
use crate::error::TreeError;
use crate::tree::Node;

impl<H, S> Node<H, S> {
    /// Register a handler on this node.
    ///
    /// Does nothing when `handler` is `None`. The node is left untouched when
    /// an error is returned.
    ///
    /// # Errors
    ///
    /// * [`TreeError::DuplicateHandler`] if an entry with an equal constraint
    ///   map exists
    /// * [`TreeError::TooManyConstrainedHandlers`] if the node would hold more
    ///   than [`MAX_CONSTRAINED_HANDLERS`] entries while any is constrained
    pub fn add_handler(
        &mut self,
        handler: Option<H>,
        params: Vec<String>,
        store: S,
        constraints: Constraints,
    ) -> Result<(), TreeError> {
        let Some(handler) = handler else {
            return Ok(());
        };

        if self.get_handler(&constraints).is_some() {
            return Err(TreeError::DuplicateHandler {
                prefix: self.prefix.clone(),
                constraints,
            });
        }

        let has_constraints = self.has_constraints || !constraints.is_empty();
        if has_constraints && self.handlers.len() >= MAX_CONSTRAINED_HANDLERS {
            return Err(TreeError::TooManyConstrainedHandlers {
                prefix: self.prefix.clone(),
                limit: MAX_CONSTRAINED_HANDLERS,
            });
        }

        self.handlers
            .push(HandlerEntry::new(handler, params, store, constraints));
        self.handlers.sort_by_key(|entry| entry.constraints.len());

        self.has_constraints = has_constraints;
        self.unconstrained_handler = self
            .handlers
            .iter()
            .position(|entry| !entry.is_constrained());
        self.invalidate_matcher();
        Ok(())
    }

    /// Entry registered with exactly `constraints`, if any
    #[must_use]
    pub fn get_handler(&self, constraints: &Constraints) -> Option<&HandlerEntry<H, S>> {
        self.handlers
            .iter()
            .find(|entry| entry.constraints == *constraints)
    }

    /// Handler serving a request with the given derived constraints.
    ///
    /// Constrained nodes go through the compiled matcher, compiling it first
    /// if the handler list changed since the last lookup. Unconstrained nodes
    /// return their single handler. Either way, a request that must match is
    /// never served by the unconstrained handler.
    #[must_use]
    pub fn get_matching_handler(
        &self,
        derived: &DerivedConstraints,
        compiler: &MatcherCompiler,
    ) -> Option<&HandlerEntry<H, S>> {
        if self.has_constraints {
            let index = self.compiled_matcher(compiler).select(derived);
            trace!(prefix = %self.prefix, index = ?index, "Constrained handler lookup");
            return index.map(|index| &self.handlers[index]);
        }
        if derived.must_match() {
            return None;
        }
        self.unconstrained_handler()
    }

    /// The node's matcher, compiling it on first use after an invalidation
    pub fn compiled_matcher(&self, compiler: &MatcherCompiler) -> &CompiledMatcher {
        self.matcher.get_or_init(|| {
            let constraints: Vec<&Constraints> =
                self.handlers.iter().map(|entry| &entry.constraints).collect();
            compiler.compile(&constraints)
        })
    }

    #[must_use]
    pub fn is_compiled(&self) -> bool {
        self.matcher.get().is_some()
    }

    pub(crate) fn invalidate_matcher(&mut self) {
        self.matcher = OnceCell::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TreeConfig;
    use crate::constraints::StrategyConstrainer;
    use crate::tree::NodeKind;
    use std::sync::Arc;

    fn constraints(pairs: &[(&str, &str)]) -> Constraints {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn compiler() -> MatcherCompiler {
        MatcherCompiler::new(Arc::new(StrategyConstrainer::new()), TreeConfig::default())
    }

    fn node() -> Node<&'static str> {
        Node::new("/users", NodeKind::Static)
    }

    #[test]
    fn test_absent_handler_is_a_no_op() {
        let mut node = node();
        node.add_handler(None, Vec::new(), (), constraints(&[]))
            .unwrap();
        assert!(node.handlers().is_empty());
        assert!(node.unconstrained_handler().is_none());
    }

    #[test]
    fn test_handlers_sorted_by_constraint_count() {
        let mut node = node();
        node.add_handler(
            Some("both"),
            Vec::new(),
            (),
            constraints(&[("host", "a.test"), ("version", "1.0.0")]),
        )
        .unwrap();
        node.add_handler(Some("host"), Vec::new(), (), constraints(&[("host", "b.test")]))
            .unwrap();
        node.add_handler(Some("free"), Vec::new(), (), constraints(&[]))
            .unwrap();
        node.add_handler(Some("host2"), Vec::new(), (), constraints(&[("host", "c.test")]))
            .unwrap();

        let order: Vec<_> = node.handlers().iter().map(|entry| entry.handler).collect();
        assert_eq!(order, vec!["free", "host", "host2", "both"]);
        assert_eq!(node.unconstrained_handler().map(|e| e.handler), Some("free"));
        assert!(node.has_constraints());
    }

    #[test]
    fn test_duplicate_constraints_rejected_without_mutation() {
        let mut node = node();
        node.add_handler(Some("a"), Vec::new(), (), constraints(&[("version", "1.0.0")]))
            .unwrap();
        let err = node
            .add_handler(Some("b"), Vec::new(), (), constraints(&[("version", "1.0.0")]))
            .unwrap_err();
        assert!(matches!(err, TreeError::DuplicateHandler { .. }));
        assert_eq!(node.handlers().len(), 1);
    }

    #[test]
    fn test_registration_invalidates_matcher() {
        let compiler = compiler();
        let mut node = node();
        node.add_handler(Some("v1"), Vec::new(), (), constraints(&[("version", "1.0.0")]))
            .unwrap();

        let derived = DerivedConstraints::new().with("version", "1.x").requiring_match();
        assert_eq!(
            node.get_matching_handler(&derived, &compiler).map(|e| e.handler),
            Some("v1")
        );
        assert!(node.is_compiled());

        node.add_handler(Some("v1.4"), Vec::new(), (), constraints(&[("version", "1.4.0")]))
            .unwrap();
        assert!(!node.is_compiled());
        assert_eq!(
            node.get_matching_handler(&derived, &compiler).map(|e| e.handler),
            Some("v1.4")
        );
    }

    #[test]
    fn test_unconstrained_node_honors_must_match() {
        let compiler = compiler();
        let mut node = node();
        node.add_handler(Some("free"), vec!["id".to_string()], (), constraints(&[]))
            .unwrap();

        let entry = node
            .get_matching_handler(&DerivedConstraints::new(), &compiler)
            .unwrap();
        assert_eq!(entry.handler, "free");
        assert_eq!(entry.params_length(), 1);

        let derived = DerivedConstraints::new().with("version", "1.0.0").requiring_match();
        assert!(node.get_matching_handler(&derived, &compiler).is_none());
        assert!(!node.is_compiled());
    }
}
