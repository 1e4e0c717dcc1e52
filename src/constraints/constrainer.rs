//! The constrainer: per-constraint-type semantics consumed by the compiler.

use http::request::Parts;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::derived::DerivedConstraints;
use super::host::HostStrategy;
use super::store::{ConstraintStore, ExactStore};
use super::version::VersionStrategy;
use crate::error::TreeError;
use crate::handlers::Constraints;

/// Supplies constraint-type-aware stores to the matcher compiler.
pub trait Constrainer: Send + Sync {
    /// Empty value-to-bitmask table honoring `name`'s equality semantics
    fn new_store_for_constraint(&self, name: &str) -> Box<dyn ConstraintStore>;

    /// Whether a derived value for `name` excludes handlers that do not
    /// constrain `name` at all
    fn must_match_when_derived(&self, _name: &str) -> bool {
        false
    }

    /// Whether `value` is acceptable as a registered requirement for `name`
    fn validate_value(&self, _name: &str, _value: &str) -> bool {
        true
    }
}

/// One constraint type: how to store registered values and how to derive a
/// request's value.
pub trait ConstraintStrategy: Send + Sync {
    /// Constraint name as used in handler constraint maps
    fn name(&self) -> &'static str;

    /// Fresh lookup table for this constraint type
    fn new_store(&self) -> Box<dyn ConstraintStore>;

    /// See [`Constrainer::must_match_when_derived`]
    fn must_match_when_derived(&self) -> bool {
        false
    }

    /// Extract this constraint's value from a request
    fn derive(&self, request: &Parts) -> Option<String>;

    /// Registration-time check of a required value
    fn validate(&self, _value: &str) -> bool {
        true
    }
}

/// Strategy-table constrainer with `version` and `host` built in.
///
/// Constraint names without a registered strategy are compared verbatim and
/// never derived from requests; callers supply them through
/// [`DerivedConstraints::insert`].
#[derive(Clone)]
pub struct StrategyConstrainer {
    strategies: HashMap<&'static str, Arc<dyn ConstraintStrategy>>,
}

impl fmt::Debug for StrategyConstrainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.strategies.keys().collect();
        names.sort();
        f.debug_struct("StrategyConstrainer")
            .field("strategies", &names)
            .finish()
    }
}

impl Default for StrategyConstrainer {
    fn default() -> Self {
        Self::new()
    }
}

impl StrategyConstrainer {
    /// Constrainer with the built-in `version` and `host` strategies
    #[must_use]
    pub fn new() -> Self {
        Self::empty()
            .with_strategy(VersionStrategy)
            .with_strategy(HostStrategy)
    }

    /// Constrainer without any strategy; every constraint is exact-match
    #[must_use]
    pub fn empty() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    /// Register or replace the strategy for `strategy.name()`
    #[must_use]
    pub fn with_strategy(mut self, strategy: impl ConstraintStrategy + 'static) -> Self {
        self.strategies.insert(strategy.name(), Arc::new(strategy));
        self
    }

    pub fn strategy(&self, name: &str) -> Option<&Arc<dyn ConstraintStrategy>> {
        self.strategies.get(name)
    }

    /// Derive every strategy's value from a request.
    ///
    /// The must-match flag is raised if any must-match strategy produced a
    /// value.
    pub fn derive_constraints(&self, request: &Parts) -> DerivedConstraints {
        let mut derived = DerivedConstraints::new();
        for (name, strategy) in &self.strategies {
            if let Some(value) = strategy.derive(request) {
                if strategy.must_match_when_derived() {
                    derived.set_must_match(true);
                }
                derived.insert(*name, value);
            }
        }
        derived
    }

    /// Check every registered requirement against its strategy
    pub fn validate_constraints(&self, constraints: &Constraints) -> Result<(), TreeError> {
        for (name, value) in constraints {
            if !self.validate_value(name, value) {
                return Err(TreeError::InvalidConstraintValue {
                    name: name.clone(),
                    value: value.clone(),
                });
            }
        }
        Ok(())
    }
}

impl Constrainer for StrategyConstrainer {
    fn new_store_for_constraint(&self, name: &str) -> Box<dyn ConstraintStore> {
        match self.strategies.get(name) {
            Some(strategy) => strategy.new_store(),
            None => Box::new(ExactStore::new()),
        }
    }

    fn must_match_when_derived(&self, name: &str) -> bool {
        self.strategies
            .get(name)
            .is_some_and(|strategy| strategy.must_match_when_derived())
    }

    fn validate_value(&self, name: &str, value: &str) -> bool {
        self.strategies
            .get(name)
            .map_or(true, |strategy| strategy.validate(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DeviceStrategy;

    impl ConstraintStrategy for DeviceStrategy {
        fn name(&self) -> &'static str {
            "device"
        }

        fn new_store(&self) -> Box<dyn ConstraintStore> {
            Box::new(ExactStore::new())
        }

        fn derive(&self, request: &Parts) -> Option<String> {
            request
                .headers
                .get("x-device")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        }

        fn validate(&self, value: &str) -> bool {
            matches!(value, "mobile" | "desktop")
        }
    }

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = http::Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_derive_sets_must_match_only_for_version() {
        let constrainer = StrategyConstrainer::new();

        let derived = constrainer.derive_constraints(&parts(&[("host", "a.test")]));
        assert_eq!(derived.get("host"), Some("a.test"));
        assert!(!derived.must_match());

        let derived = constrainer.derive_constraints(&parts(&[("accept-version", "1.x")]));
        assert_eq!(derived.get("version"), Some("1.x"));
        assert!(derived.must_match());
    }

    #[test]
    fn test_custom_strategy_validation() {
        let constrainer = StrategyConstrainer::new().with_strategy(DeviceStrategy);

        let ok: Constraints = [("device".to_string(), "mobile".to_string())].into();
        assert!(constrainer.validate_constraints(&ok).is_ok());

        let bad: Constraints = [("device".to_string(), "fridge".to_string())].into();
        assert_eq!(
            constrainer.validate_constraints(&bad),
            Err(TreeError::InvalidConstraintValue {
                name: "device".to_string(),
                value: "fridge".to_string(),
            })
        );

        let derived = constrainer.derive_constraints(&parts(&[("x-device", "desktop")]));
        assert_eq!(derived.get("device"), Some("desktop"));
    }

    #[test]
    fn test_unknown_constraint_falls_back_to_exact_store() {
        let constrainer = StrategyConstrainer::empty();
        let mut store = constrainer.new_store_for_constraint("tenant");
        store.set("acme", 0b1);
        assert_eq!(store.get("acme"), Some(0b1));
        assert!(!constrainer.must_match_when_derived("tenant"));
        assert!(constrainer.validate_value("tenant", ""));
    }
}
