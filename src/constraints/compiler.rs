//! Constraint matcher compiler.
//!
//! Turns a node's handler list into a [`CompiledMatcher`]: an ordered list of
//! constraint steps, each carrying a value-to-bitmask store and a fixed
//! "don't care" mask. Selecting a handler then costs one store lookup and
//! one AND per constraint name, independent of the number of handlers.
//!
//! ```text
//! candidates = all handlers
//! for step in steps:
//!     value absent          -> candidates &= dont_care
//!     value present         -> candidates &= matches | dont_care
//!     candidates == 0       -> no match
//! winner = lowest set bit
//! ```
//!
//! A request that must match (its derived flag is set, or it carries a value
//! for a must-match constraint such as `version`) starts without the node's
//! unconstrained handler among the candidates.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use super::constrainer::Constrainer;
use super::derived::DerivedConstraints;
use super::store::{all_handlers, ConstraintStore, HandlerMask, MAX_CONSTRAINED_HANDLERS};
use crate::config::TreeConfig;
use crate::handlers::Constraints;

struct ConstraintStep {
    name: String,
    store: Box<dyn ConstraintStore>,
    dont_care: HandlerMask,
}

/// Decision procedure specialised to one node's handler list.
pub struct CompiledMatcher {
    steps: Vec<ConstraintStep>,
    must_match_names: Vec<String>,
    all: HandlerMask,
    unconstrained: HandlerMask,
}

impl fmt::Debug for CompiledMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledMatcher")
            .field("constraints", &self.constraint_names().collect::<Vec<_>>())
            .field("all", &format_args!("{:#b}", self.all))
            .finish()
    }
}

impl CompiledMatcher {
    /// Index of the selected handler, or `None` when no handler fits
    #[inline]
    #[must_use]
    pub fn select(&self, derived: &DerivedConstraints) -> Option<usize> {
        let mut candidates = self.all;
        if self.demands_match(derived) {
            candidates &= !self.unconstrained;
        }
        for step in &self.steps {
            match derived.get(&step.name) {
                None => candidates &= step.dont_care,
                Some(value) => {
                    let matches = step.store.get(value).unwrap_or(0);
                    candidates &= matches | step.dont_care;
                }
            }
            if candidates == 0 {
                return None;
            }
        }
        if candidates == 0 {
            None
        } else {
            Some(candidates.trailing_zeros() as usize)
        }
    }

    /// Whether `derived` forbids falling back to an unconstrained handler
    #[inline]
    #[must_use]
    pub fn demands_match(&self, derived: &DerivedConstraints) -> bool {
        derived.must_match()
            || self
                .must_match_names
                .iter()
                .any(|name| derived.get(name).is_some())
    }

    /// Constraint names in evaluation order
    pub fn constraint_names(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|step| step.name.as_str())
    }

    /// Number of handlers the matcher was compiled for
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.all.count_ones() as usize
    }
}

/// Builds [`CompiledMatcher`]s for every node of a tree.
#[derive(Clone)]
pub struct MatcherCompiler {
    constrainer: Arc<dyn Constrainer>,
    config: TreeConfig,
}

impl fmt::Debug for MatcherCompiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatcherCompiler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl MatcherCompiler {
    pub fn new(constrainer: Arc<dyn Constrainer>, config: TreeConfig) -> Self {
        Self {
            constrainer,
            config,
        }
    }

    pub fn constrainer(&self) -> &dyn Constrainer {
        self.constrainer.as_ref()
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Compile a matcher for handlers whose constraint maps are given in
    /// handler-index order.
    ///
    /// At most [`MAX_CONSTRAINED_HANDLERS`] handlers are considered; the
    /// registry refuses to grow a constrained node past that.
    pub fn compile(&self, handlers: &[&Constraints]) -> CompiledMatcher {
        let started = Instant::now();
        let handlers = &handlers[..handlers.len().min(MAX_CONSTRAINED_HANDLERS)];

        let mut names: Vec<&str> = Vec::new();
        for constraints in handlers {
            for name in constraints.keys() {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        let last = self.config.evaluated_last.as_str();
        if let Some(pos) = names.iter().position(|name| *name == last) {
            let name = names.remove(pos);
            names.push(name);
        }

        let steps: Vec<ConstraintStep> = names
            .iter()
            .map(|&name| {
                let mut by_value: HashMap<&str, HandlerMask> = HashMap::new();
                let mut governed: HandlerMask = 0;
                for (index, constraints) in handlers.iter().enumerate() {
                    if let Some(value) = constraints.get(name) {
                        let bit = 1 << index;
                        governed |= bit;
                        *by_value.entry(value.as_str()).or_insert(0) |= bit;
                    }
                }
                let mut store = self.constrainer.new_store_for_constraint(name);
                for (value, mask) in by_value {
                    store.set(value, mask);
                }
                ConstraintStep {
                    name: name.to_string(),
                    store,
                    dont_care: !governed,
                }
            })
            .collect();
        let must_match_names = names
            .iter()
            .filter(|name| self.constrainer.must_match_when_derived(name))
            .map(|name| name.to_string())
            .collect();

        let matcher = CompiledMatcher {
            steps,
            must_match_names,
            all: all_handlers(handlers.len()),
            unconstrained: handlers
                .iter()
                .position(|constraints| constraints.is_empty())
                .map_or(0, |index| 1 << index),
        };

        let elapsed = started.elapsed();
        if elapsed > self.config.slow_compile_threshold {
            warn!(
                handlers = handlers.len(),
                constraints = matcher.steps.len(),
                duration_us = elapsed.as_micros(),
                "Slow constraint matcher compilation detected"
            );
        } else {
            debug!(
                handlers = handlers.len(),
                constraints = matcher.steps.len(),
                duration_us = elapsed.as_micros(),
                "Constraint matcher compiled"
            );
        }
        matcher
    }
}
