//! Per-request constraint values.

#![deny(clippy::inefficient_to_string)]
#![deny(clippy::unnecessary_to_owned)]

use smallvec::SmallVec;
use std::borrow::Cow;

/// Number of derived constraints stored inline before spilling to the heap.
/// Requests rarely carry more than a version and a host.
pub const MAX_INLINE_CONSTRAINTS: usize = 4;

/// Stack-allocated `(name, value)` storage for derived constraints.
pub type ConstraintVec = SmallVec<[(Cow<'static, str>, String); MAX_INLINE_CONSTRAINTS]>;

/// Constraint values derived from one request, plus the must-match flag.
///
/// The must-match flag is raised when a strategy that refuses unconstrained
/// fallbacks (the version strategy) derived a value. A node with only an
/// unconstrained handler then reports no match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivedConstraints {
    values: ConstraintVec,
    must_match: bool,
}

impl DerivedConstraints {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Value derived for `name`, if any
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set the value for `name`, replacing an earlier one
    pub fn insert(&mut self, name: impl Into<Cow<'static, str>>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.values.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name, value)),
        }
    }

    /// Builder-style [`insert`](Self::insert)
    #[must_use]
    pub fn with(mut self, name: impl Into<Cow<'static, str>>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    #[inline]
    #[must_use]
    pub fn must_match(&self) -> bool {
        self.must_match
    }

    pub fn set_must_match(&mut self, must_match: bool) {
        self.must_match = must_match;
    }

    /// Builder-style [`set_must_match`](Self::set_must_match)
    #[must_use]
    pub fn requiring_match(mut self) -> Self {
        self.must_match = true;
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_ref(), v.as_str()))
    }
}

impl<N, V> FromIterator<(N, V)> for DerivedConstraints
where
    N: Into<Cow<'static, str>>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut derived = Self::new();
        for (name, value) in iter {
            derived.insert(name, value);
        }
        derived
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replaces_existing_value() {
        let mut derived = DerivedConstraints::new().with("version", "1.0.0");
        derived.insert("version", "2.0.0");
        assert_eq!(derived.get("version"), Some("2.0.0"));
        assert_eq!(derived.iter().count(), 1);
    }

    #[test]
    fn test_from_iter_and_must_match() {
        let derived: DerivedConstraints = [("host", "a.test"), ("version", "1.x")]
            .into_iter()
            .collect();
        assert_eq!(derived.get("host"), Some("a.test"));
        assert_eq!(derived.get("missing"), None);
        assert!(!derived.must_match());
        assert!(derived.requiring_match().must_match());
    }
}
