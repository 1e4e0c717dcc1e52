//! Semantic-version constraint strategy.
//!
//! Handlers register exact versions (`1.2.3`). Requests may ask for an exact
//! version or a range (`1.2.x`, `1.2`, `1.x`, `1`, `*`); the highest
//! registered version inside the range wins. Registered values that are not
//! plain `major.minor.patch` triples are matched verbatim.

use http::request::Parts;
use std::collections::{BTreeMap, HashMap};

use super::constrainer::ConstraintStrategy;
use super::store::{ConstraintStore, HandlerMask};

/// Request header carrying the requested version
pub const ACCEPT_VERSION: &str = "accept-version";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct Version {
    major: u64,
    minor: u64,
    patch: u64,
}

impl Version {
    const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VersionQuery {
    Any,
    Major(u64),
    Minor(u64, u64),
    Exact(Version),
}

fn is_wildcard(part: &str) -> bool {
    matches!(part, "x" | "X" | "*")
}

fn parse_exact(value: &str) -> Option<Version> {
    match parse_query(value)? {
        VersionQuery::Exact(version) => Some(version),
        _ => None,
    }
}

fn parse_query(value: &str) -> Option<VersionQuery> {
    let value = value.trim();
    if is_wildcard(value) {
        return Some(VersionQuery::Any);
    }

    let mut parts = value.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = match parts.next() {
        None => return Some(VersionQuery::Major(major)),
        Some(part) if is_wildcard(part) => return Some(VersionQuery::Major(major)),
        Some(part) => part.parse().ok()?,
    };
    let patch = match parts.next() {
        None => return Some(VersionQuery::Minor(major, minor)),
        Some(part) if is_wildcard(part) => return Some(VersionQuery::Minor(major, minor)),
        Some(part) => part.parse().ok()?,
    };
    if parts.next().is_some() {
        return None;
    }
    Some(VersionQuery::Exact(Version::new(major, minor, patch)))
}

/// Version-range aware store
#[derive(Debug, Default, Clone)]
pub struct SemVerStore {
    versions: BTreeMap<Version, HandlerMask>,
    verbatim: HashMap<String, HandlerMask>,
}

impl SemVerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn highest_in(&self, low: Version, high: Version) -> Option<HandlerMask> {
        self.versions
            .range(low..=high)
            .next_back()
            .map(|(_, mask)| *mask)
    }
}

impl ConstraintStore for SemVerStore {
    fn get(&self, value: &str) -> Option<HandlerMask> {
        if let Some(mask) = self.verbatim.get(value) {
            return Some(*mask);
        }
        match parse_query(value)? {
            VersionQuery::Any => self.versions.values().next_back().copied(),
            VersionQuery::Major(major) => {
                self.highest_in(Version::new(major, 0, 0), Version::new(major, u64::MAX, u64::MAX))
            }
            VersionQuery::Minor(major, minor) => {
                self.highest_in(Version::new(major, minor, 0), Version::new(major, minor, u64::MAX))
            }
            VersionQuery::Exact(version) => self.versions.get(&version).copied(),
        }
    }

    fn set(&mut self, value: &str, mask: HandlerMask) {
        match parse_exact(value) {
            Some(version) => {
                self.versions.insert(version, mask);
            }
            None => {
                self.verbatim.insert(value.to_string(), mask);
            }
        }
    }
}

/// Built-in `version` strategy reading the `Accept-Version` header.
///
/// A request that declares a version must be served by a handler registered
/// for it: unversioned handlers never act as a fallback.
#[derive(Debug, Default, Clone, Copy)]
pub struct VersionStrategy;

impl ConstraintStrategy for VersionStrategy {
    fn name(&self) -> &'static str {
        "version"
    }

    fn new_store(&self) -> Box<dyn ConstraintStore> {
        Box::new(SemVerStore::new())
    }

    fn must_match_when_derived(&self) -> bool {
        true
    }

    fn derive(&self, request: &Parts) -> Option<String> {
        request
            .headers
            .get(ACCEPT_VERSION)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    fn validate(&self, value: &str) -> bool {
        !value.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(versions: &[(&str, HandlerMask)]) -> SemVerStore {
        let mut store = SemVerStore::new();
        for (version, mask) in versions {
            store.set(version, *mask);
        }
        store
    }

    #[test]
    fn test_parse_query_shapes() {
        assert_eq!(parse_query("*"), Some(VersionQuery::Any));
        assert_eq!(parse_query("2"), Some(VersionQuery::Major(2)));
        assert_eq!(parse_query("2.x"), Some(VersionQuery::Major(2)));
        assert_eq!(parse_query("2.1"), Some(VersionQuery::Minor(2, 1)));
        assert_eq!(parse_query("2.1.X"), Some(VersionQuery::Minor(2, 1)));
        assert_eq!(
            parse_query("2.1.7"),
            Some(VersionQuery::Exact(Version::new(2, 1, 7)))
        );
        assert_eq!(parse_query("2.1.7.1"), None);
        assert_eq!(parse_query("beta"), None);
    }

    #[test]
    fn test_exact_lookup() {
        let store = store(&[("1.0.0", 0b01), ("1.2.0", 0b10)]);
        assert_eq!(store.get("1.0.0"), Some(0b01));
        assert_eq!(store.get("1.2.0"), Some(0b10));
        assert_eq!(store.get("1.1.0"), None);
    }

    #[test]
    fn test_range_lookup_prefers_highest() {
        let store = store(&[("1.0.0", 0b001), ("1.2.0", 0b010), ("1.2.4", 0b100)]);
        assert_eq!(store.get("1.x"), Some(0b100));
        assert_eq!(store.get("1"), Some(0b100));
        assert_eq!(store.get("1.0.x"), Some(0b001));
        assert_eq!(store.get("1.2"), Some(0b100));
        assert_eq!(store.get("*"), Some(0b100));
        assert_eq!(store.get("2.x"), None);
    }

    #[test]
    fn test_non_semver_values_match_verbatim() {
        let store = store(&[("beta", 0b1)]);
        assert_eq!(store.get("beta"), Some(0b1));
        assert_eq!(store.get("*"), None);
    }

    #[test]
    fn test_derive_reads_accept_version() {
        let (parts, _) = http::Request::builder()
            .header("Accept-Version", " 1.x ")
            .body(())
            .unwrap()
            .into_parts();
        assert_eq!(VersionStrategy.derive(&parts).as_deref(), Some("1.x"));

        let (parts, _) = http::Request::builder().body(()).unwrap().into_parts();
        assert_eq!(VersionStrategy.derive(&parts), None);
    }
}
