//! Host constraint strategy.
//!
//! Hosts compare case-insensitively. A registered value containing `*` is a
//! pattern where each `*` stands for exactly one DNS label, so
//! `*.example.com` accepts `api.example.com` but neither `example.com` nor
//! `a.b.example.com`. Exact hosts always win over patterns; patterns are
//! tried in registration order.

use http::header::HOST;
use http::request::Parts;
use regex::Regex;
use std::collections::HashMap;
use tracing::warn;

use super::constrainer::ConstraintStrategy;
use super::store::{ConstraintStore, HandlerMask};

fn pattern_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("[^.]+");
    Regex::new(&format!("(?i)^{body}$"))
}

/// Exact-then-pattern host store
#[derive(Debug, Default, Clone)]
pub struct HostStore {
    exact: HashMap<String, HandlerMask>,
    patterns: Vec<(String, Regex, HandlerMask)>,
}

impl HostStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn set_exact(&mut self, host: &str, mask: HandlerMask) {
        self.exact.insert(host.to_ascii_lowercase(), mask);
    }
}

impl ConstraintStore for HostStore {
    fn get(&self, host: &str) -> Option<HandlerMask> {
        let exact = if host.bytes().any(|b| b.is_ascii_uppercase()) {
            self.exact.get(&host.to_ascii_lowercase())
        } else {
            self.exact.get(host)
        };
        if let Some(mask) = exact {
            return Some(*mask);
        }
        self.patterns
            .iter()
            .find(|(_, regex, _)| regex.is_match(host))
            .map(|(_, _, mask)| *mask)
    }

    fn set(&mut self, host: &str, mask: HandlerMask) {
        if !host.contains('*') {
            self.set_exact(host, mask);
            return;
        }
        if let Some(entry) = self
            .patterns
            .iter_mut()
            .find(|(source, _, _)| source.eq_ignore_ascii_case(host))
        {
            entry.2 = mask;
            return;
        }
        match pattern_regex(host) {
            Ok(regex) => self.patterns.push((host.to_string(), regex, mask)),
            Err(err) => {
                warn!(host = %host, error = %err, "Host pattern failed to compile, matching verbatim");
                self.set_exact(host, mask);
            }
        }
    }
}

/// Built-in `host` strategy reading the `Host` header (or the URI authority)
#[derive(Debug, Default, Clone, Copy)]
pub struct HostStrategy;

impl ConstraintStrategy for HostStrategy {
    fn name(&self) -> &'static str {
        "host"
    }

    fn new_store(&self) -> Box<dyn ConstraintStore> {
        Box::new(HostStore::new())
    }

    fn derive(&self, request: &Parts) -> Option<String> {
        request
            .headers
            .get(HOST)
            .and_then(|value| value.to_str().ok())
            .or_else(|| request.uri.authority().map(|authority| authority.as_str()))
            .filter(|host| !host.is_empty())
            .map(str::to_string)
    }

    fn validate(&self, value: &str) -> bool {
        !value.is_empty() && (!value.contains('*') || pattern_regex(value).is_ok())
    }
}
