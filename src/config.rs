//! # Tree Configuration Module
//!
//! Configuration for the constraint matcher compiler, loaded from environment
//! variables or from a TOML fragment embedded in a router's own config file.
//!
//! ## Environment Variables
//!
//! ### `BRRTREE_EVALUATED_LAST`
//!
//! Name of the high-selectivity constraint the compiler evaluates after every
//! other constraint. Default: `version`.
//!
//! ### `BRRTREE_SLOW_COMPILE_US`
//!
//! Compile duration in microseconds above which a matcher compilation is
//! logged at `warn` level. Accepts decimal (`1000`) or hexadecimal (`0x3e8`).
//! Default: `1000` (1 ms).
//!
//! ## Usage
//!
//! ```rust
//! use brrtree::config::TreeConfig;
//!
//! let config = TreeConfig::from_env();
//! println!("evaluated last: {}", config.evaluated_last);
//! ```
//!
//! ## TOML
//!
//! ```toml
//! evaluated_last = "version"
//! slow_compile_us = 2000
//! ```

use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Default name of the constraint ordered last by the compiler
pub const DEFAULT_EVALUATED_LAST: &str = "version";

/// Default slow-compile threshold in microseconds
pub const DEFAULT_SLOW_COMPILE_US: u64 = 1_000;

/// Compiler configuration shared by every node of a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeConfig {
    /// Constraint name evaluated after all others (default: `version`)
    pub evaluated_last: String,
    /// Compilations slower than this are logged at `warn`
    pub slow_compile_threshold: Duration,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            evaluated_last: DEFAULT_EVALUATED_LAST.to_string(),
            slow_compile_threshold: Duration::from_micros(DEFAULT_SLOW_COMPILE_US),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTreeConfig {
    evaluated_last: Option<String>,
    slow_compile_us: Option<u64>,
}

impl From<RawTreeConfig> for TreeConfig {
    fn from(raw: RawTreeConfig) -> Self {
        let defaults = TreeConfig::default();
        Self {
            evaluated_last: raw
                .evaluated_last
                .filter(|name| !name.is_empty())
                .unwrap_or(defaults.evaluated_last),
            slow_compile_threshold: raw
                .slow_compile_us
                .map(Duration::from_micros)
                .unwrap_or(defaults.slow_compile_threshold),
        }
    }
}

impl TreeConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        let evaluated_last = env::var("BRRTREE_EVALUATED_LAST")
            .ok()
            .filter(|name| !name.is_empty());
        let slow_compile_us = env::var("BRRTREE_SLOW_COMPILE_US")
            .ok()
            .and_then(|val| parse_micros(&val));
        RawTreeConfig {
            evaluated_last,
            slow_compile_us,
        }
        .into()
    }

    /// Parse configuration from a TOML document.
    ///
    /// Missing keys take their defaults; unknown keys are rejected.
    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        let raw: RawTreeConfig = toml::from_str(source)?;
        Ok(raw.into())
    }

    /// Builder-style override of the constraint evaluated last
    #[must_use]
    pub fn with_evaluated_last(mut self, name: impl Into<String>) -> Self {
        self.evaluated_last = name.into();
        self
    }
}

fn parse_micros(val: &str) -> Option<u64> {
    let val = val.trim();
    match val.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => val.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TreeConfig::default();
        assert_eq!(config.evaluated_last, "version");
        assert_eq!(config.slow_compile_threshold, Duration::from_millis(1));
    }

    #[test]
    fn test_parse_micros_accepts_hex_and_decimal() {
        assert_eq!(parse_micros("1000"), Some(1000));
        assert_eq!(parse_micros("0x3e8"), Some(1000));
        assert_eq!(parse_micros("soon"), None);
    }

    #[test]
    fn test_from_toml_partial() {
        let config = TreeConfig::from_toml_str("slow_compile_us = 250\n").unwrap();
        assert_eq!(config.evaluated_last, "version");
        assert_eq!(config.slow_compile_threshold, Duration::from_micros(250));

        let config = TreeConfig::from_toml_str("evaluated_last = \"host\"\n").unwrap();
        assert_eq!(config.evaluated_last, "host");
    }

    #[test]
    fn test_from_toml_rejects_unknown_keys() {
        assert!(TreeConfig::from_toml_str("stack_size = 4\n").is_err());
    }
}
