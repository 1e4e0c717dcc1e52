//! Value-to-bitmask lookup tables used by the compiled matcher.

use std::collections::HashMap;

/// One bit per handler index on a node.
pub type HandlerMask = u32;

/// Bitmask width, and therefore the cap on handlers at a constrained node.
pub const MAX_CONSTRAINED_HANDLERS: usize = HandlerMask::BITS as usize;

/// Mask with the low `count` bits set.
///
/// `count` must not exceed [`MAX_CONSTRAINED_HANDLERS`].
#[inline]
#[must_use]
pub const fn all_handlers(count: usize) -> HandlerMask {
    if count >= MAX_CONSTRAINED_HANDLERS {
        HandlerMask::MAX
    } else {
        (1 << count) - 1
    }
}

/// Lookup table from a constraint value to the handlers requiring it.
///
/// Implementations decide what "equal" means for their constraint type: an
/// exact string comparison, a semantic-version range, a host pattern, and
/// so on. The compiler only ever calls `set` with values taken verbatim from
/// registered handlers, and `get` with values derived from requests.
pub trait ConstraintStore: Send + Sync {
    /// Mask of handlers accepting `value`, if any
    fn get(&self, value: &str) -> Option<HandlerMask>;

    /// Record `mask` for a registered `value`, replacing any previous mask
    fn set(&mut self, value: &str, mask: HandlerMask);
}

/// Plain string-equality store, used for constraints without a dedicated strategy
#[derive(Debug, Default, Clone)]
pub struct ExactStore {
    values: HashMap<String, HandlerMask>,
}

impl ExactStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConstraintStore for ExactStore {
    #[inline]
    fn get(&self, value: &str) -> Option<HandlerMask> {
        self.values.get(value).copied()
    }

    fn set(&mut self, value: &str, mask: HandlerMask) {
        self.values.insert(value.to_string(), mask);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_handlers_mask() {
        assert_eq!(all_handlers(0), 0);
        assert_eq!(all_handlers(1), 0b1);
        assert_eq!(all_handlers(3), 0b111);
        assert_eq!(all_handlers(32), u32::MAX);
    }

    #[test]
    fn test_exact_store_is_case_sensitive() {
        let mut store = ExactStore::new();
        store.set("Mobile", 0b10);
        assert_eq!(store.get("Mobile"), Some(0b10));
        assert_eq!(store.get("mobile"), None);

        store.set("Mobile", 0b110);
        assert_eq!(store.get("Mobile"), Some(0b110));
    }
}
