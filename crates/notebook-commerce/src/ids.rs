//! Newtype IDs for type-safe identifiers.
//!
//! Using newtypes prevents accidentally mixing up different ID types,
//! e.g., passing an AdminId where a cart session is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Numeric catalog identifier.
///
/// Products are numbered sequentially; a new product without an explicit id
/// takes the highest existing id plus one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct ProductId(u64);

impl ProductId {
    /// Create a new ID.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw number.
    pub const fn get(&self) -> u64 {
        self.0
    }

    /// The id that follows this one.
    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ProductId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl FromStr for ProductId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Macro to generate string newtype ID structs.
macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        /// A unique identifier.
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from a string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generate a new unique ID.
            pub fn generate() -> Self {
                Self(generate_id($prefix))
            }

            /// Get the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner string.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(AdminId, "adm");
define_id!(CartSessionId, "cart");

impl CartSessionId {
    /// Maximum accepted length of a client-chosen session id.
    pub const MAX_LEN: usize = 64;

    /// Validate a client-supplied session id.
    ///
    /// Session ids end up inside storage keys, so only ASCII alphanumerics,
    /// `-` and `_` are accepted.
    pub fn parse(raw: &str) -> Option<Self> {
        let valid = !raw.is_empty()
            && raw.len() <= Self::MAX_LEN
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        valid.then(|| Self(raw.to_string()))
    }
}

/// Generate a unique ID from timestamp and a process-wide counter.
fn generate_id(prefix: &str) -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let counter = COUNTER.fetch_add(1, Ordering::SeqCst);

    format!("{}_{:x}{:04x}", prefix, timestamp, counter & 0xffff)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_id_parse() {
        let id: ProductId = "42".parse().unwrap();
        assert_eq!(id.get(), 42);
        assert_eq!(id.next(), ProductId::new(43));
        assert!("abc".parse::<ProductId>().is_err());
    }

    #[test]
    fn test_product_id_json_is_number() {
        assert_eq!(serde_json::to_string(&ProductId::new(7)).unwrap(), "7");
    }

    #[test]
    fn test_id_generation() {
        let id1 = AdminId::generate();
        let id2 = AdminId::generate();
        assert_ne!(id1, id2);
        assert!(id1.as_str().starts_with("adm_"));
    }

    #[test]
    fn test_id_display() {
        let id = AdminId::new("adm-789");
        assert_eq!(format!("{}", id), "adm-789");
    }

    #[test]
    fn test_cart_session_validation() {
        assert!(CartSessionId::parse("guest_01-abc").is_some());
        assert!(CartSessionId::parse("").is_none());
        assert!(CartSessionId::parse("../etc").is_none());
        assert!(CartSessionId::parse(&"a".repeat(65)).is_none());
    }
}
