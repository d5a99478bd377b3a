//! Caller identity
//!
//! Identity resolution itself lives outside this system; the core only
//! sees an opaque principal used to scope conversations and quota.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Principal {
    /// Authenticated account identifier.
    Account(String),
    /// Anonymous device fingerprint hash.
    Fingerprint(String),
}

impl Principal {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Principal::Fingerprint(_))
    }

    /// Stable key for quota counters and session grouping.
    pub fn key(&self) -> &str {
        match self {
            Principal::Account(id) | Principal::Fingerprint(id) => id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_anonymous() {
        assert!(Principal::Fingerprint("abc".into()).is_anonymous());
        assert!(!Principal::Account("u1".into()).is_anonymous());
    }

    #[test]
    fn key_returns_inner_id() {
        assert_eq!(Principal::Account("u1".into()).key(), "u1");
    }
}
