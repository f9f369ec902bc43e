//! Strongly-typed identifiers
//!
//! The server keys both credential rows and review items by 64-bit integers.
//! They are wrapped in newtypes so a credential id can never be passed where a
//! review item id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a stored credential (valid or rate-limited)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialId(i64);

impl CredentialId {
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for CredentialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CredentialId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Identifier of a security finding in the review queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewItemId(i64);

impl ReviewItemId {
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ReviewItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl FromStr for ReviewItemId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().trim_start_matches('#').parse().map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_id_parse_accepts_hash_prefix() {
        assert_eq!("#42".parse::<ReviewItemId>().unwrap(), ReviewItemId::new(42));
        assert_eq!(" 7 ".parse::<ReviewItemId>().unwrap(), ReviewItemId::new(7));
    }

    #[test]
    fn test_ids_serialize_as_plain_integers() {
        let json = serde_json::to_string(&CredentialId::new(9)).unwrap();
        assert_eq!(json, "9");
    }
}
