use serde::{Deserialize, Serialize};
use std::fmt;

/// Content hash of a bar series (BLAKE3, hex).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetHash(pub String);

/// Exact identity of a strategy configuration: kind, mode, exit order and every parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FullHash(pub String);

impl FullHash {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes).to_hex().to_string())
    }

    /// First 12 hex characters, enough to tell grid rows apart in a table.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for DatasetHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for FullHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_hash_is_deterministic() {
        assert_eq!(FullHash::from_bytes(b"extreme"), FullHash::from_bytes(b"extreme"));
        assert_ne!(FullHash::from_bytes(b"extreme"), FullHash::from_bytes(b"layered"));
    }

    #[test]
    fn short_form_is_a_prefix() {
        let h = FullHash::from_bytes(b"momentum");
        assert_eq!(h.short().len(), 12);
        assert!(h.0.starts_with(h.short()));
    }
}
