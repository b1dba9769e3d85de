//! Identifiers for fleet members
//!
//! Members are named rather than UUID-keyed so log lines stay readable; a
//! generated name is available when the caller has nothing better.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of one supervised connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemberId(String);

impl MemberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Name the `index`-th member of a fleet, e.g. `member-3`.
    pub fn indexed(index: usize) -> Self {
        Self(format!("member-{}", index))
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Delegate to str so width/alignment flags apply.
        fmt::Display::fmt(self.0.as_str(), f)
    }
}

impl From<&str> for MemberId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexed_names() {
        assert_eq!(MemberId::indexed(0).as_str(), "member-0");
        assert_eq!(MemberId::indexed(42).to_string(), "member-42");
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(MemberId::generate(), MemberId::generate());
    }

    #[test]
    fn test_display_honours_padding() {
        let id = MemberId::new("m-1");
        assert_eq!(format!("{:<6}|", id), "m-1   |");
    }
}
