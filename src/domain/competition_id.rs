//! Competition identifier.
//!
//! [`CompetitionId`] is the join key between a timings snapshot and the
//! matches snapshot fetched for it. It is a newtype so it cannot be
//! confused with match, channel or club ids, which are plain integers in
//! the feed as well.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Numeric id of the currently active competition (season).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompetitionId(i64);

impl CompetitionId {
    /// Wraps a raw competition id.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw integer value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for CompetitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for CompetitionId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<CompetitionId> for i64 {
    fn from(id: CompetitionId) -> Self {
        id.0
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn display_is_plain_integer() {
        assert_eq!(CompetitionId::new(42).to_string(), "42");
    }

    #[test]
    fn serializes_transparently() {
        let json = serde_json::to_string(&CompetitionId::new(43)).ok();
        assert_eq!(json.as_deref(), Some("43"));
    }

    #[test]
    fn converts_both_ways() {
        let id = CompetitionId::from(7);
        assert_eq!(i64::from(id), 7);
        assert_eq!(id.get(), 7);
    }
}
