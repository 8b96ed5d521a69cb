//! Line-log record shapes.

use serde::Serialize;
use serde_json::Value;

use crate::domain::{CompetitionId, MatchesSnapshot, TimingsSnapshot};

/// One self-contained line of the structured log.
///
/// ```json
/// {"type": "timings", "server_datetime": 998, "payload": {...}}
/// {"type": "matches", "competition_id": 42, "payload": {...}}
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LineRecord<'a> {
    /// An accepted timings change.
    Timings {
        /// Feed clock at capture time, `null` if absent.
        server_datetime: Option<i64>,
        /// Raw timings document.
        payload: &'a Value,
    },
    /// An accepted matches change.
    Matches {
        /// Competition the matches were fetched for.
        competition_id: CompetitionId,
        /// Raw matches document.
        payload: &'a Value,
    },
}

impl<'a> LineRecord<'a> {
    /// Record for a timings snapshot.
    #[must_use]
    pub fn timings(snapshot: &'a TimingsSnapshot) -> Self {
        Self::Timings {
            server_datetime: snapshot.server_datetime(),
            payload: snapshot.document(),
        }
    }

    /// Record for a matches snapshot.
    #[must_use]
    pub fn matches(competition_id: CompetitionId, snapshot: &'a MatchesSnapshot) -> Self {
        Self::Matches {
            competition_id,
            payload: snapshot.document(),
        }
    }

    /// Serializes the record as a single line, newline included.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if the payload cannot be encoded.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}
