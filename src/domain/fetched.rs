//! Outcome of a successful HTTP exchange with the feed.

use serde_json::Value;

/// A `200 OK` body from either endpoint.
///
/// The feed occasionally serves bodies that are not valid JSON. Those are
/// kept as text instead of being dropped, so callers must decide how to
/// treat the degraded case.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    /// Body parsed as a JSON document.
    Decoded(Value),
    /// Body was not valid JSON; the raw text is preserved.
    RawFallback(String),
}

impl Fetched {
    /// Classifies a response body.
    #[must_use]
    pub fn from_body(body: &str) -> Self {
        match serde_json::from_str(body) {
            Ok(doc) => Self::Decoded(doc),
            Err(_) => Self::RawFallback(body.to_string()),
        }
    }

    /// Returns `true` when the body could not be decoded.
    #[must_use]
    pub const fn is_raw(&self) -> bool {
        matches!(self, Self::RawFallback(_))
    }

    /// Converts into a JSON document. Raw text is wrapped as
    /// `{"raw": "<text>"}`.
    #[must_use]
    pub fn into_document(self) -> Value {
        match self {
            Self::Decoded(doc) => doc,
            Self::RawFallback(text) => serde_json::json!({ "raw": text }),
        }
    }
}
