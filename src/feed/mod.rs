//! Feed source seam.
//!
//! The poller talks to the feed only through [`FeedSource`], so cycles can
//! be driven by the real HTTP client ([`HttpFeed`]) or by a scripted source
//! in tests. A source performs exactly one request per call; it does not
//! retry and holds no state between calls.

pub mod http;

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{CompetitionId, Fetched};
use crate::error::FetchError;

pub use http::{HttpFeed, ProbeReport};

/// Path of the timings resource, relative to the feed base URL.
pub const TIMINGS_PATH: &str = "/vflmshop/timeline/get-timings/get-timings.json";

/// Path of the matches resource, relative to the feed base URL.
pub const MATCHES_PATH: &str = "/vflmshop/timeline/get-matches/get-matches.json";

/// Path segment of the per-match odds resource, relative to the odds base.
pub const ODDS_PATH: &str = "/match_odds2";

/// Builds the timings URL for a base such as `https://host`.
#[must_use]
pub fn timings_url(base: &str) -> String {
    format!("{}{TIMINGS_PATH}", base.trim_end_matches('/'))
}

/// Builds the matches URL for the given competition.
#[must_use]
pub fn matches_url(base: &str, competition_id: CompetitionId) -> String {
    format!(
        "{}{MATCHES_PATH}?competition_id={competition_id}",
        base.trim_end_matches('/')
    )
}

/// Builds the odds URL for one match.
#[must_use]
pub fn odds_url(odds_base: &str, match_id: i64) -> String {
    format!("{}{ODDS_PATH}/{match_id}", odds_base.trim_end_matches('/'))
}

/// Something that can fetch the two feed resources.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetches the timings document.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] on a non-200 status or a transport failure.
    async fn fetch_timings(&self) -> Result<Fetched, FetchError>;

    /// Fetches the matches document for one competition.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] on a non-200 status or a transport failure.
    async fn fetch_matches(&self, competition_id: CompetitionId) -> Result<Fetched, FetchError>;
}

#[async_trait]
impl<T: FeedSource + ?Sized> FeedSource for Arc<T> {
    async fn fetch_timings(&self) -> Result<Fetched, FetchError> {
        (**self).fetch_timings().await
    }

    async fn fetch_matches(&self, competition_id: CompetitionId) -> Result<Fetched, FetchError> {
        (**self).fetch_matches(competition_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timings_url_joins_base() {
        assert_eq!(
            timings_url("https://feed.example/"),
            "https://feed.example/vflmshop/timeline/get-timings/get-timings.json"
        );
    }

    #[test]
    fn matches_url_carries_competition() {
        assert_eq!(
            matches_url("http://127.0.0.1:8080", CompetitionId::new(43)),
            "http://127.0.0.1:8080/vflmshop/timeline/get-matches/get-matches.json?competition_id=43"
        );
    }

    #[test]
    fn odds_url_appends_match_id() {
        assert_eq!(
            odds_url("https://odds.example/feeds/?/cdn/gismo", 1234),
            "https://odds.example/feeds/?/cdn/gismo/match_odds2/1234"
        );
    }
}
