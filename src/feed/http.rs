//! `reqwest`-backed feed client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use super::{FeedSource, matches_url, odds_url, timings_url};
use crate::config::FeedConfig;
use crate::domain::{CompetitionId, Fetched};
use crate::error::{ConfigError, FetchError};

/// Result of a bare reachability probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    /// Probed URL.
    pub url: String,
    /// HTTP status returned.
    pub status: u16,
    /// Body length in bytes.
    pub bytes: usize,
    /// Body text, lossily decoded.
    pub body: String,
}

impl ProbeReport {
    /// `true` when the endpoint answered `200 OK`.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == StatusCode::OK.as_u16()
    }
}

/// HTTP client for the two feed endpoints.
#[derive(Debug, Clone)]
pub struct HttpFeed {
    client: Client,
    base_url: String,
    odds_base_url: String,
}

impl HttpFeed {
    /// Builds a client with the configured timeout and user agent.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HttpClient`] if the TLS backend cannot be
    /// initialised.
    pub fn new(config: &FeedConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            odds_base_url: config.odds_base_url.clone(),
        })
    }

    /// Base URL both endpoints are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GETs `url` and returns the body text of a `200 OK` response.
    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Fetches the `match_odds2` document of one match.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] on a non-200 status or a transport failure.
    pub async fn fetch_match_odds(&self, match_id: i64) -> Result<Fetched, FetchError> {
        let url = odds_url(&self.odds_base_url, match_id);
        let body = self.get_text(&url).await?;
        Ok(Fetched::from_body(&body))
    }

    /// GETs `url` once and reports status and size, whatever the status.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Transport`] when no response was received.
    pub async fn probe(&self, url: &str) -> Result<ProbeReport, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let raw = response.bytes().await?;
        Ok(ProbeReport {
            url: url.to_string(),
            status,
            bytes: raw.len(),
            body: String::from_utf8_lossy(&raw).into_owned(),
        })
    }
}

#[async_trait]
impl FeedSource for HttpFeed {
    async fn fetch_timings(&self) -> Result<Fetched, FetchError> {
        let url = timings_url(&self.base_url);
        let body = self.get_text(&url).await?;
        Ok(Fetched::from_body(&body))
    }

    async fn fetch_matches(&self, competition_id: CompetitionId) -> Result<Fetched, FetchError> {
        let url = matches_url(&self.base_url, competition_id);
        let body = self.get_text(&url).await?;
        Ok(Fetched::from_body(&body))
    }
}
