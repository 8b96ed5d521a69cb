//! Poller configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Command-line flags in the binary
//! override individual values after loading.
//!
//! | Variable                   | Default                            |
//! |----------------------------|------------------------------------|
//! | `VFL_BASE_URL`             | `https://vfscigaming.aitcloud.de`  |
//! | `VFL_HTTP_TIMEOUT_SECS`    | `15`                               |
//! | `VFL_USER_AGENT`           | `Mozilla/5.0`                      |
//! | `VFL_ODDS_BASE_URL`        | see [`DEFAULT_ODDS_BASE_URL`]      |
//! | `VFL_JSONL_PATH`           | unset (line log disabled)          |
//! | `VFL_CSV_PATH`             | unset (tabular log disabled)       |
//! | `DATA_DIR`                 | unset (snapshot files disabled)    |
//! | `VFL_MATCHES_REFRESH`      | `every_cycle`                      |
//! | `VFL_MATCHES_MAX_AGE_SECS` | `60`                               |
//! | `LISTEN_ADDR`              | `0.0.0.0:3000`                     |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Default feed host.
pub const DEFAULT_BASE_URL: &str = "https://vfscigaming.aitcloud.de";

/// Default base of the per-match odds feed.
pub const DEFAULT_ODDS_BASE_URL: &str =
    "https://vgls.live.vsports.cloud/vfl/feeds/?/scigamingscigamingcdn/zh/Europe:Berlin/gismo";

/// Where and how to reach the feed.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Base URL the two endpoint paths are appended to.
    pub base_url: String,
    /// Per-request deadline in seconds.
    pub timeout_secs: u64,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
    /// Base URL the `match_odds2/<id>` path is appended to.
    pub odds_base_url: String,
}

impl FeedConfig {
    /// Replaces the base URL after validating it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] unless `url` is an absolute
    /// `http` or `https` URL.
    pub fn with_base_url(mut self, url: &str) -> Result<Self, ConfigError> {
        self.base_url = validate_base_url(url)?;
        Ok(self)
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 15,
            user_agent: "Mozilla/5.0".to_string(),
            odds_base_url: DEFAULT_ODDS_BASE_URL.to_string(),
        }
    }
}

/// Output destinations. Each is optional; an unset sink is a no-op.
#[derive(Debug, Clone, Default)]
pub struct SinkConfig {
    /// Line-delimited JSON log.
    pub jsonl_path: Option<PathBuf>,
    /// Tabular (CSV) log.
    pub csv_path: Option<PathBuf>,
    /// Directory holding the latest `timings.json` / `matches.json`.
    pub data_dir: Option<PathBuf>,
}

/// When the matches resource is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchesRefresh {
    /// Fetch matches on every cycle; persistence is gated by content.
    #[default]
    EveryCycle,
    /// Fetch only when the competition id changes or the last fetch is
    /// older than `max_age`.
    OnCompetitionChange {
        /// Maximum age of the last matches fetch.
        max_age: Duration,
    },
}

/// Top-level configuration.
///
/// Loaded once at startup via [`PollerConfig::from_env`].
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Feed endpoint settings.
    pub feed: FeedConfig,
    /// Output destinations.
    pub sinks: SinkConfig,
    /// Matches cadence policy.
    pub matches_refresh: MatchesRefresh,
    /// Bind address of the host-process variant.
    pub listen_addr: SocketAddr,
}

impl PollerConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the base URL, listen address or
    /// matches refresh policy is set but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// See [`PollerConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = FeedConfig::default();
        let base_url = match lookup("VFL_BASE_URL") {
            Some(url) => validate_base_url(&url)?,
            None => defaults.base_url,
        };
        let feed = FeedConfig {
            base_url,
            timeout_secs: parse_or(&lookup, "VFL_HTTP_TIMEOUT_SECS", defaults.timeout_secs),
            user_agent: lookup("VFL_USER_AGENT").unwrap_or(defaults.user_agent),
            odds_base_url: match lookup("VFL_ODDS_BASE_URL") {
                Some(url) => validate_base_url(&url)?,
                None => defaults.odds_base_url,
            },
        };

        let sinks = SinkConfig {
            jsonl_path: non_empty(&lookup, "VFL_JSONL_PATH").map(PathBuf::from),
            csv_path: non_empty(&lookup, "VFL_CSV_PATH").map(PathBuf::from),
            data_dir: non_empty(&lookup, "DATA_DIR").map(PathBuf::from),
        };

        let max_age = Duration::from_secs(parse_or(&lookup, "VFL_MATCHES_MAX_AGE_SECS", 60));
        let matches_refresh = match lookup("VFL_MATCHES_REFRESH").as_deref() {
            None | Some("every_cycle") => MatchesRefresh::EveryCycle,
            Some("on_change") => MatchesRefresh::OnCompetitionChange { max_age },
            Some(other) => return Err(ConfigError::InvalidRefreshPolicy(other.to_string())),
        };

        let raw_addr = lookup("LISTEN_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let listen_addr = raw_addr
            .parse()
            .map_err(|_| ConfigError::InvalidListenAddr(raw_addr.clone()))?;

        Ok(Self {
            feed,
            sinks,
            matches_refresh,
            listen_addr,
        })
    }
}

/// Accepts absolute `http`/`https` URLs and strips a trailing slash.
fn validate_base_url(raw: &str) -> Result<String, ConfigError> {
    let parsed =
        reqwest::Url::parse(raw).map_err(|_| ConfigError::InvalidBaseUrl(raw.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ConfigError::InvalidBaseUrl(raw.to_string()));
    }
    Ok(raw.trim_end_matches('/').to_string())
}

/// Parses `key` as `T`, returning `default` on missing or invalid values.
fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|v| !v.trim().is_empty())
}
