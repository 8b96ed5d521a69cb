//! Error types for the poller and its host process.
//!
//! Each concern gets its own enum so callers can see exactly which
//! failures are tolerated where:
//!
//! - [`FetchError`] is resolved inside a poll cycle (fixed backoff).
//! - [`PersistenceError`] never leaves the sink boundary.
//! - [`ConfigError`] is the only hard failure, raised at startup.
//! - [`ApiError`] maps host-process failures to HTTP responses.
//!
//! A body that is not valid JSON is not an error at all: it surfaces as
//! [`crate::domain::Fetched::RawFallback`].

use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::domain::SnapshotKind;

/// Transport-level failure on either feed endpoint.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The endpoint answered with something other than `200 OK`.
    #[error("{url} returned http {status}")]
    Status {
        /// Requested URL.
        url: String,
        /// Status code returned by the server.
        status: u16,
    },

    /// Connection, timeout or body-read failure.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Failure while writing to one of the sinks.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// Filesystem error on the given destination.
    #[error("io error on {path}: {source}")]
    Io {
        /// Destination being written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A record could not be serialized.
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

impl PersistenceError {
    /// Wraps an I/O error with the destination it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Invalid configuration detected while building the poller or server.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The base URL override is not an absolute http(s) URL.
    #[error("invalid base url {0:?}")]
    InvalidBaseUrl(String),

    /// `LISTEN_ADDR` could not be parsed as a socket address.
    #[error("invalid listen address {0:?}")]
    InvalidListenAddr(String),

    /// `VFL_MATCHES_REFRESH` names an unknown policy.
    #[error("unknown matches refresh policy {0:?} (expected every_cycle or on_change)")]
    InvalidRefreshPolicy(String),

    /// The HTTP client could not be constructed.
    #[error("http client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Structured JSON error response body.
///
/// ```json
/// { "error": { "code": 2001, "message": "no timings snapshot recorded yet" } }
/// ```
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
}

/// Host-process error with HTTP status code mapping.
///
/// | Range     | Category   | HTTP Status               |
/// |-----------|------------|---------------------------|
/// | 2000–2999 | Not Found  | 404 Not Found             |
/// | 3000–3999 | Server     | 500 Internal Server Error |
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No snapshot of this kind has been written to the data directory.
    #[error("no {0} snapshot recorded yet")]
    SnapshotNotFound(SnapshotKind),

    /// The host was started without a data directory.
    #[error("no data directory configured")]
    NoDataDir,

    /// Snapshot file exists but could not be read or parsed.
    #[error("snapshot unreadable: {0}")]
    SnapshotUnreadable(String),
}

impl ApiError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::SnapshotNotFound(SnapshotKind::Timings) => 2001,
            Self::SnapshotNotFound(SnapshotKind::Matches) => 2002,
            Self::NoDataDir => 2003,
            Self::SnapshotUnreadable(_) => 3001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::SnapshotNotFound(_) | Self::NoDataDir => StatusCode::NOT_FOUND,
            Self::SnapshotUnreadable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
