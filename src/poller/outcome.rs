//! What a single poll cycle observed and did.

use std::fmt;
use std::time::Duration;

use chrono::DateTime;

use super::delay::ERROR_BACKOFF;
use crate::domain::{Channel, CompetitionId};
use crate::error::FetchError;

/// Human-readable state of one channel at an accepted timings change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSummary {
    /// Channel id.
    pub channel_id: Option<i64>,
    /// Currently active match.
    pub match_id: Option<i64>,
    /// Match shown next.
    pub next_match_id: Option<i64>,
    /// End of the active phase, epoch seconds.
    pub phase_end: Option<i64>,
}

impl From<Channel<'_>> for ChannelSummary {
    fn from(ch: Channel<'_>) -> Self {
        Self {
            channel_id: ch.id(),
            match_id: ch.match_id(),
            next_match_id: ch.next_match_id(),
            phase_end: ch.active_phase_end(),
        }
    }
}

struct Opt(Option<i64>);

impl fmt::Display for Opt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{v}"),
            None => f.write_str("-"),
        }
    }
}

impl fmt::Display for ChannelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "channel {} match={} next={} phase_end=",
            Opt(self.channel_id),
            Opt(self.match_id),
            Opt(self.next_match_id)
        )?;
        match self.phase_end.and_then(|ts| DateTime::from_timestamp(ts, 0)) {
            Some(at) => write!(f, "{}", at.format("%Y-%m-%dT%H:%M:%SZ")),
            None => f.write_str("-"),
        }
    }
}

/// Result of comparing the fetched timings against the last accepted ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimingsOutcome {
    /// Same document as last time; nothing persisted.
    Unchanged,
    /// New document accepted and persisted.
    Changed {
        /// Per-channel summary of the new document.
        channels: Vec<ChannelSummary>,
        /// Sink writes that failed and were swallowed.
        persistence_failures: usize,
    },
}

/// Why no matches request was made this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The timings carried no usable `competition.id`.
    MissingCompetitionId,
    /// The refresh policy did not require a fetch yet.
    NotDue,
}

/// What happened to the matches resource this cycle.
#[derive(Debug)]
pub enum MatchesOutcome {
    /// No request was made.
    Skipped(SkipReason),
    /// The request failed; resolved locally.
    RequestFailed(FetchError),
    /// Same document as last time for the same competition.
    Unchanged,
    /// New document accepted and persisted.
    Changed {
        /// Competition the matches belong to.
        competition_id: CompetitionId,
        /// Matches across all channel groups.
        total_matches: usize,
        /// Sink writes that failed and were swallowed.
        persistence_failures: usize,
    },
}

/// Everything a cycle with a successful timings fetch produced.
#[derive(Debug)]
pub struct CycleReport {
    /// Competition id extracted from the timings, if any.
    pub competition_id: Option<CompetitionId>,
    /// `true` when the timings body was not valid JSON.
    pub timings_raw: bool,
    /// Timings change detection result.
    pub timings: TimingsOutcome,
    /// Matches fetch and change detection result.
    pub matches: MatchesOutcome,
    /// Adaptive delay computed from the fetched timings.
    pub next_delay: Duration,
}

/// Outcome of [`super::Poller::run_cycle`].
#[derive(Debug)]
pub enum CycleOutcome {
    /// The timings request failed; wait [`ERROR_BACKOFF`] before retrying.
    RequestFailed(FetchError),
    /// Timings were fetched and processed.
    Polled(CycleReport),
}

impl CycleOutcome {
    /// How long the caller should wait before the next cycle.
    #[must_use]
    pub fn next_delay(&self) -> Duration {
        match self {
            Self::RequestFailed(_) => ERROR_BACKOFF,
            Self::Polled(report) => report.next_delay,
        }
    }

    /// The report, if the timings fetch succeeded.
    #[must_use]
    pub const fn report(&self) -> Option<&CycleReport> {
        match self {
            Self::RequestFailed(_) => None,
            Self::Polled(report) => Some(report),
        }
    }
}
