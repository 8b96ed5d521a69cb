//! The adaptive polling core.
//!
//! A [`Poller`] owns the last accepted timings and matches snapshots and
//! drives one cycle at a time:
//!
//! ```text
//! fetch timings ── fail ──▶ RequestFailed (ERROR_BACKOFF)
//!     │
//!     ├── competition id? ── none ──▶ skip matches
//!     │        └── fetch matches (per MatchesRefresh)
//!     │
//!     ├── timings changed? ──▶ persist + summarise
//!     ├── matches changed? ──▶ persist + count
//!     └── next delay from the soonest phase end
//! ```
//!
//! Nothing inside a cycle is fatal. Fetch failures become outcomes and
//! persistence failures are swallowed by the [`Sink`].

pub mod change;
pub mod delay;
pub mod outcome;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::MatchesRefresh;
use crate::domain::{CompetitionId, Fetched, MatchesSnapshot, TimingsSnapshot};
use crate::error::FetchError;
use crate::feed::FeedSource;
use crate::persistence::Sink;

pub use change::changed;
pub use delay::{ERROR_BACKOFF, MIN_DELAY, UNKNOWN_DELAY, next_delay, next_delay_ms};
pub use outcome::{
    ChannelSummary, CycleOutcome, CycleReport, MatchesOutcome, SkipReason, TimingsOutcome,
};

/// Result of the matches half of a cycle, before change detection.
enum MatchesFetch {
    Skipped(SkipReason),
    Failed(FetchError),
    Fetched(CompetitionId, Fetched),
}

/// Orchestrates fetch → detect → persist → delay for one feed.
///
/// Each instance owns its own last-seen state, so independent pollers
/// can run side by side. A single instance must not run concurrent
/// cycles; every cycle method takes `&mut self`.
#[derive(Debug)]
pub struct Poller<S> {
    source: S,
    sink: Sink,
    refresh: MatchesRefresh,
    last_timings: Option<TimingsSnapshot>,
    last_matches: Option<(CompetitionId, MatchesSnapshot)>,
    last_matches_fetch: Option<(CompetitionId, Instant)>,
}

impl<S: FeedSource> Poller<S> {
    /// Creates a poller with empty last-seen state.
    #[must_use]
    pub fn new(source: S, sink: Sink, refresh: MatchesRefresh) -> Self {
        Self {
            source,
            sink,
            refresh,
            last_timings: None,
            last_matches: None,
            last_matches_fetch: None,
        }
    }

    /// The feed source this poller reads from.
    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Last accepted timings snapshot.
    #[must_use]
    pub const fn last_timings(&self) -> Option<&TimingsSnapshot> {
        self.last_timings.as_ref()
    }

    /// Last accepted matches snapshot.
    #[must_use]
    pub fn last_matches(&self) -> Option<&MatchesSnapshot> {
        self.last_matches.as_ref().map(|(_, m)| m)
    }

    /// Runs one fetch → detect → persist cycle and reports what happened.
    ///
    /// Does not sleep; the caller waits [`CycleOutcome::next_delay`].
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let fetched = match self.source.fetch_timings().await {
            Ok(fetched) => fetched,
            Err(error) => {
                warn!(%error, backoff_ms = ERROR_BACKOFF.as_millis() as u64, "timings request failed");
                return CycleOutcome::RequestFailed(error);
            }
        };
        let timings_raw = fetched.is_raw();
        if timings_raw {
            warn!("timings body is not valid JSON; keeping raw text");
        }
        let timings = TimingsSnapshot::from_fetched(fetched);

        let competition_id = timings.competition_id();
        let matches_fetch = match competition_id {
            None => {
                warn!("no competition id in timings; skipping matches");
                MatchesFetch::Skipped(SkipReason::MissingCompetitionId)
            }
            Some(id) if !self.matches_due(id) => MatchesFetch::Skipped(SkipReason::NotDue),
            Some(id) => match self.source.fetch_matches(id).await {
                Ok(fetched) => {
                    self.last_matches_fetch = Some((id, Instant::now()));
                    MatchesFetch::Fetched(id, fetched)
                }
                Err(error) => {
                    warn!(%error, competition_id = %id, "matches request failed");
                    MatchesFetch::Failed(error)
                }
            },
        };

        // Schedule from the freshest phase boundaries, changed or not.
        let next_delay = delay::next_delay(&timings);

        let timings_outcome = self.accept_timings(timings).await;
        let matches_outcome = match matches_fetch {
            MatchesFetch::Skipped(reason) => MatchesOutcome::Skipped(reason),
            MatchesFetch::Failed(error) => MatchesOutcome::RequestFailed(error),
            MatchesFetch::Fetched(id, fetched) => self.accept_matches(id, fetched).await,
        };

        debug!(
            next_delay_ms = next_delay.as_millis() as u64,
            competition_id = ?competition_id.map(CompetitionId::get),
            "cycle complete"
        );
        CycleOutcome::Polled(CycleReport {
            competition_id,
            timings_raw,
            timings: timings_outcome,
            matches: matches_outcome,
            next_delay,
        })
    }

    /// Polls until `shutdown` flips to `true` (or its sender is dropped),
    /// sleeping between cycles for the delay each cycle returns.
    ///
    /// Shutdown is observed between cycles only; an in-flight fetch is
    /// never cancelled.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        info!("poller started");
        loop {
            if *shutdown.borrow_and_update() {
                break;
            }
            let delay = self.run_cycle().await.next_delay();
            debug!(delay_ms = delay.as_millis() as u64, "sleeping until next cycle");
            let closed = tokio::select! {
                () = tokio::time::sleep(delay) => false,
                changed = shutdown.changed() => changed.is_err(),
            };
            if closed {
                break;
            }
        }
        info!("poller stopped");
    }

    fn matches_due(&self, competition_id: CompetitionId) -> bool {
        match self.refresh {
            MatchesRefresh::EveryCycle => true,
            MatchesRefresh::OnCompetitionChange { max_age } => match self.last_matches_fetch {
                None => true,
                Some((last_id, at)) => last_id != competition_id || at.elapsed() > max_age,
            },
        }
    }

    async fn accept_timings(&mut self, timings: TimingsSnapshot) -> TimingsOutcome {
        if !changed(self.last_timings.as_ref(), &timings) {
            debug!("timings unchanged");
            return TimingsOutcome::Unchanged;
        }
        let channels: Vec<ChannelSummary> = timings.channels().map(ChannelSummary::from).collect();
        info!(
            server_datetime = ?timings.server_datetime(),
            channels = channels.len(),
            "timings changed"
        );
        for summary in &channels {
            info!("{summary}");
        }
        let report = self.sink.record_timings(&timings).await;
        self.last_timings = Some(timings);
        TimingsOutcome::Changed {
            channels,
            persistence_failures: report.failed,
        }
    }

    async fn accept_matches(&mut self, competition_id: CompetitionId, fetched: Fetched) -> MatchesOutcome {
        if fetched.is_raw() {
            warn!(%competition_id, "matches body is not valid JSON; keeping raw text");
        }
        let candidate = (competition_id, MatchesSnapshot::from_fetched(fetched));
        if !changed(self.last_matches.as_ref(), &candidate) {
            debug!(%competition_id, "matches unchanged");
            return MatchesOutcome::Unchanged;
        }
        let total_matches = candidate.1.match_count();
        info!(%competition_id, total_matches, "matches changed");
        let report = self.sink.record_matches(competition_id, &candidate.1).await;
        self.last_matches = Some(candidate);
        MatchesOutcome::Changed {
            competition_id,
            total_matches,
            persistence_failures: report.failed,
        }
    }
}

/// Cloneable view of whether a spawned poller task is still running.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    /// `true` until the poller task returns or panics.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// A flag fixed at `running`, for handlers exercised without a poller.
    #[cfg(test)]
    pub(crate) fn fixed(running: bool) -> Self {
        Self(Arc::new(AtomicBool::new(running)))
    }
}

/// Clears the liveness flag when the task's future is dropped.
struct ClearOnExit(Arc<AtomicBool>);

impl Drop for ClearOnExit {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<S: FeedSource + 'static> Poller<S> {
    /// Runs the poller on a background task until `shutdown` fires.
    ///
    /// Await the returned handle after signalling shutdown: the task ends
    /// only between cycles, so joining it lets the in-flight cycle finish
    /// its writes.
    pub fn spawn(mut self, shutdown: watch::Receiver<bool>) -> (JoinHandle<()>, Liveness) {
        let flag = Arc::new(AtomicBool::new(true));
        let guard = ClearOnExit(Arc::clone(&flag));
        let handle = tokio::spawn(async move {
            let _guard = guard;
            self.run(shutdown).await;
        });
        (handle, Liveness(flag))
    }
}
