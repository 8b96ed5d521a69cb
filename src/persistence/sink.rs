//! Persistence sink: fans accepted changes out to every configured output.

use tracing::{debug, warn};

use super::records::LineRecord;
use super::tabular::{matches_rows, timings_rows};
use super::{LineLog, SnapshotFiles, TabularLog};
use crate::config::SinkConfig;
use crate::domain::{CompetitionId, MatchesSnapshot, SnapshotKind, TimingsSnapshot};
use crate::error::PersistenceError;

/// Counts of sink writes for one accepted change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteReport {
    /// Outputs written successfully.
    pub written: usize,
    /// Outputs whose write failed and was swallowed.
    pub failed: usize,
}

impl WriteReport {
    fn note(&mut self, output: &'static str, result: Result<(), PersistenceError>) {
        match result {
            Ok(()) => {
                self.written += 1;
                debug!(output, "record persisted");
            }
            Err(error) => {
                self.failed += 1;
                warn!(output, %error, "persistence failed; continuing");
            }
        }
    }
}

/// The configured outputs. Every output is optional; with none configured
/// the sink is a no-op.
///
/// No method returns an error: a failed write is logged and counted in
/// the [`WriteReport`], never propagated.
#[derive(Debug, Clone, Default)]
pub struct Sink {
    line_log: Option<LineLog>,
    tabular: Option<TabularLog>,
    snapshots: Option<SnapshotFiles>,
}

impl Sink {
    /// Builds the sink from configured destinations.
    #[must_use]
    pub fn new(config: &SinkConfig) -> Self {
        Self {
            line_log: config.jsonl_path.as_ref().map(LineLog::new),
            tabular: config.csv_path.as_ref().map(TabularLog::new),
            snapshots: config.data_dir.as_ref().map(SnapshotFiles::new),
        }
    }

    /// A sink with no outputs.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// `true` if at least one output is configured.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.line_log.is_some() || self.tabular.is_some() || self.snapshots.is_some()
    }

    /// Persists an accepted timings change.
    pub async fn record_timings(&self, snapshot: &TimingsSnapshot) -> WriteReport {
        let mut report = WriteReport::default();
        if let Some(log) = &self.line_log {
            report.note("jsonl", log.append(&LineRecord::timings(snapshot)).await);
        }
        if let Some(tabular) = &self.tabular {
            report.note("csv", tabular.append_rows(&timings_rows(snapshot)).await);
        }
        if let Some(files) = &self.snapshots {
            report.note(
                "snapshot",
                files.store(SnapshotKind::Timings, snapshot.document()).await,
            );
        }
        report
    }

    /// Persists an accepted matches change.
    pub async fn record_matches(
        &self,
        competition_id: CompetitionId,
        snapshot: &MatchesSnapshot,
    ) -> WriteReport {
        let mut report = WriteReport::default();
        if let Some(log) = &self.line_log {
            report.note(
                "jsonl",
                log.append(&LineRecord::matches(competition_id, snapshot)).await,
            );
        }
        if let Some(tabular) = &self.tabular {
            report.note(
                "csv",
                tabular
                    .append_rows(&matches_rows(competition_id, snapshot))
                    .await,
            );
        }
        if let Some(files) = &self.snapshots {
            report.note(
                "snapshot",
                files.store(SnapshotKind::Matches, snapshot.document()).await,
            );
        }
        report
    }
}
