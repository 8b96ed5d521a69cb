//! Incrementally-built CSV export.
//!
//! Timings rows and matches rows share one file and are told apart by the
//! leading `type` column. The header line names the timings columns and is
//! written only when the file does not exist yet, so restarting against an
//! existing export never duplicates it.

use std::path::{Path, PathBuf};

use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use super::line_log::ensure_parent;
use crate::domain::{CompetitionId, MatchOdds, MatchesSnapshot, TimingsSnapshot};
use crate::error::PersistenceError;

/// Columns of a timings row.
pub const TIMINGS_COLUMNS: [&str; 5] = [
    "type",
    "server_datetime",
    "channel_match_id",
    "channel_next_match_id",
    "active_phase_end",
];

/// Columns of a matches row.
pub const MATCHES_COLUMNS: [&str; 9] = [
    "type",
    "competition_id",
    "match_id",
    "chunk_id",
    "betstop",
    "start",
    "end",
    "home_club_id",
    "away_club_id",
];

/// Columns of the odds table.
pub const ODDS_COLUMNS: [&str; 6] = ["match_id", "home", "away", "1", "x", "2"];

const SEP: char = ',';

/// Append-only CSV destination.
#[derive(Debug, Clone)]
pub struct TabularLog {
    path: PathBuf,
}

impl TabularLog {
    /// Creates an export writing to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Destination file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends rows in one write, prefixed by the header if the file is new.
    ///
    /// The first call creates the file with its header even when `rows` is
    /// empty; later empty calls leave the file untouched.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] if the existence check, open or write
    /// fails.
    pub async fn append_rows(&self, rows: &[Vec<String>]) -> Result<(), PersistenceError> {
        ensure_parent(&self.path).await?;
        let exists = fs::try_exists(&self.path)
            .await
            .map_err(|e| PersistenceError::io(&self.path, e))?;
        if exists && rows.is_empty() {
            return Ok(());
        }

        let mut buf = String::new();
        if !exists {
            let header: Vec<String> = TIMINGS_COLUMNS.iter().map(|c| (*c).to_string()).collect();
            write_row(&mut buf, &header);
        }
        for row in rows {
            write_row(&mut buf, row);
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| PersistenceError::io(&self.path, e))?;
        file.write_all(buf.as_bytes())
            .await
            .map_err(|e| PersistenceError::io(&self.path, e))?;
        file.flush()
            .await
            .map_err(|e| PersistenceError::io(&self.path, e))
    }
}

/// Writes `header` and `rows` to `path`, replacing any previous content.
///
/// # Errors
///
/// Returns a [`PersistenceError`] if the parent directory or the file
/// cannot be written.
pub async fn write_table(
    path: &Path,
    header: &[&str],
    rows: &[Vec<String>],
) -> Result<(), PersistenceError> {
    ensure_parent(path).await?;
    let mut buf = String::new();
    let header: Vec<String> = header.iter().map(|c| (*c).to_string()).collect();
    write_row(&mut buf, &header);
    for row in rows {
        write_row(&mut buf, row);
    }
    fs::write(path, buf)
        .await
        .map_err(|e| PersistenceError::io(path, e))
}

/// One row per match, in [`ODDS_COLUMNS`] order.
#[must_use]
pub fn odds_rows(odds: &[MatchOdds]) -> Vec<Vec<String>> {
    odds.iter()
        .map(|o| {
            vec![
                o.match_id.to_string(),
                o.home.clone(),
                o.away.clone(),
                o.home_win.clone().unwrap_or_default(),
                o.draw.clone().unwrap_or_default(),
                o.away_win.clone().unwrap_or_default(),
            ]
        })
        .collect()
}

/// One row per channel.
#[must_use]
pub fn timings_rows(snapshot: &TimingsSnapshot) -> Vec<Vec<String>> {
    let server = cell(snapshot.server_datetime());
    snapshot
        .channels()
        .map(|ch| {
            vec![
                "timings".to_string(),
                server.clone(),
                cell(ch.match_id()),
                cell(ch.next_match_id()),
                cell(ch.active_phase_end()),
            ]
        })
        .collect()
}

/// One row per match across all channel groups.
#[must_use]
pub fn matches_rows(competition_id: CompetitionId, snapshot: &MatchesSnapshot) -> Vec<Vec<String>> {
    snapshot
        .matches()
        .map(|m| {
            vec![
                "matches".to_string(),
                competition_id.to_string(),
                cell(m.id()),
                m.field("chunk_id").map(raw_cell).unwrap_or_default(),
                cell(m.betstop()),
                cell(m.start()),
                cell(m.end()),
                cell(m.home_club_id()),
                cell(m.away_club_id()),
            ]
        })
        .collect()
}

fn cell(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn raw_cell(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn needs_quotes(field: &str) -> bool {
    field.contains(SEP) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Appends a single CSV row (with trailing newline) to `buf`.
fn write_row(buf: &mut String, row: &[String]) {
    for (i, field) in row.iter().enumerate() {
        if i > 0 {
            buf.push(SEP);
        }
        if needs_quotes(field) {
            buf.push('"');
            buf.push_str(&field.replace('"', "\"\""));
            buf.push('"');
        } else {
            buf.push_str(field);
        }
    }
    buf.push('\n');
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    fn timings() -> TimingsSnapshot {
        TimingsSnapshot::new(json!({
            "server_datetime": 998,
            "channels": [
                {"id": 1, "match_id": 10, "next_match_id": 11, "active_phase_end_datetime": 1000},
                {"id": 2, "match_id": 20}
            ]
        }))
    }

    async fn read(path: &Path) -> String {
        let Ok(text) = tokio::fs::read_to_string(path).await else {
            panic!("export not readable");
        };
        text
    }

    #[test]
    fn timings_rows_one_per_channel() {
        let rows = timings_rows(&timings());
        assert_eq!(
            rows,
            vec![
                vec!["timings", "998", "10", "11", "1000"],
                vec!["timings", "998", "20", "", ""],
            ]
        );
    }

    #[test]
    fn matches_rows_flatten_groups() {
        let snapshot = MatchesSnapshot::new(json!({
            "channels": [
                {"matches": [{
                    "id": 5, "chunk_id": "c1", "betstop_datetime": 90,
                    "start_datetime": 100, "end_datetime": 200,
                    "vmatch_group": {"home_club_id": 7, "away_club_id": 8}
                }]},
                {"matches": [{"id": 6}]}
            ]
        }));
        let rows = matches_rows(CompetitionId::new(42), &snapshot);
        assert_eq!(
            rows,
            vec![
                vec!["matches", "42", "5", "c1", "90", "100", "200", "7", "8"],
                vec!["matches", "42", "6", "", "", "", "", "", ""],
            ]
        );
    }

    #[test]
    fn quotes_fields_with_separators() {
        let mut buf = String::new();
        write_row(&mut buf, &["a,b".to_string(), "say \"hi\"".to_string(), "x".to_string()]);
        assert_eq!(buf, "\"a,b\",\"say \"\"hi\"\"\",x\n");
    }

    #[tokio::test]
    async fn header_written_once_for_fresh_file() {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("tempdir failed");
        };
        let log = TabularLog::new(dir.path().join("events.csv"));
        let first = vec![vec!["timings".to_string(), "1".to_string()]];
        let second = vec![vec!["timings".to_string(), "2".to_string()]];
        assert!(log.append_rows(&first).await.is_ok());
        assert!(log.append_rows(&second).await.is_ok());

        let text = read(log.path()).await;
        assert_eq!(
            text,
            "type,server_datetime,channel_match_id,channel_next_match_id,active_phase_end\n\
             timings,1\n\
             timings,2\n"
        );
    }

    #[tokio::test]
    async fn restart_against_existing_file_keeps_single_header() {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("tempdir failed");
        };
        let path = dir.path().join("events.csv");
        let rows = timings_rows(&timings());
        assert!(TabularLog::new(&path).append_rows(&rows).await.is_ok());

        // A new writer stands in for a restarted process.
        let resumed = TabularLog::new(&path);
        let more = vec![vec!["timings".to_string(), "999".to_string()]];
        assert!(resumed.append_rows(&more).await.is_ok());

        let text = read(&path).await;
        assert_eq!(text.matches("type,server_datetime").count(), 1);
        assert_eq!(text.lines().count(), 4);
    }

    #[tokio::test]
    async fn existing_empty_file_gets_no_header() {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("tempdir failed");
        };
        let path = dir.path().join("events.csv");
        assert!(tokio::fs::write(&path, "").await.is_ok());
        let log = TabularLog::new(&path);
        assert!(log.append_rows(&[vec!["timings".to_string()]]).await.is_ok());
        assert_eq!(read(&path).await, "timings\n");
    }

    #[tokio::test]
    async fn odds_table_replaces_previous_content() {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("tempdir failed");
        };
        let path = dir.path().join("odds.csv");
        assert!(tokio::fs::write(&path, "stale\n").await.is_ok());
        let odds = [MatchOdds {
            match_id: 3,
            home: "Lions, FC".to_string(),
            away: "Tigers".to_string(),
            home_win: Some("2.10".to_string()),
            draw: None,
            away_win: Some("3.05".to_string()),
        }];
        assert!(write_table(&path, &ODDS_COLUMNS, &odds_rows(&odds)).await.is_ok());
        assert_eq!(
            read(&path).await,
            "match_id,home,away,1,x,2\n3,\"Lions, FC\",Tigers,2.10,,3.05\n"
        );
    }

    #[tokio::test]
    async fn empty_row_set_creates_file_with_header_once() {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("tempdir failed");
        };
        let log = TabularLog::new(dir.path().join("events.csv"));
        assert!(log.append_rows(&[]).await.is_ok());
        assert!(log.append_rows(&[]).await.is_ok());
        assert_eq!(
            read(log.path()).await,
            "type,server_datetime,channel_match_id,channel_next_match_id,active_phase_end\n"
        );
    }
}
