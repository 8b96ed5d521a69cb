//! Read-only reports over a timings + matches pair.
//!
//! Used by the `upcoming`, `odds` and `rounds` commands; nothing here
//! touches the network or the sinks.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::domain::snapshot::as_integer;
use crate::domain::{CompetitionId, Match, MatchesSnapshot, TimingsSnapshot};

/// How many upcoming matches the odds report covers.
pub const ODDS_MATCH_LIMIT: usize = 8;

/// How many example matches a rounds summary lists.
pub const ROUND_EXAMPLES: usize = 5;

/// One match tied to the channel it runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMatch {
    /// Channel id from the timings.
    pub channel_id: Option<i64>,
    /// Match id.
    pub match_id: i64,
    /// Kick-off, epoch seconds.
    pub start: Option<i64>,
    /// End, epoch seconds.
    pub end: Option<i64>,
    /// Home club id.
    pub home_club_id: Option<i64>,
    /// Away club id.
    pub away_club_id: Option<i64>,
}

impl ChannelMatch {
    fn new(channel_id: Option<i64>, match_id: i64, m: Match<'_>) -> Self {
        Self {
            channel_id,
            match_id,
            start: m.start(),
            end: m.end(),
            home_club_id: m.home_club_id(),
            away_club_id: m.away_club_id(),
        }
    }
}

impl fmt::Display for ChannelMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: Option<i64>| v.map_or_else(|| "-".to_string(), |v| v.to_string());
        write!(
            f,
            "channel={} match_id={} start={} end={} clubs={} vs {}",
            show(self.channel_id),
            self.match_id,
            show(self.start),
            show(self.end),
            show(self.home_club_id),
            show(self.away_club_id)
        )
    }
}

/// Per channel, the match it shows next (`next_match_id`, else
/// `match_id`), if that match is listed in `matches`. Sorted by channel.
#[must_use]
pub fn upcoming(timings: &TimingsSnapshot, matches: &MatchesSnapshot) -> Vec<ChannelMatch> {
    let mut out: Vec<ChannelMatch> = timings
        .channels()
        .filter_map(|ch| {
            let id = ch.next_match_id().or_else(|| ch.match_id())?;
            let m = matches.find(id)?;
            Some(ChannelMatch::new(ch.id(), id, m))
        })
        .collect();
    out.sort_by_key(|c| c.channel_id);
    out
}

/// Per channel, the most recently finished match: the one in the matching
/// channel group (channel ids are 1-based) with the greatest end time
/// strictly before the feed clock.
#[must_use]
pub fn last_finished(timings: &TimingsSnapshot, matches: &MatchesSnapshot) -> Vec<ChannelMatch> {
    let Some(now) = timings.server_datetime() else {
        return Vec::new();
    };
    let groups: Vec<Vec<Match<'_>>> = matches.channel_groups().map(|g| g.collect()).collect();
    let mut out: Vec<ChannelMatch> = timings
        .channels()
        .filter_map(|ch| {
            let index = usize::try_from(ch.id()?.checked_sub(1)?).ok()?;
            let best = groups
                .get(index)?
                .iter()
                .filter_map(|m| Some((m.end()?, m.id()?, *m)))
                .filter(|(end, _, _)| *end < now)
                .max_by_key(|(end, _, _)| *end)?;
            Some(ChannelMatch::new(ch.id(), best.1, best.2))
        })
        .collect();
    out.sort_by_key(|c| c.channel_id);
    out
}

/// Ids of the matches the channels show next (`next_match_id`, else
/// `match_id`), in channel order, without duplicates, limited to those
/// listed in `matches` and to the first `limit`.
#[must_use]
pub fn next_match_ids(timings: &TimingsSnapshot, matches: &MatchesSnapshot, limit: usize) -> Vec<i64> {
    let mut ids: Vec<i64> = Vec::new();
    for ch in timings.channels() {
        let Some(id) = ch.next_match_id().or_else(|| ch.match_id()) else {
            continue;
        };
        if ids.len() == limit {
            break;
        }
        if !ids.contains(&id) && matches.find(id).is_some() {
            ids.push(id);
        }
    }
    ids
}

/// Round label of a match, or `Unknown(match_id=<id>)` when it has none.
fn label_or_unknown(m: Match<'_>) -> String {
    m.round_label().unwrap_or_else(|| {
        let id = m.id().map_or_else(|| "-".to_string(), |id| id.to_string());
        format!("Unknown(match_id={id})")
    })
}

/// Distinct round labels, numeric labels first in numeric order, then the
/// rest lexicographically. Matches without a label contribute
/// `Unknown(match_id=<id>)`.
#[must_use]
pub fn rounds(matches: &MatchesSnapshot) -> Vec<String> {
    let distinct: BTreeSet<String> = matches.matches().map(label_or_unknown).collect();
    let mut labels: Vec<String> = distinct.into_iter().collect();
    labels.sort_by(|a, b| compare_labels(a, b));
    labels
}

/// Competition header of a [`RoundsSummary`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompetitionInfo {
    /// `competition.id` from the timings.
    pub id: Option<CompetitionId>,
    /// `competition.name` from the timings.
    pub name: Option<String>,
}

/// A sample match listed under a [`RoundsSummary`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundExample {
    /// Match id.
    pub id: Option<i64>,
    /// Round label, as in [`rounds`].
    pub round: String,
    /// Home team name, empty if unknown.
    pub home: String,
    /// Away team name, empty if unknown.
    pub away: String,
    /// Kick-off, epoch seconds.
    pub start: Option<i64>,
}

/// The active competition, its rounds and a few example matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundsSummary {
    /// Competition the matches were fetched for.
    pub competition: CompetitionInfo,
    /// Sorted distinct round labels.
    pub rounds: Vec<String>,
    /// The first [`ROUND_EXAMPLES`] matches in feed order.
    pub examples: Vec<RoundExample>,
}

/// Builds the rounds summary for a timings + matches pair.
#[must_use]
pub fn round_summary(timings: &TimingsSnapshot, matches: &MatchesSnapshot) -> RoundsSummary {
    let examples = matches
        .matches()
        .take(ROUND_EXAMPLES)
        .map(|m| RoundExample {
            id: m.id(),
            round: label_or_unknown(m),
            home: m.home_team().unwrap_or_default().to_string(),
            away: m.away_team().unwrap_or_default().to_string(),
            start: m.start().or_else(|| m.field("start").and_then(as_integer)),
        })
        .collect();
    RoundsSummary {
        competition: CompetitionInfo {
            id: timings.competition_id(),
            name: timings.competition_name().map(str::to_string),
        },
        rounds: rounds(matches),
        examples,
    }
}

impl fmt::Display for RoundsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self
            .competition
            .id
            .map_or_else(|| "-".to_string(), |id| id.to_string());
        writeln!(
            f,
            "Competition: {id} - {}",
            self.competition.name.as_deref().unwrap_or("-")
        )?;
        writeln!(f, "Found rounds ({}):", self.rounds.len())?;
        for label in &self.rounds {
            writeln!(f, " - {label}")?;
        }
        writeln!(f, "Examples (max {ROUND_EXAMPLES}):")?;
        for e in &self.examples {
            let show = |v: Option<i64>| v.map_or_else(String::new, |v| v.to_string());
            writeln!(
                f,
                "  id={} round={} {} vs {} start={}",
                show(e.id),
                e.round,
                e.home,
                e.away,
                show(e.start)
            )?;
        }
        Ok(())
    }
}

fn compare_labels(a: &str, b: &str) -> Ordering {
    match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    fn timings() -> TimingsSnapshot {
        TimingsSnapshot::new(json!({
            "server_datetime": 500,
            "channels": [
                {"id": 2, "match_id": 20, "next_match_id": 21},
                {"id": 1, "match_id": 10},
                {"id": 3, "next_match_id": 99}
            ]
        }))
    }

    fn matches() -> MatchesSnapshot {
        MatchesSnapshot::new(json!({
            "channels": [
                {"matches": [
                    {"id": 10, "start_datetime": 300, "end_datetime": 400, "round": 2},
                    {"id": 11, "start_datetime": 100, "end_datetime": 200, "round": 1}
                ]},
                {"matches": [
                    {"id": 20, "end_datetime": 450, "round": "10"},
                    {"id": 21, "start_datetime": 600, "end_datetime": 700,
                     "vmatch_group": {"home_club_id": 3, "away_club_id": 4}, "matchday": "cup"}
                ]}
            ]
        }))
    }

    #[test]
    fn upcoming_uses_next_then_current_match() {
        let rows = upcoming(&timings(), &matches());
        let ids: Vec<_> = rows.iter().map(|r| (r.channel_id, r.match_id)).collect();
        assert_eq!(ids, vec![(Some(1), 10), (Some(2), 21)]);
        assert_eq!(rows.get(1).and_then(|r| r.home_club_id), Some(3));
    }

    #[test]
    fn last_finished_picks_latest_end_before_clock() {
        let rows = last_finished(&timings(), &matches());
        let ids: Vec<_> = rows.iter().map(|r| (r.channel_id, r.match_id)).collect();
        assert_eq!(ids, vec![(Some(1), 10), (Some(2), 20)]);
    }

    #[test]
    fn last_finished_needs_a_clock() {
        let t = TimingsSnapshot::new(json!({"channels": [{"id": 1}]}));
        assert!(last_finished(&t, &matches()).is_empty());
    }

    #[test]
    fn next_match_ids_are_distinct_listed_and_limited() {
        let t = TimingsSnapshot::new(json!({
            "channels": [
                {"id": 1, "match_id": 10},
                {"id": 2, "next_match_id": 21},
                {"id": 3, "next_match_id": 21},
                {"id": 4, "next_match_id": 99},
                {"id": 5},
                {"id": 6, "match_id": 11}
            ]
        }));
        assert_eq!(next_match_ids(&t, &matches(), 8), vec![10, 21, 11]);
        assert_eq!(next_match_ids(&t, &matches(), 2), vec![10, 21]);
    }

    #[test]
    fn unlabelled_matches_get_unknown_round() {
        let m = MatchesSnapshot::new(json!({"channels": [{"matches": [{"id": 4}, {"id": 5, "round": 1}]}]}));
        assert_eq!(rounds(&m), vec!["1", "Unknown(match_id=4)"]);
    }

    #[test]
    fn round_summary_lists_competition_and_examples() {
        let t = TimingsSnapshot::new(json!({"competition": {"id": 42, "name": "Cup"}}));
        let summary = round_summary(&t, &matches());
        assert_eq!(summary.competition.id, Some(CompetitionId::new(42)));
        assert_eq!(summary.competition.name.as_deref(), Some("Cup"));
        assert_eq!(summary.examples.len(), 4);
        let Some(first) = summary.examples.first() else {
            panic!("expected an example");
        };
        assert_eq!(first.id, Some(10));
        assert_eq!(first.round, "2");
        assert_eq!(first.start, Some(300));

        let text = summary.to_string();
        assert!(text.starts_with("Competition: 42 - Cup\nFound rounds (4):\n - 1\n"));
        assert!(text.contains("  id=10 round=2  vs  start=300\n"));

        let Ok(json) = serde_json::to_value(&summary) else {
            panic!("summary not serializable");
        };
        assert_eq!(json.pointer("/competition/id"), Some(&json!(42)));
        assert_eq!(json.pointer("/rounds/3"), Some(&json!("cup")));
    }

    #[test]
    fn round_summary_caps_examples() {
        let many: Vec<_> = (1..=7).map(|id| json!({"id": id, "round": 1})).collect();
        let m = MatchesSnapshot::new(json!({"channels": [{"matches": many}]}));
        let t = TimingsSnapshot::new(json!({}));
        let summary = round_summary(&t, &m);
        assert_eq!(summary.examples.len(), ROUND_EXAMPLES);
        assert!(summary.to_string().starts_with("Competition: - - -\n"));
    }

    #[test]
    fn rounds_sort_numbers_before_labels() {
        assert_eq!(rounds(&matches()), vec!["1", "2", "10", "cup"]);
    }

    #[test]
    fn display_fills_missing_fields() {
        let row = ChannelMatch {
            channel_id: Some(1),
            match_id: 5,
            start: None,
            end: Some(9),
            home_club_id: None,
            away_club_id: Some(2),
        };
        assert_eq!(
            row.to_string(),
            "channel=1 match_id=5 start=- end=9 clubs=- vs 2"
        );
    }
}
