//! Timings and matches snapshots.
//!
//! Both snapshot kinds keep the fetched document as a raw
//! [`serde_json::Value`]. Equality is therefore deep value equality, and
//! since `serde_json` objects are sorted maps it ignores key order. The
//! typed accessors below are read-only views into that document; a
//! missing or mistyped field yields `None` rather than an error.

use std::fmt;

use serde_json::Value;

use super::{CompetitionId, Fetched};

/// Reads an integer that the feed may encode as a number or a numeric
/// string.
#[must_use]
pub fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn int_field(obj: &Value, key: &str) -> Option<i64> {
    obj.get(key).and_then(as_integer)
}

fn array_field<'a>(obj: &'a Value, key: &str) -> &'a [Value] {
    obj.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Which endpoint a snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotKind {
    /// `get-timings.json`
    Timings,
    /// `get-matches.json`
    Matches,
}

impl SnapshotKind {
    /// Name used for record tags and file names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Timings => "timings",
            Self::Matches => "matches",
        }
    }
}

impl fmt::Display for SnapshotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full decoded `get-timings.json` document.
#[derive(Debug, Clone, PartialEq)]
pub struct TimingsSnapshot {
    document: Value,
}

impl TimingsSnapshot {
    /// Wraps a decoded timings document.
    #[must_use]
    pub const fn new(document: Value) -> Self {
        Self { document }
    }

    /// Builds a snapshot from a fetch result; raw text is kept under `raw`.
    #[must_use]
    pub fn from_fetched(fetched: Fetched) -> Self {
        Self::new(fetched.into_document())
    }

    /// The raw document.
    #[must_use]
    pub const fn document(&self) -> &Value {
        &self.document
    }

    /// `competition.id`, if present and integral.
    #[must_use]
    pub fn competition_id(&self) -> Option<CompetitionId> {
        self.document
            .get("competition")
            .and_then(|c| int_field(c, "id"))
            .map(CompetitionId::new)
    }

    /// `competition.name`, if present.
    #[must_use]
    pub fn competition_name(&self) -> Option<&str> {
        self.document.pointer("/competition/name").and_then(Value::as_str)
    }

    /// The feed's authoritative clock, in epoch seconds.
    #[must_use]
    pub fn server_datetime(&self) -> Option<i64> {
        int_field(&self.document, "server_datetime")
    }

    /// Channels in feed order.
    pub fn channels(&self) -> impl Iterator<Item = Channel<'_>> {
        array_field(&self.document, "channels").iter().map(Channel)
    }
}

/// Read-only view of one entry of `channels` in a timings document.
#[derive(Debug, Clone, Copy)]
pub struct Channel<'a>(&'a Value);

impl<'a> Channel<'a> {
    /// Channel id.
    #[must_use]
    pub fn id(&self) -> Option<i64> {
        int_field(self.0, "id")
    }

    /// Match currently active on this channel.
    #[must_use]
    pub fn match_id(&self) -> Option<i64> {
        int_field(self.0, "match_id")
    }

    /// Match this channel shows next.
    #[must_use]
    pub fn next_match_id(&self) -> Option<i64> {
        int_field(self.0, "next_match_id")
    }

    /// Epoch seconds at which the current phase on this channel ends.
    #[must_use]
    pub fn active_phase_end(&self) -> Option<i64> {
        int_field(self.0, "active_phase_end_datetime")
    }

    /// Raw field access, for tabular export.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&'a Value> {
        self.0.get(key)
    }
}

/// Full decoded `get-matches.json` document.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchesSnapshot {
    document: Value,
}

impl MatchesSnapshot {
    /// Wraps a decoded matches document.
    #[must_use]
    pub const fn new(document: Value) -> Self {
        Self { document }
    }

    /// Builds a snapshot from a fetch result; raw text is kept under `raw`.
    #[must_use]
    pub fn from_fetched(fetched: Fetched) -> Self {
        Self::new(fetched.into_document())
    }

    /// The raw document.
    #[must_use]
    pub const fn document(&self) -> &Value {
        &self.document
    }

    /// Channel groups in feed order, each a slice of match objects.
    pub fn channel_groups(&self) -> impl Iterator<Item = impl Iterator<Item = Match<'_>>> {
        array_field(&self.document, "channels")
            .iter()
            .map(|group| array_field(group, "matches").iter().map(Match))
    }

    /// Every match across all channel groups, in feed order.
    pub fn matches(&self) -> impl Iterator<Item = Match<'_>> {
        self.channel_groups().flatten()
    }

    /// Total number of matches across all channel groups.
    #[must_use]
    pub fn match_count(&self) -> usize {
        self.matches().count()
    }

    /// Looks up a match by id.
    #[must_use]
    pub fn find(&self, match_id: i64) -> Option<Match<'_>> {
        self.matches().find(|m| m.id() == Some(match_id))
    }
}

/// Read-only view of one scheduled match.
#[derive(Debug, Clone, Copy)]
pub struct Match<'a>(&'a Value);

impl<'a> Match<'a> {
    /// Match id, unique within a competition.
    #[must_use]
    pub fn id(&self) -> Option<i64> {
        int_field(self.0, "id")
    }

    /// Kick-off, epoch seconds.
    #[must_use]
    pub fn start(&self) -> Option<i64> {
        int_field(self.0, "start_datetime")
    }

    /// End, epoch seconds.
    #[must_use]
    pub fn end(&self) -> Option<i64> {
        int_field(self.0, "end_datetime")
    }

    /// Betting cut-off, epoch seconds.
    #[must_use]
    pub fn betstop(&self) -> Option<i64> {
        int_field(self.0, "betstop_datetime")
    }

    fn group(&self) -> Option<&'a Value> {
        self.0.get("vmatch_group")
    }

    /// Home club id from `vmatch_group`.
    #[must_use]
    pub fn home_club_id(&self) -> Option<i64> {
        self.group().and_then(|g| int_field(g, "home_club_id"))
    }

    /// Away club id from `vmatch_group`.
    #[must_use]
    pub fn away_club_id(&self) -> Option<i64> {
        self.group().and_then(|g| int_field(g, "away_club_id"))
    }

    /// Home team name: `home_team` on `vmatch_group`, else `home_team` or
    /// `home` on the match.
    #[must_use]
    pub fn home_team(&self) -> Option<&'a str> {
        self.team_name("home_team", "home")
    }

    /// Away team name, looked up like [`Match::home_team`].
    #[must_use]
    pub fn away_team(&self) -> Option<&'a str> {
        self.team_name("away_team", "away")
    }

    fn team_name(&self, key: &str, short: &str) -> Option<&'a str> {
        let text = |v: &'a Value| v.as_str().filter(|s| !s.is_empty());
        self.group()
            .and_then(|g| g.get(key))
            .and_then(text)
            .or_else(|| self.0.get(key).and_then(text))
            .or_else(|| self.0.get(short).and_then(text))
    }

    /// Round label: `round`, else `matchday`, on the match or its
    /// `vmatch_group`.
    #[must_use]
    pub fn round_label(&self) -> Option<String> {
        let pick = |obj: &Value| {
            ["round", "matchday"]
                .iter()
                .filter_map(|key| obj.get(*key))
                .find(|v| !v.is_null())
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
        };
        pick(self.0).or_else(|| self.group().and_then(pick))
    }

    /// Raw field access, for tabular export.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&'a Value> {
        self.0.get(key)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    fn timings() -> TimingsSnapshot {
        TimingsSnapshot::new(json!({
            "competition": {"id": 42},
            "server_datetime": 998,
            "channels": [
                {"id": 1, "match_id": 10, "next_match_id": 11, "active_phase_end_datetime": 1000},
                {"id": 2, "match_id": 20, "next_match_id": 21}
            ]
        }))
    }

    #[test]
    fn reads_competition_and_clock() {
        let t = timings();
        assert_eq!(t.competition_id(), Some(CompetitionId::new(42)));
        assert_eq!(t.server_datetime(), Some(998));
    }

    #[test]
    fn competition_id_accepts_numeric_string() {
        let t = TimingsSnapshot::new(json!({"competition": {"id": "43"}}));
        assert_eq!(t.competition_id(), Some(CompetitionId::new(43)));
    }

    #[test]
    fn competition_id_rejects_non_integer() {
        let t = TimingsSnapshot::new(json!({"competition": {"id": "abc"}}));
        assert_eq!(t.competition_id(), None);
        let t = TimingsSnapshot::new(json!({"competition": {}}));
        assert_eq!(t.competition_id(), None);
        let t = TimingsSnapshot::new(json!({"competition": {"id": 4.5}}));
        assert_eq!(t.competition_id(), None);
    }

    #[test]
    fn channel_views() {
        let t = timings();
        let channels: Vec<_> = t.channels().collect();
        assert_eq!(channels.len(), 2);
        let Some(first) = channels.first() else {
            panic!("expected a channel");
        };
        assert_eq!(first.id(), Some(1));
        assert_eq!(first.next_match_id(), Some(11));
        assert_eq!(first.active_phase_end(), Some(1000));
        let Some(second) = channels.get(1) else {
            panic!("expected a second channel");
        };
        assert_eq!(second.active_phase_end(), None);
    }

    #[test]
    fn raw_fallback_has_no_channels() {
        let t = TimingsSnapshot::from_fetched(Fetched::RawFallback("oops".to_string()));
        assert_eq!(t.channels().count(), 0);
        assert_eq!(t.competition_id(), None);
        assert_eq!(t.document(), &json!({"raw": "oops"}));
    }

    #[test]
    fn matches_across_groups() {
        let m = MatchesSnapshot::new(json!({
            "channels": [
                {"matches": [
                    {"id": 1, "start_datetime": 100, "vmatch_group": {"home_club_id": 5, "away_club_id": 6}},
                    {"id": 2}
                ]},
                {"matches": [{"id": 3, "round": 7}]},
                {}
            ]
        }));
        assert_eq!(m.match_count(), 3);
        assert_eq!(m.channel_groups().count(), 3);
        let Some(first) = m.find(1) else {
            panic!("match 1 missing");
        };
        assert_eq!(first.start(), Some(100));
        assert_eq!(first.home_club_id(), Some(5));
        assert_eq!(first.away_club_id(), Some(6));
        assert!(m.find(99).is_none());
    }

    #[test]
    fn round_label_falls_back_to_matchday_and_group() {
        let m = MatchesSnapshot::new(json!({
            "channels": [{"matches": [
                {"id": 1, "round": 3},
                {"id": 2, "matchday": "4"},
                {"id": 3, "vmatch_group": {"round": 5}},
                {"id": 4}
            ]}]
        }));
        let labels: Vec<_> = m.matches().map(|x| x.round_label()).collect();
        assert_eq!(
            labels,
            vec![
                Some("3".to_string()),
                Some("4".to_string()),
                Some("5".to_string()),
                None
            ]
        );
    }

    #[test]
    fn equality_ignores_key_order() {
        let a = TimingsSnapshot::new(
            serde_json::from_str(r#"{"a": 1, "b": {"x": 1, "y": 2}}"#).unwrap_or_default(),
        );
        let b = TimingsSnapshot::new(
            serde_json::from_str(r#"{"b": {"y": 2, "x": 1}, "a": 1}"#).unwrap_or_default(),
        );
        assert_eq!(a, b);
    }

    #[test]
    fn team_names_prefer_group_then_match_fields() {
        let m = MatchesSnapshot::new(json!({
            "channels": [{"matches": [
                {"id": 1, "home_team": "B", "vmatch_group": {"home_team": "A", "away_team": ""}, "away": "C"},
                {"id": 2}
            ]}]
        }));
        let Some(first) = m.find(1) else {
            panic!("match 1 missing");
        };
        assert_eq!(first.home_team(), Some("A"));
        assert_eq!(first.away_team(), Some("C"));
        let Some(second) = m.find(2) else {
            panic!("match 2 missing");
        };
        assert_eq!(second.home_team(), None);
    }

    #[test]
    fn competition_name_is_optional() {
        let t = TimingsSnapshot::new(json!({"competition": {"id": 1, "name": "League"}}));
        assert_eq!(t.competition_name(), Some("League"));
        assert_eq!(timings().competition_name(), None);
    }
}
