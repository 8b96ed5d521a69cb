//! Per-match odds from the live odds feed.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use super::snapshot::as_integer;

/// Odds type id of the main 1X2 market.
const MAIN_MARKET: i64 = 2;

/// Outcome field ids belonging to the main 1X2 market.
const MAIN_OUTCOMES: [i64; 3] = [1, 2, 3];

/// Home/away names and the 1X2 prices of one match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchOdds {
    /// Match the odds belong to.
    pub match_id: i64,
    /// Home team name, empty if the feed does not carry it.
    pub home: String,
    /// Away team name, empty if the feed does not carry it.
    pub away: String,
    /// Home win price.
    pub home_win: Option<String>,
    /// Draw price.
    pub draw: Option<String>,
    /// Away win price.
    pub away_win: Option<String>,
}

impl MatchOdds {
    /// Reads a `match_odds2` document (`{"doc": [{"data": {...}}]}`).
    ///
    /// Prices come from the main market (`_otid == 2`, `_fid` 1..=3); if
    /// that market is absent the first price seen per outcome is used.
    #[must_use]
    pub fn from_document(match_id: i64, document: &Value) -> Self {
        let data = document
            .get("doc")
            .and_then(Value::as_array)
            .and_then(|docs| docs.first())
            .and_then(|doc| doc.get("data"));
        let Some(data) = data else {
            return Self {
                match_id,
                ..Self::default()
            };
        };

        let team = |side: &str| {
            data.pointer(&format!("/teams/{side}/name"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let offers = data
            .get("odds")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut prices = main_market(offers);
        if prices.iter().all(Option::is_none) {
            prices = first_seen(offers);
        }
        let [home_win, draw, away_win] = prices;
        Self {
            match_id,
            home: team("home"),
            away: team("away"),
            home_win,
            draw,
            away_win,
        }
    }
}

impl fmt::Display for MatchOdds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |p: &Option<String>| p.clone().unwrap_or_else(|| "-".to_string());
        write!(
            f,
            "{}: {} vs {} | 1={} X={} 2={}",
            self.match_id,
            self.home,
            self.away,
            show(&self.home_win),
            show(&self.draw),
            show(&self.away_win)
        )
    }
}

type Prices = [Option<String>; 3];

fn outcome_slot(offer: &Value) -> Option<usize> {
    match offer.get("fieldname").and_then(Value::as_str)? {
        "1" => Some(0),
        "x" => Some(1),
        "2" => Some(2),
        _ => None,
    }
}

fn price(offer: &Value) -> Option<String> {
    match offer.get("value")? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Main-market prices; a later offer for the same outcome wins.
fn main_market(offers: &[Value]) -> Prices {
    let mut prices = Prices::default();
    for offer in offers {
        let in_market = offer.get("_otid").and_then(as_integer) == Some(MAIN_MARKET)
            && offer
                .get("_fid")
                .and_then(as_integer)
                .is_some_and(|fid| MAIN_OUTCOMES.contains(&fid));
        if !in_market {
            continue;
        }
        if let Some(slot) = outcome_slot(offer).and_then(|i| prices.get_mut(i)) {
            *slot = price(offer);
        }
    }
    prices
}

/// First price seen per outcome, whatever the market.
fn first_seen(offers: &[Value]) -> Prices {
    let mut prices = Prices::default();
    for offer in offers {
        let slot = outcome_slot(offer)
            .and_then(|i| prices.get_mut(i))
            .filter(|slot| slot.is_none());
        if let Some(slot) = slot {
            *slot = price(offer);
        }
    }
    prices
}
