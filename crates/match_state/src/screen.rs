//! Pre-match favorite screening: turn the day's fixture list into a worklist.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::{parse_odd, Side, WorklistEntry};

/// A win odd strictly below this marks a favorite.
pub const SCREEN_MAX_ODD: f64 = 1.60;

/// One row of the day's fixture list, as produced by the fixture scraper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fixture {
    pub id:     String,
    #[serde(default)]
    pub league: String,
    #[serde(default)]
    pub time:   Option<String>,
    pub home:   String,
    pub away:   String,
    /// "1" / "X" / "2" → odd, as number or string
    #[serde(default)]
    pub odds:   HashMap<String, Value>,
    #[serde(default)]
    pub url:    Option<String>,
}

/// Lowest qualifying win odd, if any side is under `max_odd`.
pub fn screen_favorite(home_odd: Option<f64>, away_odd: Option<f64>, max_odd: f64) -> Option<(Side, f64)> {
    let home = home_odd.filter(|o| *o < max_odd).map(|o| (Side::Home, o));
    let away = away_odd.filter(|o| *o < max_odd).map(|o| (Side::Away, o));
    match (home, away) {
        (Some(h), Some(a)) => Some(if a.1 < h.1 { a } else { h }),
        (h, a) => h.or(a),
    }
}

pub fn screen_fixtures(fixtures: &[Fixture], max_odd: f64) -> Vec<WorklistEntry> {
    let mut picked: Vec<WorklistEntry> = fixtures
        .iter()
        .filter_map(|f| {
            let odd = |k: &str| f.odds.get(k).and_then(parse_odd);
            let (side, odd) = screen_favorite(odd("1"), odd("2"), max_odd)?;
            Some(WorklistEntry {
                match_id:      f.id.clone(),
                home_team:     f.home.clone(),
                away_team:     f.away.clone(),
                league:        f.league.clone(),
                kickoff:       f.time.clone(),
                favorite_side: Some(side),
                pre_match_odd: Some(odd),
                url:           f.url.clone(),
            })
        })
        .collect();

    picked.sort_by(|a, b| a.kickoff.cmp(&b.kickoff));
    picked
}
