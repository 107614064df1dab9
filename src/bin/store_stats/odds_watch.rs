//! Live 1/X/2 odd drops and swings between the last two scans of a match.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use match_state::OutcomeKey;
use rusqlite::{params, Connection};
use serde::Deserialize;
use std::collections::BTreeMap;

/// A drop at least this large (percent of the previous odd) is reported
pub const MIN_DROP_PCT: f64 = 10.0;
pub const DROP_WINDOW_MIN: i64 = 60;
/// Any 1/X/2 odd moving at least this much, either way
pub const MIN_MOVE_PCT: f64 = 5.0;
pub const MOVE_WINDOW_MIN: i64 = 120;

const RESULT_MARKETS: [(OutcomeKey, &str); 3] = [
    (OutcomeKey::HomeWin, "1"),
    (OutcomeKey::Draw, "X"),
    (OutcomeKey::AwayWin, "2"),
];

/// The slice of a stored snapshot this module needs.
#[derive(Deserialize)]
struct OddsView {
    #[serde(default)]
    home_team: String,
    #[serde(default)]
    away_team: String,
    #[serde(default)]
    live_odds: BTreeMap<OutcomeKey, f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OddsObservation {
    pub ts:   DateTime<Utc>,
    /// 1 / X / 2
    pub odds: [Option<f64>; 3],
}

#[derive(Debug, Clone, PartialEq)]
pub struct OddsPair {
    pub match_id: String,
    pub teams:    String,
    pub previous: OddsObservation,
    pub latest:   OddsObservation,
}

impl OddsPair {
    pub fn minutes_between(&self) -> f64 {
        (self.latest.ts - self.previous.ts).num_seconds() as f64 / 60.0
    }

    /// Percent change per market, `None` where either scan lacked the odd.
    pub fn changes(&self) -> [Option<f64>; 3] {
        let mut out = [None; 3];
        for (i, slot) in out.iter_mut().enumerate() {
            if let (Some(old), Some(new)) = (self.previous.odds[i], self.latest.odds[i]) {
                *slot = Some((new - old) / old * 100.0);
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OddsDrop {
    pub match_id:        String,
    pub teams:           String,
    pub market:          &'static str,
    pub old_odd:         f64,
    pub new_odd:         f64,
    pub drop_pct:        f64,
    pub minutes_between: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    Drop,
    Rise,
}

impl MoveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoveKind::Drop => "DROP",
            MoveKind::Rise => "RISE",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OddsMovement {
    pub match_id:        String,
    pub teams:           String,
    pub changes:         [Option<f64>; 3],
    pub max_change:      f64,
    pub kind:            MoveKind,
    pub minutes_between: f64,
}

fn result_odds(live_odds: &BTreeMap<OutcomeKey, f64>) -> [Option<f64>; 3] {
    RESULT_MARKETS.map(|(key, _)| live_odds.get(&key).copied().filter(|o| *o > 1.0))
}

/// Last two scans carrying any 1/X/2 odd, for every match scanned since `since`.
pub fn load_pairs(conn: &Connection, since: DateTime<Utc>) -> Result<Vec<OddsPair>> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT match_id, ts, snapshot_json FROM scan_history
            WHERE match_id IN (
                SELECT match_id FROM scan_history GROUP BY match_id HAVING MAX(ts) >= ?1
            )
            ORDER BY match_id, ts DESC
            "#,
        )
        .context("prepare odds history")?;
    let rows = stmt
        .query_map(params![since.to_rfc3339()], |r| {
            Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?, r.get::<_, String>(2)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("read odds history")?;

    let mut grouped: BTreeMap<String, (String, Vec<OddsObservation>)> = BTreeMap::new();
    for (match_id, ts, snapshot_json) in rows {
        let (Ok(ts), Ok(view)) = (
            DateTime::parse_from_rfc3339(&ts),
            serde_json::from_str::<OddsView>(&snapshot_json),
        ) else {
            continue;
        };
        let odds = result_odds(&view.live_odds);
        if odds.iter().all(Option::is_none) {
            continue;
        }

        let (_, seen) = grouped
            .entry(match_id)
            .or_insert_with(|| (format!("{} vs {}", view.home_team, view.away_team), Vec::new()));
        if seen.len() < 2 {
            seen.push(OddsObservation { ts: ts.with_timezone(&Utc), odds });
        }
    }

    Ok(grouped
        .into_iter()
        .filter_map(|(match_id, (teams, mut seen))| {
            if seen.len() < 2 {
                return None;
            }
            let previous = seen.pop()?;
            let latest = seen.pop()?;
            Some(OddsPair { match_id, teams, previous, latest })
        })
        .collect())
}

/// One entry per market that shortened by at least `min_pct`, biggest first.
pub fn find_drops(pairs: &[OddsPair], min_pct: f64) -> Vec<OddsDrop> {
    let mut drops = Vec::new();
    for p in pairs {
        for (i, change) in p.changes().into_iter().enumerate() {
            let (Some(change), Some(old_odd), Some(new_odd)) = (change, p.previous.odds[i], p.latest.odds[i]) else {
                continue;
            };
            if -change < min_pct {
                continue;
            }
            drops.push(OddsDrop {
                match_id: p.match_id.clone(),
                teams: p.teams.clone(),
                market: RESULT_MARKETS[i].1,
                old_odd,
                new_odd,
                drop_pct: -change,
                minutes_between: p.minutes_between(),
            });
        }
    }
    drops.sort_by(|a, b| b.drop_pct.total_cmp(&a.drop_pct));
    drops
}

/// Matches where any 1/X/2 odd moved at least `min_pct` either way, biggest first.
pub fn find_movements(pairs: &[OddsPair], min_pct: f64) -> Vec<OddsMovement> {
    let mut moves: Vec<OddsMovement> = pairs
        .iter()
        .filter_map(|p| {
            let changes = p.changes();
            let max_change = changes.iter().flatten().map(|c| c.abs()).fold(0.0, f64::max);
            if max_change < min_pct {
                return None;
            }
            let kind = if changes.iter().flatten().any(|c| *c < 0.0) {
                MoveKind::Drop
            } else {
                MoveKind::Rise
            };
            Some(OddsMovement {
                match_id: p.match_id.clone(),
                teams: p.teams.clone(),
                changes,
                max_change,
                kind,
                minutes_between: p.minutes_between(),
            })
        })
        .collect();
    moves.sort_by(|a, b| b.max_change.total_cmp(&a.max_change));
    moves
}

pub fn market_labels() -> [&'static str; 3] {
    RESULT_MARKETS.map(|(_, label)| label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use match_state::{MatchStateSnapshot, WorklistEntry};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 4, 20, 0, 0).unwrap()
    }

    fn scan(conn: &Connection, id: &str, minutes_ago: i64, odds: &[(OutcomeKey, f64)]) {
        let entry = WorklistEntry {
            match_id:      id.to_string(),
            home_team:     format!("{id}-home"),
            away_team:     format!("{id}-away"),
            league:        "Bundesliga".to_string(),
            kickoff:       Some("19:30".to_string()),
            favorite_side: None,
            pre_match_odd: None,
            url:           None,
        };
        let mut snap = MatchStateSnapshot::not_ready(&entry);
        snap.live_odds.extend(odds.iter().copied());
        conn.execute(
            "INSERT INTO scan_history(match_id, ts, status, confidence, snapshot_json, opportunity_json) VALUES (?1, ?2, 'LIVE', 0, ?3, '{}')",
            params![
                id,
                (now() - Duration::minutes(minutes_ago)).to_rfc3339(),
                serde_json::to_string(&snap).unwrap()
            ],
        )
        .unwrap();
    }

    fn history() -> Connection {
        use OutcomeKey::*;
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE scan_history (id INTEGER PRIMARY KEY AUTOINCREMENT, match_id TEXT, ts TEXT, status TEXT, confidence INTEGER, snapshot_json TEXT, opportunity_json TEXT);",
        )
        .unwrap();

        scan(&conn, "m-1", 50, &[(HomeWin, 2.0), (Draw, 3.4), (AwayWin, 4.0)]);
        scan(&conn, "m-1", 30, &[(HomeWin, 2.0)]);
        scan(&conn, "m-1", 10, &[(HomeWin, 1.7), (Draw, 3.4), (AwayWin, 5.0)]);

        scan(&conn, "m-2", 20, &[(HomeWin, 1.5)]);
        scan(&conn, "m-2", 5, &[(HomeWin, 1.45)]);
        scan(&conn, "m-2", 2, &[]);

        scan(&conn, "m-3", 200, &[(HomeWin, 3.0)]);
        scan(&conn, "m-3", 150, &[(HomeWin, 2.0)]);

        scan(&conn, "m-4", 40, &[(AwayWin, 2.0)]);
        scan(&conn, "m-4", 1, &[(AwayWin, 2.3)]);

        scan(&conn, "m-5", 3, &[(HomeWin, 1.3)]);
        conn
    }

    #[test]
    fn test_pairs_take_last_two_priced_scans_in_window() {
        let conn = history();
        let pairs = load_pairs(&conn, now() - Duration::minutes(DROP_WINDOW_MIN)).unwrap();
        let ids: Vec<&str> = pairs.iter().map(|p| p.match_id.as_str()).collect();
        assert_eq!(ids, vec!["m-1", "m-2", "m-4"]);
        assert_eq!(pairs[0].minutes_between(), 20.0);
        assert_eq!(pairs[0].previous.odds, [Some(2.0), None, None]);
        assert_eq!(pairs[1].latest.odds[0], Some(1.45));
        assert_eq!(pairs[0].teams, "m-1-home vs m-1-away");
    }

    #[test]
    fn test_drops_above_threshold() {
        let conn = history();
        let pairs = load_pairs(&conn, now() - Duration::minutes(DROP_WINDOW_MIN)).unwrap();
        let drops = find_drops(&pairs, MIN_DROP_PCT);
        assert_eq!(drops.len(), 1);
        assert_eq!((drops[0].match_id.as_str(), drops[0].market), ("m-1", "1"));
        assert_eq!((drops[0].old_odd, drops[0].new_odd), (2.0, 1.7));
        assert!((drops[0].drop_pct - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_movements_both_directions() {
        let conn = history();
        let pairs = load_pairs(&conn, now() - Duration::minutes(MOVE_WINDOW_MIN)).unwrap();
        let moves = find_movements(&pairs, MIN_MOVE_PCT);
        let summary: Vec<(&str, MoveKind)> = moves.iter().map(|m| (m.match_id.as_str(), m.kind)).collect();
        assert_eq!(summary, vec![("m-1", MoveKind::Drop), ("m-4", MoveKind::Rise)]);
        assert!((moves[1].changes[2].unwrap() - 15.0).abs() < 1e-9);
        assert_eq!(moves[1].changes[0], None);
    }
}
