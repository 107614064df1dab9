//! Decoder for the bookmaker's live-event JSON.
//!
//! Shape (only what we read):
//!   Value.SC.FS.S1 / S2   current score
//!   Value.SC.TS           seconds of play
//!   Value.GE[].E          market items `{T, C, P}`, either nested lists or bare objects
//!
//! Market type codes (T):
//!   1 / 2 / 3      home win / draw / away win
//!   180 / 181      both teams to score yes / no
//!   9 / 10         match total over / under at P
//!   11 / 12        home total over / under at P
//!   13 / 14        away total over / under at P

use serde_json::Value;
use std::collections::BTreeMap;

use crate::clock::format_clock;
use crate::{organize_lines, parse_odd, GoalTotals, LineSide, OutcomeKey, Score};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedExtract {
    pub score:       Option<Score>,
    pub clock:       Option<String>,
    pub live_odds:   BTreeMap<OutcomeKey, f64>,
    pub goal_totals: GoalTotals,
}

#[derive(Default)]
struct TotalsAcc {
    match_wide: Vec<(f64, LineSide, Option<f64>)>,
    home:       Vec<(f64, LineSide, Option<f64>)>,
    away:       Vec<(f64, LineSide, Option<f64>)>,
}

pub fn decode(feed: &Value) -> FeedExtract {
    let mut out = FeedExtract::default();
    let Some(val) = feed.get("Value") else {
        return out;
    };

    if let Some(sc) = val.get("SC") {
        if let Some(fs) = sc.get("FS") {
            // an absent side has not scored; a present but unreadable one voids the score
            let goals = |k: &str| match fs.get(k) {
                None => Some(0),
                Some(v) => v.as_u64().and_then(|g| u32::try_from(g).ok()),
            };
            out.score = match (goals("S1"), goals("S2")) {
                (Some(home), Some(away)) => Score::checked(home, away),
                _ => None,
            };
        }
        if let Some(ts) = sc.get("TS").and_then(Value::as_u64) {
            out.clock = Some(format_clock(ts));
        }
    }

    let mut totals = TotalsAcc::default();
    let groups = val.get("GE").and_then(Value::as_array).map(Vec::as_slice).unwrap_or_default();
    for group in groups {
        let Some(events) = group.get("E").and_then(Value::as_array) else {
            continue;
        };
        for ev in events {
            match ev {
                Value::Array(items) => {
                    for item in items {
                        apply_item(item, &mut out, &mut totals);
                    }
                }
                Value::Object(_) => apply_item(ev, &mut out, &mut totals),
                _ => {}
            }
        }
    }

    out.goal_totals = GoalTotals {
        match_wide: organize_lines(totals.match_wide),
        home:       organize_lines(totals.home),
        away:       organize_lines(totals.away),
    };
    out
}

fn apply_item(item: &Value, out: &mut FeedExtract, totals: &mut TotalsAcc) {
    let (Some(t), Some(c)) = (item.get("T").and_then(Value::as_i64), item.get("C")) else {
        return;
    };
    let odd = parse_odd(c);
    let threshold = item.get("P").and_then(Value::as_f64);

    let outcome = match t {
        1 => Some(OutcomeKey::HomeWin),
        2 => Some(OutcomeKey::Draw),
        3 => Some(OutcomeKey::AwayWin),
        180 => Some(OutcomeKey::BothTeamsScoreYes),
        181 => Some(OutcomeKey::BothTeamsScoreNo),
        _ => None,
    };
    if let Some(key) = outcome {
        if let Some(odd) = odd {
            out.live_odds.insert(key, odd);
        }
        return;
    }

    let Some(p) = threshold else {
        return;
    };
    let (bucket, side) = match t {
        9 => (&mut totals.match_wide, LineSide::Over),
        10 => (&mut totals.match_wide, LineSide::Under),
        11 => (&mut totals.home, LineSide::Over),
        12 => (&mut totals.home, LineSide::Under),
        13 => (&mut totals.away, LineSide::Over),
        14 => (&mut totals.away, LineSide::Under),
        _ => return,
    };
    bucket.push((p, side, odd));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_markets() {
        let feed = json!({
            "Value": {
                "SC": { "FS": { "S2": 1 }, "TS": 4210 },
                "GE": [
                    { "E": [
                        [ { "T": 1, "C": 2.85 }, { "T": 2, "C": 3.2 }, { "T": 3, "C": 2.6 } ],
                        [ { "T": 180, "C": 1.75 }, { "T": 181, "C": 2.0 } ]
                    ] },
                    { "E": [
                        { "T": 9, "C": 1.55, "P": 1.5 },
                        { "T": 10, "C": 2.35, "P": 1.5 },
                        { "T": 9, "C": 3.1, "P": 2.5 },
                        { "T": 9, "C": 1.12, "P": 0.5 },
                        { "T": 11, "C": 1.9, "P": 0.5 },
                        { "T": 14, "C": 1.3, "P": 1.5 },
                        { "T": 9, "C": 1.8 }
                    ] },
                    { "E": "garbage" }
                ]
            }
        });

        let out = decode(&feed);
        assert_eq!(out.score, Some(Score::new(0, 1)));
        assert_eq!(out.clock.as_deref(), Some("70:10"));
        assert_eq!(out.live_odds.get(&OutcomeKey::HomeWin), Some(&2.85));
        assert_eq!(out.live_odds.get(&OutcomeKey::BothTeamsScoreNo), Some(&2.0));
        assert_eq!(out.live_odds.len(), 5);

        let mw = &out.goal_totals.match_wide;
        assert_eq!(mw.iter().map(|l| l.threshold).collect::<Vec<_>>(), vec![0.5, 1.5, 2.5]);
        assert_eq!(mw[1].over, Some(1.55));
        assert_eq!(mw[1].under, Some(2.35));
        assert_eq!(mw[2].under, None);

        assert_eq!(out.goal_totals.home.len(), 1);
        assert_eq!(out.goal_totals.away[0].under, Some(1.3));
        assert_eq!(out.goal_totals.away[0].over, None);
    }

    #[test]
    fn test_decode_unreadable_goal_counts_drop_score() {
        let huge = json!({ "Value": { "SC": { "FS": { "S1": 4294967296u64, "S2": 1 } } } });
        assert_eq!(decode(&huge).score, None);

        let text = json!({ "Value": { "SC": { "FS": { "S1": "two" } } } });
        assert_eq!(decode(&text).score, None);

        let blank = json!({ "Value": { "SC": { "FS": {} } } });
        assert_eq!(decode(&blank).score, Some(Score::new(0, 0)));
    }

    #[test]
    fn test_decode_without_value_is_empty() {
        assert_eq!(decode(&json!({ "Error": "not found" })), FeedExtract::default());
        assert_eq!(decode(&json!(null)), FeedExtract::default());
    }
}
