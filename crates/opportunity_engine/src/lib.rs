//! Opportunity Engine — live-match scoring
//!
//! Pure rule system, no I/O: one `MatchStateSnapshot` in, one `Opportunity` out.
//! Rules run in a fixed order:
//!   1. favorite trailing after the break
//!   2. level score after the break
//!   3. attacking domination bonus (layers on top of 1/2)
//!   4. goal-market odds for the next goal
//!
//! Anything unreadable in the snapshot gives the zero verdict.

pub mod config;

use match_state::{GoalLine, MatchStateSnapshot, OutcomeKey, Score, Side};
use serde::{Deserialize, Serialize};

pub use config::ScorerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Level {
    None,
    Watch,
    Value,
    Orange,
    Red,
}

impl Level {
    /// Fallback banding, used only when no rule assigned a level.
    pub fn from_score(score: u8) -> Self {
        match score {
            85..=u8::MAX => Level::Red,
            70..=84 => Level::Orange,
            50..=69 => Level::Watch,
            _ => Level::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::None => "NONE",
            Level::Watch => "WATCH",
            Level::Value => "VALUE",
            Level::Orange => "ORANGE",
            Level::Red => "RED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Scenario {
    None,
    FavoriteTrailing,
    LateDraw,
    StatisticalDomination,
}

impl Scenario {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::None => "NONE",
            Scenario::FavoriteTrailing => "FAVORITE_TRAILING",
            Scenario::LateDraw => "LATE_DRAW",
            Scenario::StatisticalDomination => "STATISTICAL_DOMINATION",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Risk {
    Low,
    Medium,
    High,
}

/// Over odds for "one more goal" markets at the current score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtraOdds {
    /// match total over (home + away + 0.5)
    pub match_goal:    Option<f64>,
    /// favorite team total over (favorite goals + 0.5)
    pub favorite_goal: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub score:            u8,
    pub level:            Level,
    pub scenario:         Scenario,
    pub reasons:          Vec<String>,
    pub suggested_action: Option<String>,
    pub risk:             Risk,
    pub extra_odds:       ExtraOdds,
}

impl Opportunity {
    pub fn none() -> Self {
        Self {
            score:            0,
            level:            Level::None,
            scenario:         Scenario::None,
            reasons:          Vec::new(),
            suggested_action: None,
            risk:             Risk::Low,
            extra_odds:       ExtraOdds::default(),
        }
    }
}

impl Default for Opportunity {
    fn default() -> Self {
        Self::none()
    }
}

/// The match seen from the favorite's side of the pitch.
#[derive(Debug, Clone, PartialEq)]
pub struct FavoriteView<'a> {
    pub side:            Side,
    pub team:            &'a str,
    pub score_for:       u32,
    pub score_against:   u32,
    pub live_odd_for:    Option<f64>,
    pub attacks_for:     f64,
    pub attacks_against: f64,
}

impl<'a> FavoriteView<'a> {
    pub fn resolve(snap: &'a MatchStateSnapshot, score: Score) -> Option<Self> {
        let side = snap.favorite_side?;
        let attacks = snap.stat("attacks");
        Some(Self {
            side,
            team:            snap.team(side),
            score_for:       score.of(side),
            score_against:   score.of(side.opponent()),
            live_odd_for:    snap.live_odd(OutcomeKey::win_for(side)),
            attacks_for:     attacks.map_or(0.0, |a| a.of(side)),
            attacks_against: attacks.map_or(0.0, |a| a.of(side.opponent())),
        })
    }

    pub fn gap(&self) -> u32 {
        self.score_against.saturating_sub(self.score_for)
    }
}

/// Over odd of the line at `target`, if the bookmaker quotes it.
pub fn over_odd_at(lines: &[GoalLine], target: f64, tolerance: f64) -> Option<f64> {
    lines
        .iter()
        .find(|l| (l.threshold - target).abs() < tolerance)
        .and_then(|l| l.over)
}

fn fmt_odd(odd: Option<f64>) -> String {
    odd.map_or_else(|| "n/a".to_string(), |o| format!("{o:.2}"))
}

#[derive(Debug, Clone, Default)]
pub struct OpportunityScorer {
    config: ScorerConfig,
}

impl OpportunityScorer {
    pub fn new(config: ScorerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }

    pub fn score(&self, snap: &MatchStateSnapshot) -> Opportunity {
        if !snap.is_live() {
            return Opportunity::none();
        }
        let pre_match_odd = snap.pre_match_odd.filter(|o| o.is_finite() && *o > 1.0);
        let (Some(score), Some(minute), Some(pre_match_odd)) = (snap.score, snap.elapsed_minutes, pre_match_odd)
        else {
            return Opportunity::none();
        };
        let Some(view) = FavoriteView::resolve(snap, score) else {
            return Opportunity::none();
        };

        let mut opp = Opportunity::none();
        let cfg = &self.config;

        if view.score_against > view.score_for && minute >= cfg.min_minute_trailing {
            self.favorite_trailing(&mut opp, &view, score, minute, pre_match_odd);
        } else if view.score_against == view.score_for && minute >= cfg.min_minute_draw {
            self.late_draw(&mut opp, &view, score, minute);
        }

        self.domination_bonus(&mut opp, &view, minute);

        opp.extra_odds = ExtraOdds {
            match_goal: over_odd_at(
                &snap.goal_totals.match_wide,
                score.total() as f64 + 0.5,
                cfg.goal_line_tolerance,
            ),
            favorite_goal: over_odd_at(
                snap.goal_totals.for_side(view.side),
                view.score_for as f64 + 0.5,
                cfg.goal_line_tolerance,
            ),
        };

        if opp.level == Level::None {
            opp.level = Level::from_score(opp.score);
        }
        opp
    }

    fn favorite_trailing(&self, opp: &mut Opportunity, view: &FavoriteView, score: Score, minute: u32, pre_match_odd: f64) {
        let cfg = &self.config;
        opp.scenario = Scenario::FavoriteTrailing;
        opp.reasons.push(format!("{} trailing {} (pre-match odd {})", view.team, score, pre_match_odd));

        let gap = view.gap();
        let (points, level, risk, action) = if gap == 1 && minute >= cfg.min_minute_late_game {
            let action = if minute < cfg.late_game_threshold {
                "bet next goal for the favorite (or double-chance)".to_string()
            } else {
                "bet any goal before full time".to_string()
            };
            (90, Level::Red, Risk::Medium, action)
        } else if gap >= 2 {
            (
                75,
                Level::Orange,
                Risk::High,
                "bet over 0.5 total goals, or favorite's next goal if its odd exceeds 1.60".to_string(),
            )
        } else {
            // one goal down between the break and the hour
            (
                85,
                Level::Red,
                Risk::Medium,
                format!("bet outright favorite win at the current live odd ({})", fmt_odd(view.live_odd_for)),
            )
        };

        opp.score = points;
        opp.level = level;
        opp.risk = risk;
        opp.suggested_action = Some(action);
    }

    fn late_draw(&self, opp: &mut Opportunity, view: &FavoriteView, score: Score, minute: u32) {
        opp.scenario = Scenario::LateDraw;
        opp.reasons.push(format!("level score {score} at minute {minute}"));

        match view.live_odd_for {
            Some(odd) if odd >= self.config.draw_value_odd => {
                opp.score = 80;
                opp.level = Level::Value;
                opp.risk = Risk::Medium;
                opp.suggested_action = Some("bet favorite win (void-on-draw) or any goal late".to_string());
            }
            _ => {
                opp.score = 60;
                opp.level = Level::Watch;
                opp.suggested_action = Some("wait for the odd to rise further".to_string());
            }
        }
    }

    fn domination_bonus(&self, opp: &mut Opportunity, view: &FavoriteView, minute: u32) {
        let cfg = &self.config;
        let dominating = view.attacks_for > view.attacks_against * cfg.domination_ratio
            && minute >= cfg.min_minute_domination
            && view.score_against >= view.score_for;
        if !dominating {
            return;
        }

        opp.score = opp.score.saturating_add(cfg.domination_bonus).min(100);
        opp.reasons.push(format!("{} attacks vs {}", view.attacks_for, view.attacks_against));
        if opp.suggested_action.is_none() {
            opp.suggested_action = Some("bet favorite's next goal".to_string());
        }
        if opp.scenario == Scenario::None {
            opp.scenario = Scenario::StatisticalDomination;
        }
    }
}
