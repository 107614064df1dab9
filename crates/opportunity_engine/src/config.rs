//! Scoring thresholds. One place, no per-script copies.

use serde::{Deserialize, Serialize};

/// Favorite trailing becomes actionable from this minute
pub const MIN_MINUTE_TRAILING: u32 = 45;
/// Level score becomes actionable from this minute
pub const MIN_MINUTE_DRAW: u32 = 45;
/// One-goal deficit from here on is the strongest signal
pub const MIN_MINUTE_LATE_GAME: u32 = 60;
/// From here a one-goal deficit only asks for "any goal"
pub const LATE_GAME_THRESHOLD: u32 = 75;
/// Favorite's live win odd at which a level score turns into value
pub const DRAW_VALUE_ODD: f64 = 1.80;
/// attacks_for > ratio * attacks_against
pub const DOMINATION_RATIO: f64 = 1.5;
pub const MIN_MINUTE_DOMINATION: u32 = 45;
pub const DOMINATION_BONUS: u8 = 10;
/// Goal lines are matched to the target threshold within this distance
pub const GOAL_LINE_TOLERANCE: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScorerConfig {
    pub min_minute_trailing:   u32,
    pub min_minute_draw:       u32,
    pub min_minute_late_game:  u32,
    pub late_game_threshold:   u32,
    pub draw_value_odd:        f64,
    pub domination_ratio:      f64,
    pub min_minute_domination: u32,
    pub domination_bonus:      u8,
    pub goal_line_tolerance:   f64,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            min_minute_trailing:   MIN_MINUTE_TRAILING,
            min_minute_draw:       MIN_MINUTE_DRAW,
            min_minute_late_game:  MIN_MINUTE_LATE_GAME,
            late_game_threshold:   LATE_GAME_THRESHOLD,
            draw_value_odd:        DRAW_VALUE_ODD,
            domination_ratio:      DOMINATION_RATIO,
            min_minute_domination: MIN_MINUTE_DOMINATION,
            domination_bonus:      DOMINATION_BONUS,
            goal_line_tolerance:   GOAL_LINE_TOLERANCE,
        }
    }
}
