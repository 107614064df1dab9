/// favori-live — Match State
///
/// Normalized per-match observation fed to the opportunity engine.
///   - `WorklistEntry`: a screened favorite waiting to be scanned
///   - `RawLiveData`: whatever the scraper sidecar managed to read off the page
///   - `MatchStateSnapshot`: the validated, typed view of one scan
///
/// Garbled numeric fields become `None` here so the scorer can degrade to
/// its zero verdict instead of failing.

pub mod clock;
pub mod feed;
pub mod screen;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use thiserror::Error;

pub use clock::{parse_clock, ClockCheck, ElapsedTracker};

// ── Enums ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Home,
    Away,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::Home => Side::Away,
            Side::Away => Side::Home,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    Upcoming,
    Live,
    Finished,
    NotReady,
    Unknown,
}

impl MatchStatus {
    /// Anything the sidecar reports that we don't recognise is `Unknown`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().replace([' ', '-'], "_").as_str() {
            "LIVE" => MatchStatus::Live,
            "UPCOMING" => MatchStatus::Upcoming,
            "FINISHED" => MatchStatus::Finished,
            "NOT_READY" => MatchStatus::NotReady,
            _ => MatchStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Upcoming => "UPCOMING",
            MatchStatus::Live => "LIVE",
            MatchStatus::Finished => "FINISHED",
            MatchStatus::NotReady => "NOT_READY",
            MatchStatus::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeKey {
    HomeWin,
    Draw,
    AwayWin,
    BothTeamsScoreYes,
    BothTeamsScoreNo,
}

impl OutcomeKey {
    pub fn win_for(side: Side) -> Self {
        match side {
            Side::Home => OutcomeKey::HomeWin,
            Side::Away => OutcomeKey::AwayWin,
        }
    }

    /// Accepts our own keys plus the 1/X/2 shorthand bookmakers print.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "HOME_WIN" | "1" => Some(OutcomeKey::HomeWin),
            "DRAW" | "X" => Some(OutcomeKey::Draw),
            "AWAY_WIN" | "2" => Some(OutcomeKey::AwayWin),
            "BOTH_TEAMS_SCORE_YES" | "BTTS_YES" => Some(OutcomeKey::BothTeamsScoreYes),
            "BOTH_TEAMS_SCORE_NO" | "BTTS_NO" => Some(OutcomeKey::BothTeamsScoreNo),
            _ => None,
        }
    }
}

// ── Score / totals / stats ───────────────────────────────────────────────────

/// No real match gets near this; anything above is a misread.
pub const MAX_GOALS: u32 = 99;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Score {
    pub home: u32,
    pub away: u32,
}

impl Score {
    pub fn new(home: u32, away: u32) -> Self {
        Self { home, away }
    }

    /// "2-1", "2 - 1". Anything else is garbled.
    pub fn parse(raw: &str) -> Option<Self> {
        let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
        let (h, a) = compact.split_once('-')?;
        Self::checked(h.parse().ok()?, a.parse().ok()?)
    }

    /// `None` when either side is beyond `MAX_GOALS`.
    pub fn checked(home: u32, away: u32) -> Option<Self> {
        (home <= MAX_GOALS && away <= MAX_GOALS).then_some(Self { home, away })
    }

    pub fn of(&self, side: Side) -> u32 {
        match side {
            Side::Home => self.home,
            Side::Away => self.away,
        }
    }

    pub fn total(&self) -> u32 {
        self.home.saturating_add(self.away)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.home, self.away)
    }
}

/// One over/under line of a goal-totals market.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoalLine {
    pub threshold: f64,
    pub over:      Option<f64>,
    pub under:     Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSide {
    Over,
    Under,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoalTotals {
    pub match_wide: Vec<GoalLine>,
    pub home:       Vec<GoalLine>,
    pub away:       Vec<GoalLine>,
}

impl GoalTotals {
    pub fn for_side(&self, side: Side) -> &[GoalLine] {
        match side {
            Side::Home => &self.home,
            Side::Away => &self.away,
        }
    }
}

/// Groups loose (threshold, side, odd) quotes into lines sorted by threshold.
/// Later quotes for the same threshold and side win.
pub fn organize_lines<I>(quotes: I) -> Vec<GoalLine>
where
    I: IntoIterator<Item = (f64, LineSide, Option<f64>)>,
{
    // thresholds are quarter/half goals, centi-goal keys are exact enough
    let mut grouped: BTreeMap<i64, GoalLine> = BTreeMap::new();
    for (threshold, side, odd) in quotes {
        if !threshold.is_finite() || threshold < 0.0 {
            continue;
        }
        let key = (threshold * 100.0).round() as i64;
        let line = grouped.entry(key).or_insert(GoalLine { threshold, over: None, under: None });
        match side {
            LineSide::Over => line.over = odd,
            LineSide::Under => line.under = odd,
        }
    }
    grouped.into_values().collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatPair {
    pub home: f64,
    pub away: f64,
}

impl StatPair {
    pub fn of(&self, side: Side) -> f64 {
        match side {
            Side::Home => self.home,
            Side::Away => self.away,
        }
    }
}

/// "Dangerous_Attacks " → "dangerous attacks"
pub fn normalize_stat_label(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

// ── Worklist ─────────────────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq)]
pub enum IngestError {
    #[error("match id is empty")]
    EmptyMatchId,
    #[error("match {match_id}: pre-match odd {odd} is not above 1.0")]
    InvalidPreMatchOdd { match_id: String, odd: f64 },
}

/// A screened favorite, as written by `screen-favorites`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorklistEntry {
    pub match_id:      String,
    pub home_team:     String,
    pub away_team:     String,
    #[serde(default)]
    pub league:        String,
    /// "HH:MM" local time, as printed by the bookmaker
    #[serde(default)]
    pub kickoff:       Option<String>,
    #[serde(default)]
    pub favorite_side: Option<Side>,
    #[serde(default)]
    pub pre_match_odd: Option<f64>,
    #[serde(default)]
    pub url:           Option<String>,
}

impl WorklistEntry {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.match_id.trim().is_empty() {
            return Err(IngestError::EmptyMatchId);
        }
        if let Some(odd) = self.pre_match_odd {
            if odd.is_finite() && odd <= 1.0 {
                return Err(IngestError::InvalidPreMatchOdd {
                    match_id: self.match_id.clone(),
                    odd,
                });
            }
        }
        Ok(())
    }

    pub fn description(&self) -> String {
        format!("{} vs {}", self.home_team, self.away_team)
    }

    pub fn team(&self, side: Side) -> &str {
        match side {
            Side::Home => &self.home_team,
            Side::Away => &self.away_team,
        }
    }

    pub fn kickoff_time(&self) -> Option<NaiveTime> {
        self.kickoff.as_deref().and_then(parse_kickoff)
    }
}

pub fn parse_kickoff(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M").ok()
}

// ── Raw sidecar payload ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawGoalLine {
    pub threshold: Value,
    pub over:      Value,
    pub under:     Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawGoalTotals {
    pub match_wide: Vec<RawGoalLine>,
    pub home:       Vec<RawGoalLine>,
    pub away:       Vec<RawGoalLine>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawStatPair {
    pub home: Value,
    pub away: Value,
}

/// What the scraper sidecar returns for one match page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawLiveData {
    pub status:          Option<String>,
    pub score:           Option<String>,
    pub half_time_score: Option<String>,
    /// running clock, "MM:SS" or "MM"
    pub clock:           Option<String>,
    pub live_odds:       HashMap<String, Value>,
    pub goal_totals:     RawGoalTotals,
    pub stats:           HashMap<String, RawStatPair>,
    /// bookmaker's live-event JSON, when the sidecar captured it
    pub event_feed:      Option<Value>,
}

/// Decimal odd from a number or a string ("1,85" included).
/// Placeholders like "-" or "N/A" and anything not above 1.0 are unavailable.
pub fn parse_odd(value: &Value) -> Option<f64> {
    let odd = parse_number(value)?;
    (odd > 1.0).then_some(odd)
}

fn parse_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').replace(',', ".").parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn parse_stat(value: &Value) -> Option<f64> {
    parse_number(value).filter(|v| *v >= 0.0)
}

fn parse_raw_lines(raw: &[RawGoalLine]) -> Vec<GoalLine> {
    organize_lines(raw.iter().filter_map(|l| parse_number(&l.threshold).map(|t| (t, l))).flat_map(
        |(t, l)| [(t, LineSide::Over, parse_odd(&l.over)), (t, LineSide::Under, parse_odd(&l.under))],
    ))
}

// ── Snapshot ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchStateSnapshot {
    pub match_id:        String,
    pub home_team:       String,
    pub away_team:       String,
    pub league:          String,
    pub kickoff_time:    Option<NaiveTime>,
    pub favorite_side:   Option<Side>,
    pub pre_match_odd:   Option<f64>,
    pub status:          MatchStatus,
    /// `None` = the sidecar sent something we could not read
    pub score:           Option<Score>,
    pub elapsed_minutes: Option<u32>,
    pub half_time_score: Option<Score>,
    pub live_odds:       BTreeMap<OutcomeKey, f64>,
    pub goal_totals:     GoalTotals,
    pub live_stats:      BTreeMap<String, StatPair>,
}

impl MatchStateSnapshot {
    /// Identity-only snapshot for a match whose page never became readable.
    pub fn not_ready(entry: &WorklistEntry) -> Self {
        Self::with_status(entry, MatchStatus::NotReady)
    }

    fn with_status(entry: &WorklistEntry, status: MatchStatus) -> Self {
        Self {
            match_id:        entry.match_id.clone(),
            home_team:       entry.home_team.clone(),
            away_team:       entry.away_team.clone(),
            league:          entry.league.clone(),
            kickoff_time:    entry.kickoff_time(),
            favorite_side:   entry.favorite_side,
            pre_match_odd:   entry.pre_match_odd,
            status,
            score:           Some(Score::default()),
            elapsed_minutes: Some(0),
            half_time_score: None,
            live_odds:       BTreeMap::new(),
            goal_totals:     GoalTotals::default(),
            live_stats:      BTreeMap::new(),
        }
    }

    /// Merge a worklist entry with the sidecar's page read.
    /// The event feed, when present, wins over page-level fields.
    pub fn normalize(entry: &WorklistEntry, raw: &RawLiveData) -> Result<Self, IngestError> {
        entry.validate()?;

        let status = raw.status.as_deref().map(MatchStatus::parse).unwrap_or(MatchStatus::Unknown);
        let mut snap = Self::with_status(entry, status);
        let decoded = raw.event_feed.as_ref().map(feed::decode);

        snap.score = match decoded.as_ref().and_then(|d| d.score) {
            Some(score) => Some(score),
            None => raw.score.as_deref().map_or(Some(Score::default()), Score::parse),
        };

        let clock = decoded.as_ref().and_then(|d| d.clock.clone()).or_else(|| raw.clock.clone());
        snap.elapsed_minutes = clock.as_deref().map_or(Some(0), parse_clock);

        snap.half_time_score = raw.half_time_score.as_deref().and_then(Score::parse);

        for (key, value) in &raw.live_odds {
            if let (Some(k), Some(odd)) = (OutcomeKey::parse(key), parse_odd(value)) {
                snap.live_odds.insert(k, odd);
            }
        }

        snap.goal_totals = GoalTotals {
            match_wide: parse_raw_lines(&raw.goal_totals.match_wide),
            home:       parse_raw_lines(&raw.goal_totals.home),
            away:       parse_raw_lines(&raw.goal_totals.away),
        };

        if let Some(d) = decoded {
            snap.live_odds.extend(d.live_odds);
            if !d.goal_totals.match_wide.is_empty() {
                snap.goal_totals.match_wide = d.goal_totals.match_wide;
            }
            if !d.goal_totals.home.is_empty() {
                snap.goal_totals.home = d.goal_totals.home;
            }
            if !d.goal_totals.away.is_empty() {
                snap.goal_totals.away = d.goal_totals.away;
            }
        }

        for (label, pair) in &raw.stats {
            if let (Some(home), Some(away)) = (parse_stat(&pair.home), parse_stat(&pair.away)) {
                snap.live_stats.insert(normalize_stat_label(label), StatPair { home, away });
            }
        }

        Ok(snap)
    }

    pub fn team(&self, side: Side) -> &str {
        match side {
            Side::Home => &self.home_team,
            Side::Away => &self.away_team,
        }
    }

    pub fn description(&self) -> String {
        format!("{} vs {}", self.home_team, self.away_team)
    }

    pub fn live_odd(&self, key: OutcomeKey) -> Option<f64> {
        self.live_odds.get(&key).copied()
    }

    pub fn stat(&self, label: &str) -> Option<StatPair> {
        self.live_stats.get(&normalize_stat_label(label)).copied()
    }

    pub fn is_live(&self) -> bool {
        self.status == MatchStatus::Live
    }
}
