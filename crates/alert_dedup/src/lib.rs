/// favori-live — Alert Dedup
///
/// Decides whether a verdict is a *new* situation worth a notification.
/// Key = match + scenario + level + suggested action. No timestamp, no raw
/// score: a match stuck in the same state across scans fires once.
///
/// Seeded from persisted alerts on startup so a restart doesn't re-spam.

use anyhow::Result;
use chrono::{DateTime, Utc};
use match_state::MatchStateSnapshot;
use opportunity_engine::{ExtraOdds, Level, Opportunity, Scenario};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info};

/// Below this nothing is alert-worthy.
pub const MIN_ALERT_SCORE: u8 = 50;

pub fn is_alert_worthy(opp: &Opportunity) -> bool {
    opp.score >= MIN_ALERT_SCORE
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

/// Backslash-escape the separator so free-text fields cannot forge a key.
fn escape_field(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('|', "\\|")
}

impl Fingerprint {
    pub fn of(match_id: &str, opp: &Opportunity) -> Self {
        Self(format!(
            "{}|{}|{}|{}",
            escape_field(match_id),
            opp.scenario.as_str(),
            opp.level.as_str(),
            escape_field(opp.suggested_action.as_deref().unwrap_or("-")),
        ))
    }

    /// Rebuild from a stored key.
    pub fn from_stored(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Records ──────────────────────────────────────────────────────────────────

/// A verdict that passed dedup, with everything the store and notifier need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub fingerprint: Fingerprint,
    pub match_id:    String,
    pub computed_at: DateTime<Utc>,
    pub snapshot:    MatchStateSnapshot,
    pub opportunity: Opportunity,
}

impl AlertRecord {
    pub fn new(snapshot: MatchStateSnapshot, opportunity: Opportunity, computed_at: DateTime<Utc>) -> Self {
        Self {
            fingerprint: Fingerprint::of(&snapshot.match_id, &opportunity),
            match_id: snapshot.match_id.clone(),
            computed_at,
            snapshot,
            opportunity,
        }
    }

    pub fn notice(&self) -> AlertNotice {
        AlertNotice {
            level:             self.opportunity.level,
            scenario:          self.opportunity.scenario,
            match_description: self.snapshot.description(),
            league:            self.snapshot.league.clone(),
            score:             self.snapshot.score.map(|s| s.to_string()),
            minute:            self.snapshot.elapsed_minutes,
            reasons:           self.opportunity.reasons.clone(),
            suggested_action:  self.opportunity.suggested_action.clone(),
            extra_odds:        self.opportunity.extra_odds,
            confidence:        self.opportunity.score,
            computed_at:       self.computed_at,
        }
    }
}

/// Structured fields handed to the notifier. Rendering is the notifier's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertNotice {
    pub level:             Level,
    pub scenario:          Scenario,
    pub match_description: String,
    pub league:            String,
    pub score:             Option<String>,
    pub minute:            Option<u32>,
    pub reasons:           Vec<String>,
    pub suggested_action:  Option<String>,
    pub extra_odds:        ExtraOdds,
    pub confidence:        u8,
    pub computed_at:       DateTime<Utc>,
}

// ── Dedup ────────────────────────────────────────────────────────────────────

/// Source of previously delivered alerts (the store, in production).
pub trait AlertHistory {
    fn fingerprints(&self) -> Result<Vec<Fingerprint>>;
}

impl AlertHistory for Vec<Fingerprint> {
    fn fingerprints(&self) -> Result<Vec<Fingerprint>> {
        Ok(self.clone())
    }
}

#[derive(Debug, Default)]
pub struct AlertDeduplicator {
    sent: HashSet<Fingerprint>,
}

impl AlertDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(history: &dyn AlertHistory) -> Result<Self> {
        let mut dedup = Self::new();
        let seeded = dedup.seed(history.fingerprints()?);
        info!("Alert dedup seeded with {} previously sent alerts", seeded);
        Ok(dedup)
    }

    /// Returns how many new keys were added.
    pub fn seed(&mut self, fingerprints: impl IntoIterator<Item = Fingerprint>) -> usize {
        let before = self.sent.len();
        self.sent.extend(fingerprints);
        self.sent.len() - before
    }

    pub fn should_alert(&self, fingerprint: &Fingerprint) -> bool {
        let fresh = !self.sent.contains(fingerprint);
        if !fresh {
            debug!(%fingerprint, "alert suppressed, already sent");
        }
        fresh
    }

    /// Mark as sent. Returns false if it was already there.
    pub fn record(&mut self, fingerprint: Fingerprint) -> bool {
        self.sent.insert(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.sent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.is_empty()
    }
}
