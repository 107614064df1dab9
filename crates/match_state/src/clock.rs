//! Running-clock parsing and the per-match elapsed guard.

use std::collections::HashMap;
use tracing::debug;

use crate::MatchStateSnapshot;

/// "67:12" → 67, "67" → 67, "67'" → 67. Anything else is garbled.
/// Stoppage time is not special-cased, "95:30" is simply 95.
pub fn parse_clock(raw: &str) -> Option<u32> {
    let s = raw.trim().trim_end_matches('\'');
    let minutes = match s.split_once(':') {
        Some((m, secs)) => {
            if secs.is_empty() || !secs.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            m
        }
        None => s,
    };
    if minutes.is_empty() || !minutes.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    minutes.parse().ok()
}

/// Feed clocks come as seconds of play.
pub fn format_clock(total_secs: u64) -> String {
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockCheck {
    /// first observation, or not live, or clock unreadable
    Untracked,
    Advanced,
    /// clock went backwards: another fixture behind the same id, or a source glitch
    Regressed { previous: u32, current: u32 },
}

/// Remembers the last elapsed minute of every live match.
#[derive(Debug, Default)]
pub struct ElapsedTracker {
    last_seen: HashMap<String, u32>,
}

impl ElapsedTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, snap: &MatchStateSnapshot) -> ClockCheck {
        let current = match (snap.is_live(), snap.elapsed_minutes) {
            (true, Some(m)) => m,
            _ => return ClockCheck::Untracked,
        };

        match self.last_seen.insert(snap.match_id.clone(), current) {
            None => ClockCheck::Untracked,
            Some(previous) if current < previous => {
                debug!(match_id = %snap.match_id, previous, current, "elapsed clock regressed, re-baselining");
                ClockCheck::Regressed { previous, current }
            }
            Some(_) => ClockCheck::Advanced,
        }
    }

    /// Finished matches stop being tracked.
    pub fn forget(&mut self, match_id: &str) {
        self.last_seen.remove(match_id);
    }

    pub fn len(&self) -> usize {
        self.last_seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MatchStatus, Side, WorklistEntry};

    fn live_at(minute: u32) -> MatchStateSnapshot {
        let entry = WorklistEntry {
            match_id:      "m-7".to_string(),
            home_team:     "Porto".to_string(),
            away_team:     "Vizela".to_string(),
            league:        "Liga Portugal".to_string(),
            kickoff:       None,
            favorite_side: Some(Side::Home),
            pre_match_odd: Some(1.22),
            url:           None,
        };
        let mut snap = MatchStateSnapshot::not_ready(&entry);
        snap.status = MatchStatus::Live;
        snap.elapsed_minutes = Some(minute);
        snap
    }

    #[test]
    fn test_parse_clock_formats() {
        assert_eq!(parse_clock("67:12"), Some(67));
        assert_eq!(parse_clock("00:00"), Some(0));
        assert_eq!(parse_clock("45"), Some(45));
        assert_eq!(parse_clock("88'"), Some(88));
        assert_eq!(parse_clock("95:30"), Some(95));
        assert_eq!(parse_clock("HT"), None);
        assert_eq!(parse_clock("45+2"), None);
        assert_eq!(parse_clock("12:"), None);
        assert_eq!(parse_clock(""), None);
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(3725), "62:05");
        assert_eq!(format_clock(59), "0:59");
    }

    #[test]
    fn test_tracker_detects_regression() {
        let mut tracker = ElapsedTracker::new();
        assert_eq!(tracker.observe(&live_at(50)), ClockCheck::Untracked);
        assert_eq!(tracker.observe(&live_at(50)), ClockCheck::Advanced);
        assert_eq!(tracker.observe(&live_at(58)), ClockCheck::Advanced);
        assert_eq!(
            tracker.observe(&live_at(3)),
            ClockCheck::Regressed { previous: 58, current: 3 }
        );
        // re-baselined on the new value
        assert_eq!(tracker.observe(&live_at(4)), ClockCheck::Advanced);
    }

    #[test]
    fn test_tracker_ignores_non_live() {
        let mut tracker = ElapsedTracker::new();
        let mut snap = live_at(70);
        snap.status = MatchStatus::Finished;
        assert_eq!(tracker.observe(&snap), ClockCheck::Untracked);
        assert!(tracker.is_empty());

        tracker.observe(&live_at(70));
        tracker.forget("m-7");
        assert_eq!(tracker.len(), 0);
    }
}
