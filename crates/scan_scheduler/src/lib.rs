/// favori-live — Scan Scheduler
///
/// Orders the worklist every cycle: in-play first, then imminent, future,
/// finished, and entries without a readable kickoff last.
/// Buckets are recomputed from the wall clock each call.

use chrono::{NaiveDateTime, NaiveTime};
use match_state::WorklistEntry;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

// ── Windows (minutes relative to kickoff) ────────────────────────────────────

/// Kickoff up to this many minutes ago still counts as in play
pub const IN_PLAY_WINDOW_MIN: i64 = 115;
/// Kickoff within this many minutes counts as imminent
pub const IMMINENT_WINDOW_MIN: i64 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    InPlay    = 0,
    Imminent  = 1,
    Future    = 2,
    Finished  = 3,
    NoKickoff = 4,
}

impl Priority {
    pub fn bucket(self) -> u8 {
        self as u8
    }

    /// Bucket for a match `elapsed` minutes after its kickoff (negative = not started).
    pub fn from_elapsed(elapsed: i64) -> Self {
        Self::from_elapsed_secs(elapsed.saturating_mul(60))
    }

    /// Same windows at second resolution, so 59 s before kickoff is still imminent.
    pub fn from_elapsed_secs(secs: i64) -> Self {
        let in_play = IN_PLAY_WINDOW_MIN * 60;
        let imminent = IMMINENT_WINDOW_MIN * 60;
        if (0..=in_play).contains(&secs) {
            Priority::InPlay
        } else if (-imminent..0).contains(&secs) {
            Priority::Imminent
        } else if secs < -imminent {
            Priority::Future
        } else {
            Priority::Finished
        }
    }
}

/// Anything the orchestrator can schedule.
pub trait ScanTarget {
    fn match_id(&self) -> &str;
    fn kickoff(&self) -> Option<NaiveTime>;
}

impl ScanTarget for WorklistEntry {
    fn match_id(&self) -> &str {
        &self.match_id
    }

    fn kickoff(&self) -> Option<NaiveTime> {
        self.kickoff_time()
    }
}

/// Seconds since kickoff, with kickoff placed on `now`'s date.
pub fn secs_since_kickoff(kickoff: NaiveTime, now: NaiveDateTime) -> i64 {
    (now - now.date().and_time(kickoff)).num_seconds()
}

pub fn priority_of<T: ScanTarget>(item: &T, live_set: &HashSet<String>, now: NaiveDateTime) -> Priority {
    if live_set.contains(item.match_id()) {
        return Priority::InPlay;
    }
    match item.kickoff() {
        Some(kickoff) => Priority::from_elapsed_secs(secs_since_kickoff(kickoff, now)),
        None => Priority::NoKickoff,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PriorityScheduler;

impl PriorityScheduler {
    pub fn new() -> Self {
        Self
    }

    /// Stable: peers in the same bucket keep worklist order, confirmed-live first.
    pub fn order<'a, T: ScanTarget>(
        &self,
        items: &'a [T],
        live_set: &HashSet<String>,
        now: NaiveDateTime,
    ) -> Vec<&'a T> {
        let mut keyed: Vec<(Priority, bool, &'a T)> = items
            .iter()
            .map(|item| {
                let live = live_set.contains(item.match_id());
                (priority_of(item, live_set, now), !live, item)
            })
            .collect();
        keyed.sort_by_key(|(priority, not_live, _)| (*priority, *not_live));

        if let Some((first, _, item)) = keyed.first() {
            debug!(
                "Scan order: {} matches, first {} ({:?})",
                keyed.len(),
                item.match_id(),
                first
            );
        }
        keyed.into_iter().map(|(_, _, item)| item).collect()
    }
}
