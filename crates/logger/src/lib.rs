/// favori-live — Logger
/// JSONL audit trail, one file per UTC day

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct EventLogger {
    log_dir: PathBuf,
}

impl EventLogger {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        let dir = log_dir.into();
        fs::create_dir_all(&dir).ok();
        Self { log_dir: dir }
    }

    pub fn log<T: Serialize>(&self, event: &T) -> Result<()> {
        let line  = serde_json::to_string(event)?;
        let mut f = OpenOptions::new().create(true).append(true).open(self.today_path())?;
        writeln!(f, "{line}")?;
        Ok(())
    }

    pub fn today_path(&self) -> PathBuf {
        let date = Utc::now().format("%Y-%m-%d").to_string();
        self.log_dir.join(format!("{date}.jsonl"))
    }

    pub fn dir(&self) -> &Path {
        &self.log_dir
    }
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

// ── Event types ──────────────────────────────────────────────────────────────

/// One scan attempt, whatever came back. Skipped for NOT_READY.
#[derive(Serialize, Debug)]
pub struct MatchScanEvent {
    pub ts:         String,
    pub event:      &'static str,   // "MATCH_SCAN"
    pub match_id:   String,
    pub teams:      String,
    pub status:     String,
    pub score:      Option<String>,
    pub minute:     Option<u32>,
    pub priority:   u8,
}

#[derive(Serialize, Debug)]
pub struct OpportunityEvent {
    pub ts:         String,
    pub event:      &'static str,   // "OPPORTUNITY"
    pub match_id:   String,
    pub scenario:   String,
    pub level:      String,
    pub confidence: u8,
    pub action:     Option<String>,
    pub reasons:    Vec<String>,
    pub fresh:      bool,           // false = suppressed by dedup
}

#[derive(Serialize, Debug)]
pub struct AlertDispatchEvent {
    pub ts:          String,
    pub event:       &'static str,  // "ALERT_DISPATCH"
    pub fingerprint: String,
    pub match_id:    String,
    pub recipients:  usize,
    pub delivered:   usize,
}

#[derive(Serialize, Debug)]
pub struct ClockAnomalyEvent {
    pub ts:       String,
    pub event:    &'static str,     // "CLOCK_ANOMALY"
    pub match_id: String,
    pub previous: u32,
    pub current:  u32,
}

#[derive(Serialize, Debug)]
pub struct CycleHeartbeatEvent {
    pub ts:          String,
    pub event:       &'static str,  // "CYCLE_HEARTBEAT"
    pub cycle:       u64,
    pub worklist:    usize,
    pub scanned:     usize,
    pub not_ready:   usize,
    pub live:        usize,
    pub alerts_sent: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appends_one_line_per_event() {
        let dir = std::env::temp_dir().join(format!("favori-logger-{}", std::process::id()));
        let logger = EventLogger::new(&dir);
        for cycle in 1..=2 {
            logger
                .log(&CycleHeartbeatEvent {
                    ts:          now_iso(),
                    event:       "CYCLE_HEARTBEAT",
                    cycle,
                    worklist:    12,
                    scanned:     10,
                    not_ready:   2,
                    live:        3,
                    alerts_sent: 0,
                })
                .unwrap();
        }

        let content = fs::read_to_string(logger.today_path()).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["event"], "CYCLE_HEARTBEAT");
        assert_eq!(lines[1]["cycle"], 2);

        fs::remove_dir_all(logger.dir()).ok();
    }
}
