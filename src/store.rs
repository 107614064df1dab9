use alert_dedup::{AlertHistory, AlertRecord, Fingerprint};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use match_state::MatchStateSnapshot;
use opportunity_engine::Opportunity;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct ScanRow {
    pub ts:          DateTime<Utc>,
    pub snapshot:    MatchStateSnapshot,
    pub opportunity: Opportunity,
}

#[derive(Debug)]
pub enum StoreMsg {
    Scan(Box<ScanRow>),
    Alert(Box<AlertRecord>),
}

pub fn open(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn = Connection::open(path).with_context(|| format!("open sqlite db at {}", path.display()))?;
    conn.pragma_update(None, "journal_mode", "WAL").ok();
    conn.pragma_update(None, "synchronous", "NORMAL").ok();
    init_schema(&conn)?;
    Ok(conn)
}

/// Writer thread owning an already opened connection, so a bad path fails
/// startup instead of silently dropping writes. Drop every sender, then join, to flush.
pub fn spawn_store_writer(conn: Connection) -> (mpsc::Sender<StoreMsg>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<StoreMsg>(10_000);

    let handle = std::thread::spawn(move || {
        let mut written = 0u64;
        while let Some(msg) = rx.blocking_recv() {
            match apply_msg(&conn, msg) {
                Ok(()) => written += 1,
                // persistence must not stop the scan loop
                Err(e) => warn!("[store] write failed: {:#}", e),
            }
        }
        info!("[store] writer closed after {} writes", written);
    });

    (tx, handle)
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS scan_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            match_id TEXT NOT NULL,
            ts TEXT NOT NULL,
            status TEXT NOT NULL,
            confidence INTEGER NOT NULL,
            snapshot_json TEXT NOT NULL,
            opportunity_json TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_scan_match_ts ON scan_history(match_id, ts);

        CREATE TABLE IF NOT EXISTS alerts (
            fingerprint TEXT PRIMARY KEY,
            match_id TEXT NOT NULL,
            ts TEXT NOT NULL,
            level TEXT NOT NULL,
            record_json TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_alerts_ts ON alerts(ts);
        "#,
    )
    .context("init schema")?;

    Ok(())
}

pub fn apply_msg(conn: &Connection, msg: StoreMsg) -> Result<()> {
    match msg {
        StoreMsg::Scan(r) => {
            conn.execute(
                "INSERT INTO scan_history(match_id, ts, status, confidence, snapshot_json, opportunity_json) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    r.snapshot.match_id,
                    r.ts.to_rfc3339(),
                    r.snapshot.status.as_str(),
                    r.opportunity.score,
                    serde_json::to_string(&r.snapshot)?,
                    serde_json::to_string(&r.opportunity)?,
                ],
            )?;
        }
        StoreMsg::Alert(r) => {
            // a fingerprint is stored once, first delivery wins
            conn.execute(
                "INSERT OR IGNORE INTO alerts(fingerprint, match_id, ts, level, record_json) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    r.fingerprint.as_str(),
                    r.match_id,
                    r.computed_at.to_rfc3339(),
                    r.opportunity.level.as_str(),
                    serde_json::to_string(&r)?,
                ],
            )?;
        }
    }

    Ok(())
}

/// Seeds the deduplicator from every alert ever stored.
pub struct SqliteAlertHistory {
    path: PathBuf,
}

impl SqliteAlertHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AlertHistory for SqliteAlertHistory {
    fn fingerprints(&self) -> Result<Vec<Fingerprint>> {
        let conn = open(&self.path)?;
        let mut stmt = conn.prepare("SELECT fingerprint FROM alerts ORDER BY ts")?;
        let rows = stmt
            .query_map([], |r| r.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<String>>>()
            .context("read alert fingerprints")?;
        Ok(rows.into_iter().map(Fingerprint::from_stored).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alert_dedup::AlertDeduplicator;
    use chrono::TimeZone;
    use match_state::{MatchStatus, Score, Side, WorklistEntry};
    use opportunity_engine::OpportunityScorer;

    fn temp_db(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("favori-store-{}-{}.db", name, std::process::id()));
        for suffix in ["", "-wal", "-shm"] {
            std::fs::remove_file(format!("{}{}", path.display(), suffix)).ok();
        }
        path
    }

    fn live_snapshot(id: &str) -> MatchStateSnapshot {
        let entry = WorklistEntry {
            match_id:      id.to_string(),
            home_team:     "Napoli".to_string(),
            away_team:     "Lecce".to_string(),
            league:        "Serie A".to_string(),
            kickoff:       Some("18:00".to_string()),
            favorite_side: Some(Side::Home),
            pre_match_odd: Some(1.33),
            url:           None,
        };
        let mut snap = MatchStateSnapshot::not_ready(&entry);
        snap.status = MatchStatus::Live;
        snap.score = Some(Score::new(0, 1));
        snap.elapsed_minutes = Some(66);
        snap
    }

    fn alert(id: &str) -> AlertRecord {
        let snap = live_snapshot(id);
        let opp = OpportunityScorer::default().score(&snap);
        AlertRecord::new(snap, opp, Utc.with_ymd_and_hms(2025, 5, 4, 19, 6, 0).unwrap())
    }

    #[test]
    fn test_alert_history_seeds_dedup() {
        let path = temp_db("history");
        let conn = open(&path).unwrap();
        apply_msg(&conn, StoreMsg::Alert(Box::new(alert("m-1")))).unwrap();
        apply_msg(&conn, StoreMsg::Alert(Box::new(alert("m-1")))).unwrap();
        apply_msg(&conn, StoreMsg::Alert(Box::new(alert("m-2")))).unwrap();

        let count: i64 = conn.query_row("SELECT COUNT(1) FROM alerts", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 2);

        let dedup = AlertDeduplicator::seeded(&SqliteAlertHistory::new(&path)).unwrap();
        assert_eq!(dedup.len(), 2);
        assert!(!dedup.should_alert(&alert("m-2").fingerprint));
        assert!(dedup.should_alert(&alert("m-3").fingerprint));
    }

    #[test]
    fn test_writer_thread_persists_scans() {
        let path = temp_db("writer");
        let (tx, handle) = spawn_store_writer(open(&path).unwrap());

        let snap = live_snapshot("m-9");
        let opportunity = OpportunityScorer::default().score(&snap);
        for _ in 0..3 {
            tx.blocking_send(StoreMsg::Scan(Box::new(ScanRow {
                ts:          Utc::now(),
                snapshot:    snap.clone(),
                opportunity: opportunity.clone(),
            })))
            .unwrap();
        }
        drop(tx);
        handle.join().unwrap();

        let conn = open(&path).unwrap();
        let (count, status, confidence): (i64, String, i64) = conn
            .query_row(
                "SELECT COUNT(1), MAX(status), MAX(confidence) FROM scan_history WHERE match_id = 'm-9'",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .unwrap();
        assert_eq!((count, status.as_str(), confidence), (3, "LIVE", 90));
    }
}
