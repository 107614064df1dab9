/// favori-live — Live Favorite Monitor
///
/// What it does:
///   1. Reloads the screened worklist (favorites under 1.60) every cycle
///   2. Orders it: in play → imminent → future → finished → no kickoff
///   3. Reads each match through the scraper sidecar, one at a time
///   4. Scores the snapshot (favorite trailing / late draw / domination)
///   5. New situations only: SQLite + Telegram
///
/// What it does NOT do: place bets.
///
/// Run:
///   cargo run --bin live-monitor

mod config;
mod dispatch;
mod notifier;
mod scraper;
mod store;

use alert_dedup::{is_alert_worthy, AlertDeduplicator, AlertRecord, Fingerprint};
use anyhow::{Context, Result};
use chrono::{Local, Utc};
use config::MonitorConfig;
use dispatch::{hand_off, Handoff};
use dotenv::dotenv;
use logger::{
    now_iso, ClockAnomalyEvent, CycleHeartbeatEvent, EventLogger, MatchScanEvent, OpportunityEvent,
};
use match_state::{ClockCheck, ElapsedTracker, MatchStateSnapshot, MatchStatus, WorklistEntry};
use notifier::{spawn_notifier, Notifier};
use opportunity_engine::{Opportunity, OpportunityScorer};
use rand::Rng;
use scan_scheduler::{priority_of, PriorityScheduler};
use scraper::HttpScraper;
use std::collections::HashSet;
use std::env;
use std::fs::File;
use std::path::Path;
use store::{spawn_store_writer, ScanRow, SqliteAlertHistory, StoreMsg};
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

// ── Worklist ─────────────────────────────────────────────────────────────────

/// Entries failing ingestion are dropped with a warning. A missing file is an empty day.
fn load_worklist(path: &Path) -> Result<Vec<WorklistEntry>> {
    if !path.exists() {
        warn!("Worklist {} not found, nothing to scan", path.display());
        return Ok(Vec::new());
    }
    let raw = std::fs::read_to_string(path).with_context(|| format!("read worklist {}", path.display()))?;
    let entries: Vec<WorklistEntry> =
        serde_json::from_str(&raw).with_context(|| format!("parse worklist {}", path.display()))?;

    Ok(entries
        .into_iter()
        .filter(|e| match e.validate() {
            Ok(()) => true,
            Err(err) => {
                warn!("Worklist entry dropped: {}", err);
                false
            }
        })
        .collect())
}

fn random_secs(min: u64, max: u64) -> Duration {
    Duration::from_secs(rand::thread_rng().gen_range(min..=max))
}

/// Sleeps unless shutdown is requested first. Returns true on shutdown.
async fn pause(stop: &mut watch::Receiver<bool>, dur: Duration) -> bool {
    if *stop.borrow() {
        return true;
    }
    tokio::select! {
        _ = sleep(dur) => false,
        _ = stop.changed() => true,
    }
}

// ── Monitor ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct CycleStats {
    scanned:     usize,
    not_ready:   usize,
    live:        usize,
    alerts_sent: usize,
}

struct Monitor {
    cfg:              MonitorConfig,
    scraper:          HttpScraper,
    scorer:           OpportunityScorer,
    scheduler:        PriorityScheduler,
    dedup:            AlertDeduplicator,
    clocks:           ElapsedTracker,
    events:           EventLogger,
    store_tx:         mpsc::Sender<StoreMsg>,
    alert_tx:         mpsc::Sender<AlertRecord>,
    /// matches seen LIVE last cycle, scanned first in the next one
    seen_live:        HashSet<String>,
    since_restart:    u32,
    total_scans:      u64,
    cycle:            u64,
}

impl Monitor {
    async fn run_cycle(&mut self, stop: &mut watch::Receiver<bool>) -> Result<bool> {
        self.cycle += 1;
        let worklist = load_worklist(&self.cfg.worklist_path)?;

        let mut live_set = self.scraper.fetch_live_set().await;
        live_set.extend(self.seen_live.iter().cloned());

        let now = Local::now().naive_local();
        let ordered = self.scheduler.order(&worklist, &live_set, now);
        info!(
            "--- Cycle {} --- {} matches, {} known live",
            self.cycle,
            ordered.len(),
            live_set.len()
        );

        let mut stats = CycleStats::default();
        let mut live_now = HashSet::new();
        let mut stopped = false;

        for entry in ordered {
            if *stop.borrow() {
                stopped = true;
                break;
            }

            let snap = self.scraper.fetch(entry).await;
            let priority = priority_of(entry, &live_set, now).bucket();
            self.handle_snapshot(snap, priority, &mut stats, &mut live_now);

            if self.pace(stop).await? {
                stopped = true;
                break;
            }
        }

        // a cut-short cycle keeps what it learned so far
        self.seen_live = live_now;
        stats.live = self.seen_live.len();

        info!(
            "Cycle {} done: scanned={} not_ready={} live={} alerts={} dedup_keys={}",
            self.cycle, stats.scanned, stats.not_ready, stats.live, stats.alerts_sent, self.dedup.len()
        );
        let _ = self.events.log(&CycleHeartbeatEvent {
            ts:          now_iso(),
            event:       "CYCLE_HEARTBEAT",
            cycle:       self.cycle,
            worklist:    worklist.len(),
            scanned:     stats.scanned,
            not_ready:   stats.not_ready,
            live:        stats.live,
            alerts_sent: stats.alerts_sent,
        });

        Ok(stopped)
    }

    fn handle_snapshot(
        &mut self,
        snap: MatchStateSnapshot,
        priority: u8,
        stats: &mut CycleStats,
        live_now: &mut HashSet<String>,
    ) {
        if snap.status == MatchStatus::NotReady {
            stats.not_ready += 1;
            debug!("[{}] not ready, skipped", snap.match_id);
            return;
        }
        stats.scanned += 1;

        match snap.status {
            MatchStatus::Live => {
                live_now.insert(snap.match_id.clone());
            }
            MatchStatus::Finished => self.clocks.forget(&snap.match_id),
            _ => {}
        }

        if let ClockCheck::Regressed { previous, current } = self.clocks.observe(&snap) {
            warn!(
                "[{}] clock went back {}' → {}', treating as a new observation",
                snap.match_id, previous, current
            );
            let _ = self.events.log(&ClockAnomalyEvent {
                ts:       now_iso(),
                event:    "CLOCK_ANOMALY",
                match_id: snap.match_id.clone(),
                previous,
                current,
            });
        }

        let _ = self.events.log(&MatchScanEvent {
            ts:       now_iso(),
            event:    "MATCH_SCAN",
            match_id: snap.match_id.clone(),
            teams:    snap.description(),
            status:   snap.status.as_str().to_string(),
            score:    snap.score.map(|s| s.to_string()),
            minute:   snap.elapsed_minutes,
            priority,
        });

        let opportunity = self.scorer.score(&snap);
        let _ = self.store_tx.try_send(StoreMsg::Scan(Box::new(ScanRow {
            ts:          Utc::now(),
            snapshot:    snap.clone(),
            opportunity: opportunity.clone(),
        })));

        if is_alert_worthy(&opportunity) && self.consider_alert(snap, opportunity) {
            stats.alerts_sent += 1;
        }
    }

    /// Returns true when the alert was new and handed to store + notifier.
    /// A deferred alert stays unrecorded and fires on a later scan.
    fn consider_alert(&mut self, snap: MatchStateSnapshot, opportunity: Opportunity) -> bool {
        let fingerprint = Fingerprint::of(&snap.match_id, &opportunity);
        let fresh = self.dedup.should_alert(&fingerprint);

        info!(
            "[{}] {} {} ({}/100){}",
            snap.match_id,
            opportunity.level.as_str(),
            opportunity.scenario.as_str(),
            opportunity.score,
            if fresh { "" } else { " (already sent)" }
        );
        let _ = self.events.log(&OpportunityEvent {
            ts:         now_iso(),
            event:      "OPPORTUNITY",
            match_id:   snap.match_id.clone(),
            scenario:   opportunity.scenario.as_str().to_string(),
            level:      opportunity.level.as_str().to_string(),
            confidence: opportunity.score,
            action:     opportunity.suggested_action.clone(),
            reasons:    opportunity.reasons.clone(),
            fresh,
        });

        if !fresh {
            return false;
        }

        let record = AlertRecord::new(snap, opportunity, Utc::now());
        hand_off(&mut self.dedup, &self.store_tx, &self.alert_tx, record) == Handoff::Sent
    }

    /// Delay between matches, long pause every N, scraper restart every M.
    async fn pace(&mut self, stop: &mut watch::Receiver<bool>) -> Result<bool> {
        self.total_scans += 1;
        self.since_restart += 1;

        if self.cfg.restart_scraper_every > 0 && self.since_restart >= self.cfg.restart_scraper_every {
            info!("♻️ {} scans since last restart, recycling scraper session", self.since_restart);
            self.scraper.restart().await?;
            self.since_restart = 0;
        }

        let every = u64::from(self.cfg.long_pause_every);
        let delay = if every > 0 && self.total_scans % every == 0 {
            let d = random_secs(self.cfg.long_pause_min_secs, self.cfg.long_pause_max_secs);
            info!("☕ Long pause {}s after {} scans", d.as_secs(), self.total_scans);
            d
        } else {
            random_secs(self.cfg.match_delay_min_secs, self.cfg.match_delay_max_secs)
        };

        Ok(pause(stop, delay).await)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    info!("=== favori-live — LIVE FAVORITE MONITOR ===");
    info!("Mode: ALERT ONLY (no bets placed)");

    // Single instance lock
    let lock_file_path = env::temp_dir().join("favori_live_monitor.lock");
    let lock_file = match File::create(&lock_file_path) {
        Ok(f) => f,
        Err(e) => {
            warn!("Failed to create lock file at {:?}: {}", lock_file_path, e);
            return Ok(());
        }
    };

    let mut lock = fd_lock::RwLock::new(lock_file);
    let _write_guard = match lock.try_write() {
        Ok(guard) => {
            info!("Acquired single-instance lock.");
            guard
        }
        Err(_) => {
            warn!("Another instance of live-monitor is already running! Exiting.");
            return Ok(());
        }
    };

    let cfg = MonitorConfig::from_env();
    info!("Worklist: {}", cfg.worklist_path.display());
    info!("Store: {} | Logs: {}", cfg.db_path, cfg.log_dir.display());
    info!("Scraper: {} | cycle every {}s", cfg.scraper_url, cfg.scan_interval_secs);

    let dedup = AlertDeduplicator::seeded(&SqliteAlertHistory::new(&cfg.db_path))
        .context("seed alert dedup from store")?;

    let notifier = Notifier::new(cfg.telegram_token.clone(), cfg.telegram_recipients.clone());
    if notifier.is_log_only() {
        warn!("TELEGRAM_TOKEN / TELEGRAM_RECIPIENTS not set, alerts go to the log only");
    } else {
        info!("Telegram: {} recipients", notifier.recipients());
    }

    let store_conn = store::open(&cfg.db_path).context("open store")?;
    let (store_tx, store_handle) = spawn_store_writer(store_conn);
    let (alert_tx, notify_handle) = spawn_notifier(notifier, EventLogger::new(&cfg.log_dir));

    let (stop_tx, mut stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, finishing current match then stopping...");
                let _ = stop_tx.send(true);
            }
            Err(e) => {
                warn!("Ctrl-C handler unavailable: {}", e);
                // keep the sender alive so pauses still sleep
                std::future::pending::<()>().await;
            }
        }
    });

    let scan_interval = Duration::from_secs(cfg.scan_interval_secs);
    let mut monitor = Monitor {
        scraper:       HttpScraper::new(cfg.scraper_url.clone())?,
        scorer:        OpportunityScorer::new(cfg.scorer),
        scheduler:     PriorityScheduler::new(),
        dedup,
        clocks:        ElapsedTracker::new(),
        events:        EventLogger::new(&cfg.log_dir),
        store_tx,
        alert_tx,
        seen_live:     HashSet::new(),
        since_restart: 0,
        total_scans:   0,
        cycle:         0,
        cfg,
    };

    info!("🚀 READY: starting scan loop.");
    loop {
        let stopped = match monitor.run_cycle(&mut stop_rx).await {
            Ok(stopped) => stopped,
            Err(e) => {
                warn!("Cycle {} failed: {:#}", monitor.cycle, e);
                false
            }
        };
        if stopped || pause(&mut stop_rx, scan_interval).await {
            break;
        }
    }

    // drain queues before exit
    let Monitor { store_tx, alert_tx, .. } = monitor;
    drop(alert_tx);
    let _ = notify_handle.await;
    drop(store_tx);
    let _ = tokio::task::spawn_blocking(move || store_handle.join()).await;

    info!("Stopped cleanly.");
    Ok(())
}
