mod odds_watch;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use odds_watch::{
    find_drops, find_movements, load_pairs, market_labels, DROP_WINDOW_MIN, MIN_DROP_PCT, MIN_MOVE_PCT,
    MOVE_WINDOW_MIN,
};
use rusqlite::{Connection, OptionalExtension};

fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let db_path = std::env::var("FAVORI_DB_PATH").unwrap_or_else(|_| "data/favori.db".to_string());
    let conn = Connection::open(&db_path).with_context(|| format!("open db at {db_path}"))?;

    println!("db_path={db_path}");
    for t in ["scan_history", "alerts"] {
        let count: i64 = conn
            .query_row(&format!("SELECT COUNT(1) FROM {t}"), [], |r| r.get(0))
            .with_context(|| format!("count {t}"))?;
        println!("{t}: {count}");
    }

    let live_matches: i64 = conn
        .query_row(
            "SELECT COUNT(DISTINCT match_id) FROM scan_history WHERE status = 'LIVE'",
            [],
            |r| r.get(0),
        )
        .context("count live matches")?;
    println!("matches_seen_live: {live_matches}");

    let mut stmt = conn
        .prepare("SELECT level, COUNT(1) FROM alerts GROUP BY level ORDER BY level")
        .context("prepare level breakdown")?;
    let levels = stmt
        .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("read level breakdown")?;
    for (level, count) in levels {
        println!("  alerts[{level}]: {count}");
    }

    let last_alert: Option<(String, String, String)> = conn
        .query_row(
            "SELECT ts, match_id, fingerprint FROM alerts ORDER BY ts DESC LIMIT 1",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .optional()
        .context("read last alert")?;

    if let Some((ts, match_id, fingerprint)) = last_alert {
        println!("last_alert: ts={ts} match_id={match_id} key={fingerprint}");
    } else {
        println!("last_alert: <none>");
    }

    // ── Odds watch ──
    let now = Utc::now();
    let min_drop = env_f64("ODDS_DROP_MIN_PCT", MIN_DROP_PCT);
    let pairs = load_pairs(&conn, now - Duration::minutes(DROP_WINDOW_MIN))?;
    let drops = find_drops(&pairs, min_drop);
    println!("odds_drops (>= {min_drop}% in {DROP_WINDOW_MIN}m): {}", drops.len());
    for d in &drops {
        println!(
            "  {} [{}] {}: {:.2} -> {:.2} (-{:.2}%, {:.0}m)",
            d.match_id, d.teams, d.market, d.old_odd, d.new_odd, d.drop_pct, d.minutes_between
        );
    }

    let min_move = env_f64("ODDS_MOVE_MIN_PCT", MIN_MOVE_PCT);
    let pairs = load_pairs(&conn, now - Duration::minutes(MOVE_WINDOW_MIN))?;
    let moves = find_movements(&pairs, min_move);
    println!("odds_movements (>= {min_move}% in {MOVE_WINDOW_MIN}m): {}", moves.len());
    let labels = market_labels();
    for m in &moves {
        let changes: Vec<String> = labels
            .iter()
            .zip(m.changes)
            .filter_map(|(label, c)| c.map(|c| format!("{label}={c:+.2}%")))
            .collect();
        println!(
            "  {} [{}] {} {} ({:.0}m)",
            m.match_id,
            m.teams,
            m.kind.as_str(),
            changes.join(" "),
            m.minutes_between
        );
    }

    Ok(())
}
