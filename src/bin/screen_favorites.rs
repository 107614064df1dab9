/// favori-live — Favorite Screener
///
/// Reads the day's fixture list (FIXTURES_PATH) and writes the worklist
/// (WORKLIST_PATH) that `live-monitor` scans: every fixture with a win odd
/// under SCREEN_MAX_ODD, sorted by kickoff.
///
/// Run:
///   cargo run --bin screen-favorites

use anyhow::{Context, Result};
use dotenv::dotenv;
use match_state::screen::{screen_fixtures, Fixture, SCREEN_MAX_ODD};
use std::env;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    dotenv().ok();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let fixtures_path = env::var("FIXTURES_PATH").unwrap_or_else(|_| "data/fixtures.json".to_string());
    let worklist_path = env::var("WORKLIST_PATH").unwrap_or_else(|_| "data/favoris.json".to_string());
    let max_odd = env::var("SCREEN_MAX_ODD")
        .ok()
        .and_then(|v| v.replace(',', ".").parse::<f64>().ok())
        .unwrap_or(SCREEN_MAX_ODD);

    let raw = std::fs::read_to_string(&fixtures_path).with_context(|| format!("read fixtures {fixtures_path}"))?;
    let fixtures: Vec<Fixture> = serde_json::from_str(&raw).with_context(|| format!("parse fixtures {fixtures_path}"))?;

    let worklist = screen_fixtures(&fixtures, max_odd);
    for w in &worklist {
        info!(
            "⭐ {} {} | {} @ {:.2}",
            w.kickoff.as_deref().unwrap_or("--:--"),
            w.description(),
            w.favorite_side.map(|s| w.team(s)).unwrap_or("?"),
            w.pre_match_odd.unwrap_or_default()
        );
    }

    if let Some(parent) = Path::new(&worklist_path).parent() {
        std::fs::create_dir_all(parent).ok();
    }
    std::fs::write(&worklist_path, serde_json::to_string_pretty(&worklist)?)
        .with_context(|| format!("write worklist {worklist_path}"))?;

    info!(
        "{} favorites out of {} fixtures (odd < {:.2}) → {}",
        worklist.len(),
        fixtures.len(),
        max_odd,
        worklist_path
    );
    Ok(())
}
