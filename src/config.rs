use opportunity_engine::ScorerConfig;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Runtime settings for `live-monitor`, all from the environment (.env honoured).
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub worklist_path:         PathBuf,
    pub db_path:               String,
    pub log_dir:               PathBuf,
    pub scraper_url:           String,
    pub scan_interval_secs:    u64,
    pub match_delay_min_secs:  u64,
    pub match_delay_max_secs:  u64,
    pub long_pause_every:      u32,
    pub long_pause_min_secs:   u64,
    pub long_pause_max_secs:   u64,
    pub restart_scraper_every: u32,
    pub telegram_token:        Option<String>,
    pub telegram_recipients:   Vec<i64>,
    pub scorer:                ScorerConfig,
}

impl MonitorConfig {
    pub fn from_env() -> Self {
        let defaults = ScorerConfig::default();
        let scorer = ScorerConfig {
            domination_ratio: env_or("SCORER_DOMINATION_RATIO", defaults.domination_ratio),
            draw_value_odd:   env_or("SCORER_DRAW_VALUE_ODD", defaults.draw_value_odd),
            ..defaults
        };

        let delay_min = env_or("MATCH_DELAY_MIN_SECS", 2u64);
        let pause_min = env_or("LONG_PAUSE_MIN_SECS", 60u64);

        Self {
            worklist_path:         PathBuf::from(env_string("WORKLIST_PATH", "data/favoris.json")),
            db_path:               env_string("FAVORI_DB_PATH", "data/favori.db"),
            log_dir:               PathBuf::from(env_string("LOG_DIR", "logs")),
            scraper_url:           env_string("SCRAPER_URL", "http://127.0.0.1:8089")
                .trim_end_matches('/')
                .to_string(),
            scan_interval_secs:    env_or("SCAN_INTERVAL_SECS", 60u64),
            match_delay_min_secs:  delay_min,
            match_delay_max_secs:  env_or("MATCH_DELAY_MAX_SECS", 4u64).max(delay_min),
            long_pause_every:      env_or("LONG_PAUSE_EVERY", 30u32),
            long_pause_min_secs:   pause_min,
            long_pause_max_secs:   env_or("LONG_PAUSE_MAX_SECS", 120u64).max(pause_min),
            restart_scraper_every: env_or("RESTART_SCRAPER_EVERY", 120u32),
            telegram_token:        env::var("TELEGRAM_TOKEN").ok().filter(|t| !t.trim().is_empty()),
            telegram_recipients:   parse_recipients(&env::var("TELEGRAM_RECIPIENTS").unwrap_or_default()),
            scorer,
        }
    }
}

/// Comma or whitespace separated chat ids; junk entries are skipped.
pub fn parse_recipients(raw: &str) -> Vec<i64> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter_map(|s| s.trim().parse::<i64>().ok())
        .collect()
}
