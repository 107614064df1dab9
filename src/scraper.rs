use anyhow::{Context, Result};
use match_state::{MatchStateSnapshot, RawLiveData, WorklistEntry};
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

const PAGE_TIMEOUT_SECS: u64 = 20;

/// Client for the page-reading sidecar.
/// Never errors on a match read: anything unusable comes back as NOT_READY.
pub struct HttpScraper {
    base_url: String,
    client:   reqwest::Client,
    restarts: u32,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LiveListing {
    Ids(Vec<String>),
    Wrapped { live: Vec<String> },
}

fn build_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(PAGE_TIMEOUT_SECS))
        .user_agent("favori-live/0.1")
        .build()
        .context("build http client")
}

impl HttpScraper {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            base_url: base_url.into(),
            client:   build_client()?,
            restarts: 0,
        })
    }

    async fn read_raw(&self, match_id: &str) -> Result<RawLiveData> {
        let url = format!("{}/match/{}", self.base_url, match_id);
        let resp = self.client.get(&url).send().await.context("sidecar request")?;
        if !resp.status().is_success() {
            anyhow::bail!("sidecar HTTP {} for {}", resp.status(), match_id);
        }
        resp.json::<RawLiveData>().await.context("decode sidecar payload")
    }

    pub async fn fetch(&self, entry: &WorklistEntry) -> MatchStateSnapshot {
        let raw = match self.read_raw(&entry.match_id).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("[{}] page not ready: {:#}", entry.match_id, e);
                return MatchStateSnapshot::not_ready(entry);
            }
        };

        match MatchStateSnapshot::normalize(entry, &raw) {
            Ok(snap) => {
                debug!(match_id = %snap.match_id, status = snap.status.as_str(), "snapshot read");
                snap
            }
            Err(e) => {
                warn!("[{}] rejected: {}", entry.match_id, e);
                MatchStateSnapshot::not_ready(entry)
            }
        }
    }

    /// Ids the sidecar currently sees in play. Empty on failure.
    pub async fn fetch_live_set(&self) -> HashSet<String> {
        let url = format!("{}/live", self.base_url);
        let listing = async {
            let resp = self.client.get(&url).send().await?.error_for_status()?;
            resp.json::<LiveListing>().await
        }
        .await;

        match listing {
            Ok(LiveListing::Ids(ids)) | Ok(LiveListing::Wrapped { live: ids }) => ids.into_iter().collect(),
            Err(e) => {
                warn!("Live listing unavailable: {}", e);
                HashSet::new()
            }
        }
    }

    /// Ask the sidecar to recycle its browser and start a fresh HTTP session.
    pub async fn restart(&mut self) -> Result<()> {
        let url = format!("{}/restart", self.base_url);
        if let Err(e) = self.client.post(&url).send().await {
            warn!("Sidecar restart request failed: {}", e);
        }
        self.client = build_client()?;
        self.restarts += 1;
        info!("Scraper session restarted (#{})", self.restarts);
        Ok(())
    }

    pub fn restarts(&self) -> u32 {
        self.restarts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use match_state::{MatchStatus, Side};

    fn entry() -> WorklistEntry {
        WorklistEntry {
            match_id:      "m-404".to_string(),
            home_team:     "Porto".to_string(),
            away_team:     "Arouca".to_string(),
            league:        "Liga Portugal".to_string(),
            kickoff:       Some("20:30".to_string()),
            favorite_side: Some(Side::Home),
            pre_match_odd: Some(1.25),
            url:           None,
        }
    }

    #[test]
    fn test_live_listing_shapes() {
        let bare: LiveListing = serde_json::from_str(r#"["a","b"]"#).unwrap();
        let wrapped: LiveListing = serde_json::from_str(r#"{"live":["c"]}"#).unwrap();
        assert!(matches!(bare, LiveListing::Ids(ref ids) if ids.len() == 2));
        assert!(matches!(wrapped, LiveListing::Wrapped { ref live } if live == &["c".to_string()]));
    }

    #[tokio::test]
    async fn test_unreachable_sidecar_is_not_ready() {
        let scraper = HttpScraper::new("http://127.0.0.1:9").unwrap();
        let snap = scraper.fetch(&entry()).await;
        assert_eq!(snap.status, MatchStatus::NotReady);
        assert_eq!(snap.match_id, "m-404");
        assert!(scraper.fetch_live_set().await.is_empty());
    }
}
