use alert_dedup::{AlertNotice, AlertRecord};
use anyhow::Result;
use logger::{now_iso, AlertDispatchEvent, EventLogger};
use opportunity_engine::Level;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

/// Gap between two sends, stays under Telegram's per-bot burst limit.
const SEND_GAP_MS: u64 = 200;

pub struct Notifier {
    client:     reqwest::Client,
    token:      Option<String>,
    recipients: Vec<i64>,
}

impl Notifier {
    pub fn new(token: Option<String>, recipients: Vec<i64>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
            recipients,
        }
    }

    /// No token or nobody to send to: alerts only go to the log.
    pub fn is_log_only(&self) -> bool {
        self.token.is_none() || self.recipients.is_empty()
    }

    pub fn recipients(&self) -> usize {
        self.recipients.len()
    }

    /// Returns how many recipients accepted the message.
    pub async fn deliver(&self, notice: &AlertNotice) -> usize {
        let text = render_html(notice);
        let token = match (&self.token, self.recipients.is_empty()) {
            (Some(token), false) => token,
            _ => {
                info!("[notify:log-only] {}", text.replace('\n', " | "));
                return 0;
            }
        };

        let mut delivered = 0;
        for (i, chat_id) in self.recipients.iter().enumerate() {
            if i > 0 {
                sleep(Duration::from_millis(SEND_GAP_MS)).await;
            }
            match tg_send_message(&self.client, token, *chat_id, &text).await {
                Ok(_) => delivered += 1,
                Err(e) => warn!("Telegram send to {} failed: {}", chat_id, e),
            }
        }
        delivered
    }
}

async fn tg_send_message(client: &reqwest::Client, token: &str, chat_id: i64, text: &str) -> Result<i64> {
    let url = format!("https://api.telegram.org/bot{}/sendMessage", token);
    let body = serde_json::json!({
        "chat_id": chat_id,
        "text": text,
        "parse_mode": "HTML",
        "disable_web_page_preview": true,
    });
    let resp = client.post(&url).json(&body).send().await?;
    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("sendMessage HTTP {}: {}", status, body);
    }
    let resp_json: serde_json::Value = resp.json().await?;
    Ok(resp_json["result"]["message_id"].as_i64().unwrap_or(0))
}

/// Delivery task. Alerts queue here so a slow Telegram never stalls scanning.
pub fn spawn_notifier(notifier: Notifier, events: EventLogger) -> (mpsc::Sender<AlertRecord>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<AlertRecord>(256);

    let handle = tokio::spawn(async move {
        while let Some(record) = rx.recv().await {
            let delivered = notifier.deliver(&record.notice()).await;
            let _ = events.log(&AlertDispatchEvent {
                ts:          now_iso(),
                event:       "ALERT_DISPATCH",
                fingerprint: record.fingerprint.to_string(),
                match_id:    record.match_id.clone(),
                recipients:  notifier.recipients(),
                delivered,
            });
        }
    });

    (tx, handle)
}

// ── Rendering ────────────────────────────────────────────────────────────────

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn level_icon(level: Level) -> &'static str {
    match level {
        Level::Red => "🚨",
        Level::Orange => "🔥",
        _ => "👀",
    }
}

pub fn render_html(n: &AlertNotice) -> String {
    let mut msg = format!("{} <b>{}</b>\n", level_icon(n.level), n.level.as_str());
    msg += &format!("<i>{}</i>\n\n", n.scenario.as_str());
    msg += &format!("⚽ <b>{}</b>\n", escape_html(&n.match_description));
    if !n.league.is_empty() {
        msg += &format!("🏆 {}\n", escape_html(&n.league));
    }
    let minute = n.minute.map(|m| format!("{m}'")).unwrap_or_else(|| "n/a".to_string());
    let score = n.score.as_deref().unwrap_or("n/a");
    msg += &format!("⏱️ <b>{minute}</b>  |  📊 Score: <b>{score}</b>\n");

    if !n.reasons.is_empty() {
        msg += "\n📋 <b>Analysis:</b>\n";
        for reason in &n.reasons {
            msg += &format!("• {}\n", escape_html(reason));
        }
    }

    let mut odds = String::new();
    if let Some(odd) = n.extra_odds.match_goal {
        odds += &format!("• Match goal: <b>@{odd:.2}</b>\n");
    }
    if let Some(odd) = n.extra_odds.favorite_goal {
        odds += &format!("• Favorite goal: <b>@{odd:.2}</b>\n");
    }
    if !odds.is_empty() {
        msg += "\n💰 <b>Live odds:</b>\n";
        msg += &odds;
    }

    if let Some(action) = &n.suggested_action {
        msg += &format!("\n🚀 <b>{}</b>\n", escape_html(action));
    }

    msg += &format!(
        "\n🎯 Confidence: {}/100 | 🕒 {}",
        n.confidence,
        n.computed_at.format("%H:%M")
    );
    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use opportunity_engine::{ExtraOdds, Scenario};

    fn notice() -> AlertNotice {
        AlertNotice {
            level:             Level::Red,
            scenario:          Scenario::FavoriteTrailing,
            match_description: "Brighton & Hove vs Wolves".to_string(),
            league:            "Premier League".to_string(),
            score:             Some("0-1".to_string()),
            minute:            Some(64),
            reasons:           vec!["Brighton & Hove trailing 0-1 (pre-match odd 1.5)".to_string()],
            suggested_action:  Some("bet next goal for the favorite (or double-chance)".to_string()),
            extra_odds:        ExtraOdds { match_goal: Some(1.4), favorite_goal: None },
            confidence:        90,
            computed_at:       Utc.with_ymd_and_hms(2025, 2, 9, 15, 4, 30).unwrap(),
        }
    }

    #[test]
    fn test_render_html() {
        let text = render_html(&notice());
        assert!(text.starts_with("🚨 <b>RED</b>\n<i>FAVORITE_TRAILING</i>"));
        assert!(text.contains("⚽ <b>Brighton &amp; Hove vs Wolves</b>"));
        assert!(text.contains("⏱️ <b>64'</b>  |  📊 Score: <b>0-1</b>"));
        assert!(text.contains("• Match goal: <b>@1.40</b>"));
        assert!(!text.contains("Favorite goal"));
        assert!(text.ends_with("🎯 Confidence: 90/100 | 🕒 15:04"));
    }

    #[test]
    fn test_odds_block_skipped_when_unavailable() {
        let mut n = notice();
        n.extra_odds = ExtraOdds::default();
        n.level = Level::Watch;
        let text = render_html(&n);
        assert!(text.starts_with("👀"));
        assert!(!text.contains("Live odds"));
    }

    #[tokio::test]
    async fn test_log_only_mode() {
        let notifier = Notifier::new(None, vec![42]);
        assert!(notifier.is_log_only());
        assert_eq!(notifier.deliver(&notice()).await, 0);
        assert!(Notifier::new(Some("t".to_string()), vec![]).is_log_only());
    }
}
