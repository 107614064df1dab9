use alert_dedup::{AlertDeduplicator, AlertRecord};
use tokio::sync::mpsc;
use tracing::warn;

use crate::store::StoreMsg;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handoff {
    /// queued for both store and notifier, fingerprint recorded
    Sent,
    Duplicate,
    /// a queue had no room; nothing recorded, the next scan retries
    Deferred,
}

/// Dedup → store → notifier. The fingerprint is only marked sent once both
/// queues have accepted the record.
pub fn hand_off(
    dedup: &mut AlertDeduplicator,
    store_tx: &mpsc::Sender<StoreMsg>,
    alert_tx: &mpsc::Sender<AlertRecord>,
    record: AlertRecord,
) -> Handoff {
    if !dedup.should_alert(&record.fingerprint) {
        return Handoff::Duplicate;
    }

    let (store_slot, notify_slot) = match (store_tx.try_reserve(), alert_tx.try_reserve()) {
        (Ok(store), Ok(notify)) => (store, notify),
        (store, notify) => {
            if let Err(e) = store {
                warn!("[{}] store queue unavailable ({}), alert deferred", record.match_id, e);
            }
            if let Err(e) = notify {
                warn!("[{}] notifier queue unavailable ({}), alert deferred", record.match_id, e);
            }
            return Handoff::Deferred;
        }
    };

    dedup.record(record.fingerprint.clone());
    store_slot.send(StoreMsg::Alert(Box::new(record.clone())));
    notify_slot.send(record);
    Handoff::Sent
}
