//! Polling fallback for the change feed.
//!
//! When no push transport is available, [`PollingChangeFeed`] fetches the
//! collection on an interval and fingerprints it; a fingerprint change
//! emits one [`ChangeEvent`]. The consumer refetches on any event, so the
//! feed never needs to know which rows changed.

use crate::service::{ChangeFeed, ChannelError, RecordService, Subscription};
use crate::types::{Bookmark, ChangeEvent, ChangeKind, EventMask};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Interval-polling [`ChangeFeed`] backed by the record service.
pub struct PollingChangeFeed {
    records: Arc<dyn RecordService>,
    user_id: String,
    interval: Duration,
}

impl PollingChangeFeed {
    pub fn new(
        records: Arc<dyn RecordService>,
        user_id: impl Into<String>,
        interval: Duration,
    ) -> Self {
        Self {
            records,
            user_id: user_id.into(),
            interval,
        }
    }
}

/// Digest of a snapshot, sensitive to row content and order.
fn fingerprint(rows: &[Bookmark]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for row in rows {
        hasher.update(row.id.as_bytes());
        hasher.update(b"|");
        hasher.update(row.title.as_bytes());
        hasher.update(b"|");
        hasher.update(row.url.as_bytes());
        hasher.update(b"|");
        hasher.update(row.created_at.to_rfc3339().as_bytes());
        hasher.update(b"\n");
    }
    hasher.finalize().into()
}

#[async_trait]
impl ChangeFeed for PollingChangeFeed {
    async fn subscribe(
        &self,
        table: &str,
        mask: EventMask,
    ) -> Result<Subscription, ChannelError> {
        let (sender, receiver) = mpsc::channel(Subscription::CHANNEL_CAPACITY);
        let records = self.records.clone();
        let user_id = self.user_id.clone();
        let interval = self.interval;
        let table = table.to_string();

        tokio::spawn(async move {
            // A poll cannot tell inserts from updates or deletes apart, so
            // every detected change reports as Update.
            if !mask.matches(ChangeKind::Update) {
                tracing::debug!(table = %table, "Mask excludes updates, polling feed idle");
                // Keep the channel open so the subscription stays live.
                sender.closed().await;
                return;
            }

            let mut last: Option<[u8; 32]> = None;
            loop {
                tokio::time::sleep(interval).await;
                match records.fetch_all(&user_id).await {
                    Ok(rows) => {
                        let current = fingerprint(&rows);
                        let changed = last.map(|prev| prev != current).unwrap_or(false);
                        last = Some(current);
                        if !changed {
                            continue;
                        }
                        let event = ChangeEvent {
                            table: table.clone(),
                            kind: ChangeKind::Update,
                        };
                        if sender.send(event).await.is_err() {
                            return;
                        }
                    }
                    Err(err) if !err.is_retryable() => {
                        tracing::warn!(error = %err, "Polling feed stopping");
                        return;
                    }
                    Err(err) => {
                        tracing::debug!(error = %err, "Poll failed, will retry next interval");
                    }
                }
            }
        });

        Ok(Subscription::from_receiver(receiver))
    }
}
