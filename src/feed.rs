//! Change feed consumer task.
//!
//! [`ChangeFeedSubscriber`] owns a spawned task that holds one feed
//! subscription and forwards every event to the controller as
//! [`AppEvent::RemoteChange`]. A dropped subscription is reopened with
//! exponential backoff; after the retry budget is exhausted the task sends
//! [`AppEvent::FeedDegraded`] and exits.

use crate::controller::AppEvent;
use crate::service::ChangeFeed;
use crate::types::EventMask;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Backoff schedule for resubscribe attempts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay before the given attempt (1-based): base * 2^(attempt-1),
    /// capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(31);
        let delay = self
            .base_delay
            .checked_mul(1u32 << shift)
            .unwrap_or(self.max_delay);
        delay.min(self.max_delay)
    }
}

/// Handle to the spawned feed consumer.
///
/// Dropping the subscriber (or calling [`shutdown`](Self::shutdown)) aborts
/// the task, which drops the subscription and stops all deliveries.
pub struct ChangeFeedSubscriber {
    handle: Option<JoinHandle<()>>,
}

impl ChangeFeedSubscriber {
    /// Spawn the consumer for `table`, delivering events into `events`.
    pub fn spawn(
        feed: Arc<dyn ChangeFeed>,
        table: impl Into<String>,
        mask: EventMask,
        retry: RetryPolicy,
        events: mpsc::Sender<AppEvent>,
    ) -> Self {
        let table = table.into();
        let handle = tokio::spawn(consume(feed, table, mask, retry, events));
        Self {
            handle: Some(handle),
        }
    }

    /// Stop the consumer. Idempotent.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::debug!("Change feed subscriber shut down");
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for ChangeFeedSubscriber {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn consume(
    feed: Arc<dyn ChangeFeed>,
    table: String,
    mask: EventMask,
    retry: RetryPolicy,
    events: mpsc::Sender<AppEvent>,
) {
    let mut attempts: u32 = 0;
    loop {
        match feed.subscribe(&table, mask).await {
            Ok(mut subscription) => {
                tracing::info!(table = %table, "Change feed subscribed");
                // Only a delivered event proves the subscription healthy.
                // A transport that accepts subscribes but drops the stream
                // right away must still burn down the retry budget.
                while let Some(event) = subscription.next_event().await {
                    attempts = 0;
                    if events.send(AppEvent::RemoteChange(event)).await.is_err() {
                        // Controller gone; nothing left to deliver to.
                        return;
                    }
                }
                tracing::warn!(table = %table, "Change feed stream closed");
            }
            Err(err) => {
                tracing::warn!(table = %table, error = %err, "Change feed subscribe failed");
            }
        }

        attempts += 1;
        if attempts > retry.max_attempts {
            tracing::error!(table = %table, attempts, "Change feed retry budget exhausted");
            let _ = events.send(AppEvent::FeedDegraded { attempts }).await;
            return;
        }
        let delay = retry.delay_for(attempts);
        tracing::debug!(table = %table, attempt = attempts, ?delay, "Resubscribing after delay");
        tokio::time::sleep(delay).await;
    }
}
