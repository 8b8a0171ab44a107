//! Collaborator interfaces consumed by the sync engine.
//!
//! The engine never talks to a concrete backend directly: auth, record
//! storage, the change feed, and navigation are all reached through the
//! traits in this module. Production adapters live in `backend`; tests use
//! in-process fakes plus [`LocalChangeFeed`].

use crate::types::{Bookmark, ChangeEvent, EventMask, NewBookmark, Session};
use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tokio::sync::mpsc;

// ============================================================================
// Error Types
// ============================================================================

/// Errors from the auth and record collaborators.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The backend rejected the credentials (session expired or revoked).
    #[error("not authorized: session expired or revoked")]
    Unauthorized,

    /// Non-success HTTP status other than 401.
    #[error("backend returned HTTP status {0}")]
    Http(u16),

    /// Transport-level failure (DNS, connect, TLS, broken stream).
    #[error("network error: {0}")]
    Network(String),

    /// The response body did not match the expected shape.
    #[error("failed to decode backend response: {0}")]
    Decode(String),

    /// The request exceeded its deadline.
    #[error("request timed out")]
    Timeout,
}

impl ServiceError {
    /// True if this error is transient and the operation may be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            ServiceError::Timeout | ServiceError::Network(_) => true,
            ServiceError::Http(status) => *status >= 500,
            ServiceError::Unauthorized | ServiceError::Decode(_) => false,
        }
    }
}

/// Errors from the change feed collaborator.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The subscription could not be opened.
    #[error("failed to open change feed subscription: {0}")]
    Subscribe(String),

    /// The event stream ended unexpectedly.
    #[error("change feed stream closed")]
    Closed,
}

// ============================================================================
// Collaborator Traits
// ============================================================================

/// Target of a provider sign-in: the URL the login surface must navigate to.
///
/// A headless client cannot follow an OAuth redirect itself, so the auth
/// collaborator hands back the authorize URL and the caller passes it to
/// [`Navigator::redirect`] (or prints it, in the CLI).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInRedirect {
    pub url: String,
}

/// Authentication collaborator. Queried once at startup by the session gate.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Return the current session, or `None` when signed out.
    async fn get_session(&self) -> Result<Option<Session>, ServiceError>;

    /// Begin a provider (OAuth) sign-in, returning the authorize URL.
    async fn sign_in_with_provider(
        &self,
        provider: &str,
        redirect_to: &str,
    ) -> Result<SignInRedirect, ServiceError>;

    /// Invalidate the current session on the backend.
    async fn sign_out(&self) -> Result<(), ServiceError>;
}

/// Remote bookmark store. Consumed as an opaque service; its internal
/// storage and indexing are out of scope.
#[async_trait]
pub trait RecordService: Send + Sync {
    /// Fetch every bookmark owned by `user_id`, newest first.
    async fn fetch_all(&self, user_id: &str) -> Result<Vec<Bookmark>, ServiceError>;

    /// Insert a new bookmark and return the server-assigned row.
    async fn insert(&self, fields: &NewBookmark) -> Result<Bookmark, ServiceError>;

    /// Delete the bookmark with the given id.
    async fn delete(&self, id: &str) -> Result<(), ServiceError>;
}

/// Push change-notification channel for the bookmark table.
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Open a subscription scoped to `table` for the kinds in `mask`.
    async fn subscribe(&self, table: &str, mask: EventMask)
        -> Result<Subscription, ChannelError>;
}

/// Navigation collaborator. Fire-and-forget; no return value is consumed.
pub trait Navigator: Send + Sync {
    fn redirect(&self, path: &str);
}

// ============================================================================
// Subscription
// ============================================================================

/// Receiving end of one change feed subscription.
///
/// Events arrive over a bounded mpsc channel; dropping the subscription
/// closes the channel, which is how the feed side observes the
/// unsubscribe.
pub struct Subscription {
    receiver: mpsc::Receiver<ChangeEvent>,
}

impl Subscription {
    /// Channel capacity for a single subscription. Events are coalescing in
    /// effect (every event triggers the same full refresh), so a small
    /// buffer is enough.
    pub const CHANNEL_CAPACITY: usize = 32;

    /// Build a subscription from a raw receiver. Intended for `ChangeFeed`
    /// implementations.
    pub fn from_receiver(receiver: mpsc::Receiver<ChangeEvent>) -> Self {
        Self { receiver }
    }

    /// Wait for the next event. Returns `None` once the feed side has
    /// dropped the channel.
    pub async fn next_event(&mut self) -> Option<ChangeEvent> {
        self.receiver.recv().await
    }
}

// ============================================================================
// In-Process Change Feed
// ============================================================================

/// In-process [`ChangeFeed`] for tests and same-process fan-out.
///
/// `publish` delivers an event to every live subscription whose table and
/// mask match. Closed subscriptions are pruned on the next publish.
#[derive(Default)]
pub struct LocalChangeFeed {
    subscribers: Mutex<Vec<LocalSubscriber>>,
}

struct LocalSubscriber {
    table: String,
    mask: EventMask,
    sender: mpsc::Sender<ChangeEvent>,
}

impl LocalChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver an event to matching subscribers.
    pub fn publish(&self, event: ChangeEvent) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|sub| {
            if sub.table != event.table || !sub.mask.matches(event.kind) {
                return !sub.sender.is_closed();
            }
            match sub.sender.try_send(event.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    // A full buffer means a refresh is already pending for
                    // every queued event; dropping this one loses nothing.
                    tracing::debug!(table = %event.table, "Subscriber buffer full, dropping event");
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            }
        });
    }

    /// Number of live subscriptions (test observability).
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|sub| !sub.sender.is_closed());
        subscribers.len()
    }
}

#[async_trait]
impl ChangeFeed for LocalChangeFeed {
    async fn subscribe(
        &self,
        table: &str,
        mask: EventMask,
    ) -> Result<Subscription, ChannelError> {
        let (sender, receiver) = mpsc::channel(Subscription::CHANNEL_CAPACITY);
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(LocalSubscriber {
                table: table.to_string(),
                mask,
                sender,
            });
        tracing::debug!(table, "Opened local change feed subscription");
        Ok(Subscription::from_receiver(receiver))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChangeKind;

    fn insert_event(table: &str) -> ChangeEvent {
        ChangeEvent {
            table: table.to_string(),
            kind: ChangeKind::Insert,
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_matching_subscriber() {
        let feed = LocalChangeFeed::new();
        let mut sub = feed.subscribe("bookmarks", EventMask::ALL).await.unwrap();

        feed.publish(insert_event("bookmarks"));

        let event = sub.next_event().await.unwrap();
        assert_eq!(event.kind, ChangeKind::Insert);
    }

    #[tokio::test]
    async fn test_publish_skips_other_tables() {
        let feed = LocalChangeFeed::new();
        let mut sub = feed.subscribe("bookmarks", EventMask::ALL).await.unwrap();

        feed.publish(insert_event("profiles"));
        feed.publish(insert_event("bookmarks"));

        // The profiles event was never queued, so the first delivery is the
        // bookmarks one.
        let event = sub.next_event().await.unwrap();
        assert_eq!(event.table, "bookmarks");
    }

    #[tokio::test]
    async fn test_publish_respects_mask() {
        let feed = LocalChangeFeed::new();
        let mut sub = feed.subscribe("bookmarks", EventMask::DELETE).await.unwrap();

        feed.publish(insert_event("bookmarks"));
        feed.publish(ChangeEvent {
            table: "bookmarks".to_string(),
            kind: ChangeKind::Delete,
        });

        let event = sub.next_event().await.unwrap();
        assert_eq!(event.kind, ChangeKind::Delete);
    }

    #[tokio::test]
    async fn test_dropped_subscription_is_pruned() {
        let feed = LocalChangeFeed::new();
        let sub = feed.subscribe("bookmarks", EventMask::ALL).await.unwrap();
        assert_eq!(feed.subscriber_count(), 1);

        drop(sub);
        feed.publish(insert_event("bookmarks"));
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[test]
    fn test_retryable_classification() {
        assert!(ServiceError::Timeout.is_retryable());
        assert!(ServiceError::Http(503).is_retryable());
        assert!(!ServiceError::Http(404).is_retryable());
        assert!(!ServiceError::Unauthorized.is_retryable());
    }
}
