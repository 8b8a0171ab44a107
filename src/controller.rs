//! Central controller: the single owner of all engine state.
//!
//! Background work (refreshes, mutations, the feed consumer) runs in spawned
//! tasks that report back over one mpsc channel of [`AppEvent`]s. The host
//! loop awaits [`VaultController::next_event`], hands each event to
//! [`handle_event`](VaultController::handle_event) (synchronous state
//! mutation only), and calls [`on_tick`](VaultController::on_tick)
//! periodically for time-based cleanup.

use crate::feed::{ChangeFeedSubscriber, RetryPolicy};
use crate::mutation::MutationController;
use crate::notify::NotificationTimer;
use crate::service::{AuthService, ChangeFeed, Navigator, RecordService, ServiceError};
use crate::session::SessionGate;
use crate::store::RecordStore;
use crate::types::{Bookmark, ChangeEvent, EventMask, Session};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Table the engine mirrors and watches.
pub const BOOKMARKS_TABLE: &str = "bookmarks";

const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Completion and notification events delivered to the controller.
#[derive(Debug)]
pub enum AppEvent {
    /// A spawned full refresh finished.
    RefreshCompleted(Result<Vec<Bookmark>, ServiceError>),
    /// A spawned add finished.
    AddCompleted(Result<Bookmark, ServiceError>),
    /// A spawned delete finished.
    DeleteCompleted {
        id: String,
        result: Result<(), ServiceError>,
    },
    /// The change feed reported a row change.
    RemoteChange(ChangeEvent),
    /// The feed consumer exhausted its retry budget and exited.
    FeedDegraded { attempts: u32 },
}

/// Tunables for the controller.
#[derive(Debug, Clone)]
pub struct VaultOptions {
    pub login_path: String,
    pub notification_window: Duration,
    pub feed_retry: RetryPolicy,
}

impl Default for VaultOptions {
    fn default() -> Self {
        Self {
            login_path: "/".to_string(),
            notification_window: Duration::from_millis(
                crate::notify::DISPLAY_MS + crate::notify::EXIT_GRACE_MS,
            ),
            feed_retry: RetryPolicy::default(),
        }
    }
}

pub struct VaultController {
    session: SessionGate,
    records: Arc<dyn RecordService>,
    change_feed: Arc<dyn ChangeFeed>,
    feed_retry: RetryPolicy,
    store: Option<RecordStore>,
    subscriber: Option<ChangeFeedSubscriber>,
    mutations: MutationController,
    notifications: NotificationTimer,
    event_tx: mpsc::Sender<AppEvent>,
    event_rx: mpsc::Receiver<AppEvent>,
}

impl VaultController {
    pub fn new(
        auth: Arc<dyn AuthService>,
        records: Arc<dyn RecordService>,
        change_feed: Arc<dyn ChangeFeed>,
        navigator: Arc<dyn Navigator>,
        options: VaultOptions,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            session: SessionGate::new(auth, navigator, options.login_path),
            mutations: MutationController::new(records.clone()),
            records,
            change_feed,
            feed_retry: options.feed_retry,
            store: None,
            subscriber: None,
            notifications: NotificationTimer::new(options.notification_window),
            event_tx,
            event_rx,
        }
    }

    /// Resolve the session and, if authenticated, bring up the store, the
    /// initial refresh, and the feed subscriber. Returns false when there is
    /// no session (the gate has already redirected).
    pub async fn start(&mut self) -> bool {
        let Some(session) = self.session.resolve().await else {
            return false;
        };
        if self.store.is_some() {
            return true;
        }
        let user_id = session.user_id.clone();

        self.store = Some(RecordStore::new(self.records.clone(), user_id));
        self.spawn_refresh();
        self.subscriber = Some(ChangeFeedSubscriber::spawn(
            self.change_feed.clone(),
            BOOKMARKS_TABLE,
            EventMask::ALL,
            self.feed_retry.clone(),
            self.event_tx.clone(),
        ));
        true
    }

    /// Tear down data access, then sign out and redirect.
    pub async fn sign_out(&mut self) {
        self.teardown();
        self.session.sign_out().await;
    }

    fn teardown(&mut self) {
        if let Some(mut subscriber) = self.subscriber.take() {
            subscriber.shutdown();
        }
        self.store = None;
    }

    /// A backend 401 means the session died under us: tear down and let the
    /// gate redirect.
    fn handle_unauthorized(&mut self) {
        self.teardown();
        self.session.revoke();
    }

    /// Wait for the next background event.
    pub async fn next_event(&mut self) -> Option<AppEvent> {
        self.event_rx.recv().await
    }

    /// Apply every event already queued, without waiting.
    pub fn drain_pending_events(&mut self) {
        while let Ok(event) = self.event_rx.try_recv() {
            self.handle_event(event);
        }
    }

    /// Apply one event to the state. Synchronous: all waiting happens in
    /// the spawned tasks, never here.
    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::RefreshCompleted(Ok(rows)) => {
                // A refresh may land after teardown; without a store its
                // result has nowhere to go.
                if let Some(store) = &self.store {
                    let count = store.apply_snapshot(rows);
                    tracing::debug!(count, "Refresh applied");
                }
            }
            AppEvent::RefreshCompleted(Err(ServiceError::Unauthorized)) => {
                self.handle_unauthorized();
            }
            AppEvent::RefreshCompleted(Err(err)) => {
                tracing::warn!(error = %err, "Refresh failed");
                self.notifications.show("Couldn't refresh bookmarks");
            }
            AppEvent::AddCompleted(result) => {
                self.mutations.complete_add(&result);
                match result {
                    Ok(_) => self.notifications.show("Bookmark saved!"),
                    Err(ServiceError::Unauthorized) => self.handle_unauthorized(),
                    Err(_) => self.notifications.show("Couldn't save bookmark"),
                }
            }
            AppEvent::DeleteCompleted { id, result } => {
                self.mutations.complete_delete(&id, &result);
                match result {
                    Ok(()) => {}
                    Err(ServiceError::Unauthorized) => self.handle_unauthorized(),
                    Err(_) => self.notifications.show("Couldn't delete bookmark"),
                }
            }
            AppEvent::RemoteChange(change) => {
                tracing::debug!(table = %change.table, kind = ?change.kind, "Remote change");
                if self.store.is_some() {
                    self.spawn_refresh();
                }
            }
            AppEvent::FeedDegraded { attempts } => {
                tracing::error!(attempts, "Live updates degraded");
                self.subscriber = None;
                self.notifications.show("Live updates unavailable");
            }
        }
    }

    /// Periodic tick. Returns true when state changed (a notification
    /// expired) and the host should redraw.
    pub fn on_tick(&mut self) -> bool {
        self.notifications.clear_expired()
    }

    fn spawn_refresh(&self) {
        let Some(store) = &self.store else { return };
        let service = store.service();
        let user_id = store.user_id().to_string();
        let events = self.event_tx.clone();
        tokio::spawn(async move {
            let result = service.fetch_all(&user_id).await;
            let _ = events.send(AppEvent::RefreshCompleted(result)).await;
        });
    }

    // ========================================================================
    // User Intents
    // ========================================================================

    pub fn set_draft(&mut self, title: impl Into<String>, url: impl Into<String>) {
        self.mutations.set_draft(title, url);
    }

    /// Submit the draft as a new bookmark. Gated on an authenticated
    /// session.
    pub fn add_bookmark(&mut self) -> bool {
        let Some(session) = self.session.session() else {
            return false;
        };
        let user_id = session.user_id.clone();
        self.mutations.submit_add(&user_id, &self.event_tx)
    }

    /// Request deletion of a bookmark. Gated on an authenticated session.
    pub fn delete_bookmark(&mut self, id: &str) -> bool {
        if !self.session.is_authenticated() {
            return false;
        }
        self.mutations.submit_delete(id, &self.event_tx)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Current bookmark snapshot (empty before start / after teardown).
    pub fn bookmarks(&self) -> Arc<Vec<Bookmark>> {
        self.store
            .as_ref()
            .map(|store| store.list())
            .unwrap_or_default()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.session()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn notification(&self) -> Option<&str> {
        self.notifications.message()
    }

    pub fn is_adding(&self) -> bool {
        self.mutations.is_adding()
    }

    pub fn is_deleting(&self, id: &str) -> bool {
        self.mutations.is_deleting(id)
    }

    pub fn feed_active(&self) -> bool {
        self.subscriber
            .as_ref()
            .map(ChangeFeedSubscriber::is_active)
            .unwrap_or(false)
    }
}
