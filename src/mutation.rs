//! Add/delete mutations with per-target in-flight tracking.
//!
//! Each mutation occupies a slot in the [`InFlightSet`] while its request is
//! outstanding: the single add slot (`NewEntry`) and one slot per record id
//! for deletes. A second submission against an occupied slot is refused, so
//! double-clicks never issue duplicate requests.

use crate::controller::AppEvent;
use crate::service::{RecordService, ServiceError};
use crate::types::{Bookmark, NewBookmark};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Identity of an outstanding mutation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InFlightKey {
    /// The single pending-add slot (one draft entry at a time).
    NewEntry,
    /// A pending delete for the record with this id.
    Record(String),
}

/// What the outstanding mutation is doing (for display).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Adding,
    Deleting,
}

/// Set of mutations currently outstanding against the backend.
#[derive(Default)]
pub struct InFlightSet {
    ops: HashMap<InFlightKey, Operation>,
}

impl InFlightSet {
    /// Claim a slot. Returns false if the slot is already occupied.
    pub fn begin(&mut self, key: InFlightKey, op: Operation) -> bool {
        if self.ops.contains_key(&key) {
            return false;
        }
        self.ops.insert(key, op);
        true
    }

    /// Release a slot once its request has completed (either way).
    pub fn finish(&mut self, key: &InFlightKey) {
        self.ops.remove(key);
    }

    pub fn contains(&self, key: &InFlightKey) -> bool {
        self.ops.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }
}

/// Owns the draft entry fields and issues mutations as spawned requests.
///
/// Requests report back over the controller's event channel; the controller
/// calls `complete_add` / `complete_delete` when the events arrive.
pub struct MutationController {
    service: Arc<dyn RecordService>,
    in_flight: InFlightSet,
    draft_title: String,
    draft_url: String,
}

impl MutationController {
    pub fn new(service: Arc<dyn RecordService>) -> Self {
        Self {
            service,
            in_flight: InFlightSet::default(),
            draft_title: String::new(),
            draft_url: String::new(),
        }
    }

    pub fn set_draft(&mut self, title: impl Into<String>, url: impl Into<String>) {
        self.draft_title = title.into();
        self.draft_url = url.into();
    }

    pub fn draft_title(&self) -> &str {
        &self.draft_title
    }

    pub fn draft_url(&self) -> &str {
        &self.draft_url
    }

    /// Submit the draft as a new bookmark.
    ///
    /// Refused (returns false) when either draft field is empty or an add is
    /// already in flight. The spawned request reports via
    /// [`AppEvent::AddCompleted`].
    pub fn submit_add(&mut self, user_id: &str, events: &mpsc::Sender<AppEvent>) -> bool {
        if self.draft_title.is_empty() || self.draft_url.is_empty() {
            return false;
        }
        if !self.in_flight.begin(InFlightKey::NewEntry, Operation::Adding) {
            tracing::debug!("Add already in flight, ignoring submit");
            return false;
        }

        let fields = NewBookmark {
            title: self.draft_title.clone(),
            url: self.draft_url.clone(),
            user_id: user_id.to_string(),
        };
        let service = self.service.clone();
        let events = events.clone();
        tokio::spawn(async move {
            let result = service.insert(&fields).await;
            let _ = events.send(AppEvent::AddCompleted(result)).await;
        });
        true
    }

    /// Release the add slot and clear the draft. The draft clears on failure
    /// too, matching a submit-clears-the-form surface.
    pub fn complete_add(&mut self, result: &Result<Bookmark, ServiceError>) {
        self.in_flight.finish(&InFlightKey::NewEntry);
        self.draft_title.clear();
        self.draft_url.clear();
        match result {
            Ok(bookmark) => tracing::info!(id = %bookmark.id, "Bookmark added"),
            Err(err) => tracing::warn!(error = %err, "Add failed"),
        }
    }

    pub fn is_adding(&self) -> bool {
        self.in_flight.contains(&InFlightKey::NewEntry)
    }

    /// Submit a delete for the given record id.
    ///
    /// Refused when a delete for the same id is already outstanding.
    /// Deletes for different ids run concurrently.
    pub fn submit_delete(&mut self, id: &str, events: &mpsc::Sender<AppEvent>) -> bool {
        let key = InFlightKey::Record(id.to_string());
        if !self.in_flight.begin(key, Operation::Deleting) {
            tracing::debug!(id, "Delete already in flight, ignoring");
            return false;
        }

        let id = id.to_string();
        let service = self.service.clone();
        let events = events.clone();
        tokio::spawn(async move {
            let result = service.delete(&id).await;
            let _ = events.send(AppEvent::DeleteCompleted { id, result }).await;
        });
        true
    }

    pub fn complete_delete(&mut self, id: &str, result: &Result<(), ServiceError>) {
        self.in_flight.finish(&InFlightKey::Record(id.to_string()));
        match result {
            Ok(()) => tracing::info!(id, "Bookmark deleted"),
            Err(err) => tracing::warn!(id, error = %err, "Delete failed"),
        }
    }

    pub fn is_deleting(&self, id: &str) -> bool {
        self.in_flight.contains(&InFlightKey::Record(id.to_string()))
    }

    pub fn has_in_flight(&self) -> bool {
        !self.in_flight.is_empty()
    }
}
