//! Core domain types shared across the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Session
// ============================================================================

/// Authenticated identity context gating all data access.
///
/// Exists only while a session is live; created by `SessionGate` on resolve
/// and dropped on sign-out. Never persisted by this crate — session storage
/// belongs to the auth collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub email: String,
}

// ============================================================================
// Bookmark
// ============================================================================

/// A single bookmarked link as returned by the record service.
///
/// `id` is server-assigned and unique within a snapshot. `url` is stored
/// verbatim even when it fails to parse — URL parsing is display-only
/// (see `util::domain_of`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: String,
    pub title: String,
    pub url: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

/// Fields for an insert request. The server assigns `id` and `created_at`.
#[derive(Debug, Clone, Serialize)]
pub struct NewBookmark {
    pub title: String,
    pub url: String,
    pub user_id: String,
}

// ============================================================================
// Change Feed Events
// ============================================================================

/// Kind of row change reported by the change feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// Bit mask selecting which change kinds a subscription delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventMask(u8);

impl EventMask {
    pub const INSERT: EventMask = EventMask(0b001);
    pub const UPDATE: EventMask = EventMask(0b010);
    pub const DELETE: EventMask = EventMask(0b100);
    pub const ALL: EventMask = EventMask(0b111);

    /// Whether this mask selects the given change kind.
    pub fn matches(self, kind: ChangeKind) -> bool {
        let bit = match kind {
            ChangeKind::Insert => Self::INSERT.0,
            ChangeKind::Update => Self::UPDATE.0,
            ChangeKind::Delete => Self::DELETE.0,
        };
        self.0 & bit != 0
    }
}

/// A change notification delivered by the feed collaborator.
///
/// Carries no row payload: the engine refetches the whole collection on any
/// event, so the table and kind are all a consumer ever inspects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub table: String,
    pub kind: ChangeKind,
}
