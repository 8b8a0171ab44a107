//! Local mirror of the user's bookmark collection.
//!
//! Every refresh replaces the whole snapshot with the server's response —
//! there is no merging or diffing. Readers hold a cheap `Arc` clone of the
//! current snapshot, so an in-progress refresh never mutates what a reader
//! is iterating.

use crate::service::{RecordService, ServiceError};
use crate::types::Bookmark;
use std::sync::{Arc, PoisonError, RwLock};

/// Snapshot-swapping store for one user's bookmarks.
///
/// Cloning is cheap and shares the snapshot; all clones observe the same
/// collection.
#[derive(Clone)]
pub struct RecordStore {
    service: Arc<dyn RecordService>,
    user_id: String,
    records: Arc<RwLock<Arc<Vec<Bookmark>>>>,
}

impl RecordStore {
    pub fn new(service: Arc<dyn RecordService>, user_id: impl Into<String>) -> Self {
        Self {
            service,
            user_id: user_id.into(),
            records: Arc::new(RwLock::new(Arc::new(Vec::new()))),
        }
    }

    /// Fetch the full collection from the record service and replace the
    /// snapshot. On error the existing snapshot is preserved untouched.
    pub async fn refresh(&self) -> Result<usize, ServiceError> {
        let rows = self.service.fetch_all(&self.user_id).await?;
        Ok(self.apply_snapshot(rows))
    }

    /// Replace the snapshot with an already-fetched response.
    ///
    /// Rows belonging to another user are dropped defensively; the backend
    /// filter should make this impossible, so a drop is logged. Ordering is
    /// newest-first by `created_at`; rows sharing a timestamp keep their
    /// arrival order (stable sort).
    pub fn apply_snapshot(&self, mut rows: Vec<Bookmark>) -> usize {
        let before = rows.len();
        rows.retain(|row| row.user_id == self.user_id);
        if rows.len() < before {
            tracing::warn!(
                dropped = before - rows.len(),
                user_id = %self.user_id,
                "Dropped rows belonging to another user"
            );
        }
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let count = rows.len();
        let snapshot = Arc::new(rows);
        *self
            .records
            .write()
            .unwrap_or_else(PoisonError::into_inner) = snapshot;
        count
    }

    /// Current snapshot. The returned `Arc` stays valid and unchanged even
    /// if a refresh lands while the caller is still holding it.
    pub fn list(&self) -> Arc<Vec<Bookmark>> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.list().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn service(&self) -> Arc<dyn RecordService> {
        self.service.clone()
    }
}
