//! Bookmark CRUD against the backend's REST surface.

use super::{check_status, Backend};
use crate::service::{RecordService, ServiceError};
use crate::types::{Bookmark, NewBookmark};
use async_trait::async_trait;
use reqwest::Method;

const TABLE_PATH: &str = "rest/v1/bookmarks";

/// [`RecordService`] over the backend's row REST endpoint.
///
/// Row filtering and ordering are pushed to the server via query
/// parameters; the store applies its own defensive filter and sort on top.
pub struct HttpRecordService {
    backend: Backend,
}

impl HttpRecordService {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl RecordService for HttpRecordService {
    async fn fetch_all(&self, user_id: &str) -> Result<Vec<Bookmark>, ServiceError> {
        let mut url = self.backend.endpoint(TABLE_PATH)?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("user_id", &format!("eq.{user_id}"))
            .append_pair("order", "created_at.desc");

        let response = self.backend.request(Method::GET, url).send().await?;
        let rows: Vec<Bookmark> = check_status(response)?.json().await?;
        tracing::debug!(count = rows.len(), "Fetched bookmarks");
        Ok(rows)
    }

    async fn insert(&self, fields: &NewBookmark) -> Result<Bookmark, ServiceError> {
        let url = self.backend.endpoint(TABLE_PATH)?;
        let response = self
            .backend
            .request(Method::POST, url)
            .header("Prefer", "return=representation")
            .json(fields)
            .send()
            .await?;

        // The representation comes back as a one-element array.
        let mut rows: Vec<Bookmark> = check_status(response)?.json().await?;
        rows.pop()
            .ok_or_else(|| ServiceError::Decode("insert returned no rows".to_string()))
    }

    async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let mut url = self.backend.endpoint(TABLE_PATH)?;
        url.query_pairs_mut().append_pair("id", &format!("eq.{id}"));

        let response = self.backend.request(Method::DELETE, url).send().await?;
        check_status(response)?;
        Ok(())
    }
}
