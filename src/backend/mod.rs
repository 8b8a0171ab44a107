//! HTTP adapters for a PostgREST/GoTrue-style backend.
//!
//! [`Backend`] holds the shared reqwest client, the validated base URL, and
//! the credentials every request carries: the project `apikey` header plus a
//! bearer access token. The concrete services are
//! [`HttpAuthService`](auth::HttpAuthService),
//! [`HttpRecordService`](records::HttpRecordService), and the
//! [`PollingChangeFeed`](poll::PollingChangeFeed) fallback feed.

pub mod auth;
pub mod poll;
pub mod records;

use crate::service::ServiceError;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub use auth::HttpAuthService;
pub use poll::PollingChangeFeed;
pub use records::HttpRecordService;

/// Errors constructing the backend handle.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Invalid backend base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),

    /// Credentials travel on every request, so plain HTTP is only allowed
    /// toward localhost.
    #[error("Backend base URL must use https (got {0})")]
    InsecureBaseUrl(String),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Shared HTTP plumbing for all backend adapters.
#[derive(Clone)]
pub struct Backend {
    client: reqwest::Client,
    base: Url,
    api_key: SecretString,
    access_token: SecretString,
}

impl Backend {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    /// Build a backend handle for `base_url`.
    ///
    /// The base URL must be https unless it points at localhost (local
    /// development stacks). A missing trailing slash is added so joins
    /// keep the full path.
    pub fn new(
        base_url: &str,
        api_key: SecretString,
        access_token: SecretString,
    ) -> Result<Self, BackendError> {
        let mut base = Url::parse(base_url)?;
        let is_local = matches!(base.host_str(), Some("localhost" | "127.0.0.1" | "[::1]"));
        if base.scheme() != "https" && !is_local {
            return Err(BackendError::InsecureBaseUrl(base.scheme().to_string()));
        }
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }

        let client = reqwest::Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base,
            api_key,
            access_token,
        })
    }

    /// Resolve a relative endpoint path against the base URL.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, ServiceError> {
        self.base
            .join(path)
            .map_err(|e| ServiceError::Decode(format!("bad endpoint path {path:?}: {e}")))
    }

    /// A request builder with both credential headers attached.
    pub(crate) fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", self.api_key.expose_secret())
            .bearer_auth(self.access_token.expose_secret())
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("base", &self.base.as_str())
            .field("api_key", &"[REDACTED]")
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ServiceError::Timeout
        } else if err.is_decode() {
            ServiceError::Decode(err.to_string())
        } else {
            ServiceError::Network(err.to_string())
        }
    }
}

/// Map a non-success status to a `ServiceError`, passing success through.
pub(crate) fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ServiceError> {
    let status = response.status();
    if status.as_u16() == 401 {
        return Err(ServiceError::Unauthorized);
    }
    if !status.is_success() {
        return Err(ServiceError::Http(status.as_u16()));
    }
    Ok(response)
}
