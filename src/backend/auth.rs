//! Session queries against the backend's auth surface.

use super::{check_status, Backend};
use crate::service::{AuthService, ServiceError, SignInRedirect};
use crate::types::Session;
use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;

/// Row shape of the auth user endpoint. Extra fields are ignored.
#[derive(Debug, Deserialize)]
struct UserRow {
    id: String,
    #[serde(default)]
    email: String,
}

/// [`AuthService`] over the backend's token-introspection endpoints.
///
/// The access token is the session: a 401 from the user endpoint means
/// "signed out", not an error.
pub struct HttpAuthService {
    backend: Backend,
}

impl HttpAuthService {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl AuthService for HttpAuthService {
    async fn get_session(&self) -> Result<Option<Session>, ServiceError> {
        let url = self.backend.endpoint("auth/v1/user")?;
        let response = self.backend.request(Method::GET, url).send().await?;

        let user: UserRow = match check_status(response) {
            Ok(response) => response.json().await?,
            Err(ServiceError::Unauthorized) => return Ok(None),
            Err(err) => return Err(err),
        };
        Ok(Some(Session {
            user_id: user.id,
            email: user.email,
        }))
    }

    /// Build the provider authorize URL. No network round trip: the OAuth
    /// dance happens wherever the caller sends the user.
    async fn sign_in_with_provider(
        &self,
        provider: &str,
        redirect_to: &str,
    ) -> Result<SignInRedirect, ServiceError> {
        let mut url = self.backend.endpoint("auth/v1/authorize")?;
        url.query_pairs_mut()
            .append_pair("provider", provider)
            .append_pair("redirect_to", redirect_to);
        Ok(SignInRedirect {
            url: url.into(),
        })
    }

    async fn sign_out(&self) -> Result<(), ServiceError> {
        let url = self.backend.endpoint("auth/v1/logout")?;
        let response = self.backend.request(Method::POST, url).send().await?;
        check_status(response)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    #[tokio::test]
    async fn test_sign_in_redirect_builds_authorize_url() {
        let backend = Backend::new(
            "https://vault.example.com",
            SecretString::from("anon"),
            SecretString::from("token"),
        )
        .unwrap();
        let auth = HttpAuthService::new(backend);

        let redirect = auth
            .sign_in_with_provider("google", "https://app.example.com/dashboard")
            .await
            .unwrap();

        assert!(redirect.url.starts_with("https://vault.example.com/auth/v1/authorize?"));
        assert!(redirect.url.contains("provider=google"));
        assert!(redirect
            .url
            .contains("redirect_to=https%3A%2F%2Fapp.example.com%2Fdashboard"));
    }
}
