use std::sync::Arc;

use reqwest::{header, Client};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::store::{set_cookie, CookieStore};
use crate::api::ApiError;
use crate::config::ApiCredentials;

/// Cookie holding the cached access token
pub const AUTH_COOKIE: &str = "auth_token";

/// Issued tokens are cached for one day
pub const TOKEN_LIFETIME_DAYS: i64 = 1;

/// Path of the token-issuance endpoint relative to the API base
const TOKEN_PATH: &str = "getaccesstoken";

/// Opaque bearer credential.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    auth_token: Option<String>,
}

/// Obtains access tokens and caches them in the cookie jar.
///
/// Concurrent misses are not deduplicated: each one issues its own request
/// and the last write to the cookie wins.
#[derive(Clone)]
pub struct TokenStore {
    client: Client,
    credentials: Arc<ApiCredentials>,
    cookies: Arc<dyn CookieStore>,
}

impl TokenStore {
    pub fn new(client: Client, credentials: ApiCredentials, cookies: Arc<dyn CookieStore>) -> Self {
        Self {
            client,
            credentials: Arc::new(credentials),
            cookies,
        }
    }

    /// Token currently cached in the cookie jar, if any
    pub fn cached(&self) -> Option<AccessToken> {
        self.cookies
            .get(AUTH_COOKIE)
            .map(|c| c.value)
            .filter(|v| !v.is_empty())
            .map(AccessToken)
    }

    /// Return the cached token, issuing and caching a new one on a miss
    pub async fn get_token(&self) -> Result<AccessToken, ApiError> {
        if let Some(token) = self.cached() {
            debug!("Using cached access token");
            return Ok(token);
        }

        let token = self.issue().await.map_err(|e| {
            warn!(error = %e, "Access token issuance failed");
            ApiError::AuthFailure(e.to_string())
        })?;

        if let Err(e) = set_cookie(
            self.cookies.as_ref(),
            AUTH_COOKIE,
            token.as_str(),
            TOKEN_LIFETIME_DAYS,
        ) {
            warn!(error = %e, "Failed to cache access token");
        }

        info!("Issued new access token");
        Ok(token)
    }

    async fn issue(&self) -> Result<AccessToken, ApiError> {
        let url = format!("{}/{}", self.credentials.base_url, TOKEN_PATH);
        debug!(url = %url, "Requesting access token");

        let response = self
            .client
            .get(&url)
            .header(header::ACCEPT, "application/json")
            .header("api-token", self.credentials.api_token.as_str())
            .header("user-email", self.credentials.user_email.as_str())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(status = %status, body = %ApiError::truncate_body(&body), "Token endpoint rejected request");
            return Err(ApiError::FetchFailed { status });
        }

        let text = response.text().await?;
        let parsed: TokenResponse = serde_json::from_str(&text)
            .map_err(|e| ApiError::ParseFailure(e.to_string()))?;

        parsed
            .auth_token
            .filter(|t| !t.is_empty())
            .map(AccessToken)
            .ok_or_else(|| ApiError::ParseFailure("response has no auth_token".to_string()))
    }
}
