//! API client for the region lookup service.
//!
//! `ApiClient` resolves a bearer token through the `TokenStore` and issues
//! authenticated GET requests. Every call returns a typed `ApiError` on
//! failure; nothing is logged and dropped.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::ApiError;
use crate::auth::{CookieStore, TokenStore};
use crate::config::ApiCredentials;
use crate::models::{CityName, StateName};

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// URL listing the states of `country`, or `""` when no country is given
pub fn state_api_url(base_url: &str, country: &str) -> String {
    if country.is_empty() {
        return String::new();
    }
    format!("{}/states/{}", base_url, country)
}

/// URL listing the cities of `state`, or `""` when no state is given
pub fn city_api_url(base_url: &str, state: &str) -> String {
    if state.is_empty() {
        return String::new();
    }
    format!("{}/cities/{}", base_url, state)
}

/// Authenticated client. Clone is cheap: the connection pool, credentials
/// and cookie jar are all shared.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Arc<str>,
    tokens: TokenStore,
}

impl ApiClient {
    /// Create a new API client backed by the given cookie jar
    pub fn new(credentials: ApiCredentials, cookies: Arc<dyn CookieStore>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            base_url: Arc::from(credentials.base_url.as_str()),
            tokens: TokenStore::new(client.clone(), credentials, cookies),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn state_api_url(&self, country: &str) -> String {
        state_api_url(&self.base_url, country)
    }

    pub fn city_api_url(&self, state: &str) -> String {
        city_api_url(&self.base_url, state)
    }

    /// GET `url` with the cached (or freshly issued) bearer token and parse
    /// the JSON body.
    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        if url.is_empty() {
            return Err(ApiError::InvalidInput);
        }

        let token = self.tokens.get_token().await?;

        debug!(url = %url, "Sending authenticated GET");
        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/json")
            .bearer_auth(token.as_str())
            .send()
            .await?;

        let response = Self::check_response(response).await?;

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            debug!(url = %url, error = %e, "Response body is not valid JSON");
            ApiError::ParseFailure(e.to_string())
        })
    }

    /// Check if response is successful, keeping the status if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            debug!(status = %status, body = %ApiError::truncate_body(&body), "Request failed");
            Err(ApiError::FetchFailed { status })
        }
    }

    // ===== Region Lookups =====

    /// Fetch the states of a country, in API order
    pub async fn fetch_states(&self, country: &str) -> Result<Vec<StateName>, ApiError> {
        self.fetch_json(&self.state_api_url(country)).await
    }

    /// Fetch the cities of a state, in API order
    pub async fn fetch_cities(&self, state: &str) -> Result<Vec<CityName>, ApiError> {
        self.fetch_json(&self.city_api_url(state)).await
    }
}
