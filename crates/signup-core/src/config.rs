//! Application configuration management.
//!
//! Configuration comes from an optional JSON file at
//! `~/.config/signup/config.json`, overridden by `SIGNUP_*` environment
//! variables. The API token and user email have no defaults and must be
//! provided by one of the two.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "signup";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Default base URL of the region lookup API
pub const DEFAULT_API_URL: &str = "https://www.universal-tutorial.com/api";

/// Country whose states are offered by default
pub const DEFAULT_COUNTRY: &str = "United States";

pub const ENV_API_URL: &str = "SIGNUP_API_URL";
pub const ENV_API_TOKEN: &str = "SIGNUP_API_TOKEN";
pub const ENV_USER_EMAIL: &str = "SIGNUP_USER_EMAIL";
pub const ENV_COUNTRY: &str = "SIGNUP_COUNTRY";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub api_token: Option<String>,
    pub user_email: Option<String>,
    pub country: String,
    pub persist_cookies: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_token: None,
            user_email: None,
            country: DEFAULT_COUNTRY.to_string(),
            persist_cookies: true,
        }
    }
}

impl Config {
    /// Load the config file (if any) and apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Ok(path) if path.exists() => {
                let contents = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                serde_json::from_str(&contents)
                    .with_context(|| format!("Failed to parse {}", path.display()))?
            }
            _ => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from a key lookup; empty values are ignored
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_API_URL) {
            self.api_url = url;
        }
        if let Some(token) = get(ENV_API_TOKEN) {
            self.api_token = Some(token);
        }
        if let Some(email) = get(ENV_USER_EMAIL) {
            self.user_email = Some(email);
        }
        if let Some(country) = get(ENV_COUNTRY) {
            self.country = country;
        }
    }

    /// Resolve the credentials needed for token issuance
    pub fn credentials(&self) -> Result<ApiCredentials> {
        let Some(api_token) = self.api_token.clone() else {
            bail!("Missing API token - set {}", ENV_API_TOKEN);
        };
        let Some(user_email) = self.user_email.clone() else {
            bail!("Missing user email - set {}", ENV_USER_EMAIL);
        };
        Ok(ApiCredentials {
            base_url: self.api_url.trim_end_matches('/').to_string(),
            api_token,
            user_email,
        })
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}

/// Fixed credentials sent to the token-issuance endpoint.
#[derive(Clone)]
pub struct ApiCredentials {
    pub base_url: String,
    pub api_token: String,
    pub user_email: String,
}

impl ApiCredentials {
    pub fn new(base_url: &str, api_token: &str, user_email: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
            user_email: user_email.to_string(),
        }
    }
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("base_url", &self.base_url)
            .field("api_token", &"<redacted>")
            .field("user_email", &self.user_email)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.country, "United States");
        assert!(config.persist_cookies);
        assert!(config.credentials().is_err());
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::default();
        config.apply_overrides(lookup(&[
            (ENV_API_URL, "http://localhost:8080/api/"),
            (ENV_API_TOKEN, "secret"),
            (ENV_USER_EMAIL, "dev@example.com"),
            (ENV_COUNTRY, "Canada"),
        ]));

        assert_eq!(config.country, "Canada");
        let creds = config.credentials().unwrap();
        assert_eq!(creds.base_url, "http://localhost:8080/api");
        assert_eq!(creds.api_token, "secret");
        assert_eq!(creds.user_email, "dev@example.com");
    }

    #[test]
    fn test_blank_override_is_ignored() {
        let mut config = Config::default();
        config.apply_overrides(lookup(&[(ENV_API_URL, "  ")]));
        assert_eq!(config.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_missing_email_is_reported() {
        let mut config = Config::default();
        config.apply_overrides(lookup(&[(ENV_API_TOKEN, "secret")]));

        let err = config.credentials().unwrap_err();
        assert!(err.to_string().contains(ENV_USER_EMAIL));
    }

    #[test]
    fn test_partial_config_file() {
        let config: Config = serde_json::from_str(r#"{"country": "India"}"#).unwrap();
        assert_eq!(config.country, "India");
        assert_eq!(config.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_credentials_debug_redacts_token() {
        let creds = ApiCredentials::new("http://x", "top-secret", "a@b.c");
        let shown = format!("{:?}", creds);
        assert!(!shown.contains("top-secret"));
        assert!(shown.contains("a@b.c"));
    }
}
