use reqwest::Url;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{ConfigError, Secret};

/// Credentials and endpoints for the Spotify Web API.
///
/// `refresh_token` is optional so the service can boot before the one-time
/// authorization flow has minted one. `state_secret` signs the anti-CSRF
/// `state` of that flow; when absent a random per-process key is used.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: Secret,
    #[serde(default)]
    pub refresh_token: Option<Secret>,
    pub redirect_uri: String,
    #[serde(default)]
    pub state_secret: Option<Secret>,
    #[serde(default = "default_state_ttl_seconds")]
    pub state_ttl_seconds: i64,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    #[serde(default = "default_accounts_url")]
    pub accounts_url: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_timeout_in_ms")]
    pub timeout_in_ms: u64,
}

impl SpotifyConfig {
    /// The OAuth token endpoint used for both grant types.
    pub fn token_url(&self) -> String {
        format!("{}/api/token", self.accounts_url.trim_end_matches('/'))
    }

    /// The consent page the operator is redirected to.
    pub fn authorize_url(&self) -> String {
        format!("{}/authorize", self.accounts_url.trim_end_matches('/'))
    }

    /// Joins a Web API path such as `/me/player/currently-playing` onto `api_url`.
    pub fn api_endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_url.trim_end_matches('/'), path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client_id.trim().is_empty() {
            return Err(ConfigError::Empty("spotify.client_id"));
        }
        if self.client_secret.is_empty() {
            return Err(ConfigError::Empty("spotify.client_secret"));
        }
        if self.refresh_token.as_ref().is_some_and(Secret::is_empty) {
            return Err(ConfigError::Empty("spotify.refresh_token"));
        }
        if self.state_secret.as_ref().is_some_and(Secret::is_empty) {
            return Err(ConfigError::Empty("spotify.state_secret"));
        }
        if self.state_ttl_seconds <= 0 {
            return Err(ConfigError::NotPositive("spotify.state_ttl_seconds"));
        }
        if self.timeout_in_ms == 0 {
            return Err(ConfigError::NotPositive("spotify.timeout_in_ms"));
        }
        check_url("spotify.redirect_uri", &self.redirect_uri)?;
        check_url("spotify.accounts_url", &self.accounts_url)?;
        check_url("spotify.api_url", &self.api_url)?;
        Ok(())
    }
}

fn check_url(field: &'static str, value: &str) -> Result<(), ConfigError> {
    Url::parse(value)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidUrl {
            field,
            reason: e.to_string(),
        })
}

fn default_state_ttl_seconds() -> i64 {
    600
}

fn default_scopes() -> Vec<String> {
    vec![
        "user-read-currently-playing".to_string(),
        "user-read-recently-played".to_string(),
    ]
}

fn default_accounts_url() -> String {
    "https://accounts.spotify.com".to_string()
}

fn default_api_url() -> String {
    "https://api.spotify.com/v1".to_string()
}

fn default_timeout_in_ms() -> u64 {
    10_000
}
