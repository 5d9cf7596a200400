//! Shared application state.
//!
//! Everything here is immutable after startup, so handlers share it without
//! locks: the Spotify client (credentials plus a pooled HTTP client), the
//! authorization-state signer and the metrics registry.

use std::sync::Arc;
use tracing::warn;

use crate::config::ConfigV1;
use crate::metrics::Metrics;
use crate::spotify::{SpotifyClient, StateSigner};

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration loaded at startup.
    pub config: Arc<ConfigV1>,
    /// Client for the Spotify accounts service and Web API.
    pub spotify: Arc<SpotifyClient>,
    /// Signs and verifies the `state` of the authorization-code flow.
    pub oauth_state: Arc<StateSigner>,
    /// Prometheus registry and recorders.
    pub metrics: Metrics,
}

impl AppState {
    /// Builds the handler state from a validated configuration.
    pub fn new(config: Arc<ConfigV1>) -> Result<Self, reqwest::Error> {
        let metrics = Metrics::new();
        let spotify = SpotifyClient::new(&config.spotify, metrics.clone())?;

        let ttl = config.spotify.state_ttl_seconds;
        let oauth_state = match &config.spotify.state_secret {
            Some(secret) => StateSigner::new(secret.expose().as_bytes(), ttl),
            None => {
                warn!(
                    "spotify.state_secret is not set; authorization states are only valid \
                     for this process"
                );
                StateSigner::ephemeral(ttl)
            }
        };

        Ok(AppState {
            config,
            spotify: Arc::new(spotify),
            oauth_state: Arc::new(oauth_state),
            metrics,
        })
    }
}
