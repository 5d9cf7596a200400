//! Application startup and server initialization.
//!
//! Builds the shared state from the configuration, wires the routes and
//! serves them until the process is stopped.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::ConfigV1;
use crate::routes;
use crate::state::AppState;

/// Initializes and runs the application server.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built, the server fails to
/// bind to the configured address, or the server stops with an I/O error.
pub async fn run(config: Arc<ConfigV1>) -> Result<(), Box<dyn std::error::Error>> {
    let spotify = &config.spotify;
    info!(
        has_client_id = !spotify.client_id.is_empty(),
        has_client_secret = !spotify.client_secret.is_empty(),
        has_refresh_token = spotify.refresh_token.is_some(),
        has_state_secret = spotify.state_secret.is_some(),
        "Loaded Spotify credentials"
    );
    if spotify.refresh_token.is_none() {
        warn!(
            "No refresh token configured; visit /api/spotify/login to mint one. \
             /api/spotify/refresh and /api/spotify/now-playing will fail until then"
        );
    }

    let state = AppState::new(config.clone())?;
    let app = routes::create_router(state);

    let listener = TcpListener::bind(&config.bind_address).await?;
    info!("Starting server on {}", config.bind_address);

    axum::serve(listener, app).await?;
    Ok(())
}
