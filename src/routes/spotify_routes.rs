//! Spotify proxy endpoints: one-time authorization setup, token refresh and now playing.

use axum::extract::{Query, State};
use axum::http::header::{CACHE_CONTROL, EXPIRES, PRAGMA};
use axum::http::{HeaderName, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::{routing::get, Json, Router};
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::metrics::MetricsRecorder;
use crate::models::{AccessTokenBody, RefreshTokenBody};
use crate::spotify::now_playing;
use crate::state::AppState;
use crate::utils::http_helpers::HTTPError;

/// Headers that stop browsers and CDNs from caching a response.
const NO_STORE: [(HeaderName, &str); 3] = [
    (CACHE_CONTROL, "no-store, no-cache, must-revalidate, max-age=0"),
    (PRAGMA, "no-cache"),
    (EXPIRES, "0"),
];

/// Registers the Spotify routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/spotify/login", get(login))
        .route("/api/spotify/callback", get(callback))
        .route("/api/spotify/refresh", get(refresh))
        .route("/api/spotify/now-playing", get(now_playing_handler))
}

#[derive(Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// Redirects the operator to Spotify's consent page with a freshly signed state.
async fn login(State(state): State<AppState>) -> Result<Response, HTTPError> {
    let signed = state.oauth_state.issue().map_err(|e| {
        error!("Failed to sign authorization state: {}", e);
        HTTPError::internal("Failed to start authorization")
    })?;
    let url = state.spotify.authorize_url(&signed).map_err(|e| {
        error!("Failed to build authorize URL: {}", e);
        HTTPError::internal("Failed to start authorization")
    })?;

    info!(
        event_name = "spotify.authorize.start",
        event_domain = "spotify",
        "Redirecting to Spotify consent page"
    );
    Ok((NO_STORE, Redirect::temporary(url.as_str())).into_response())
}

/// Exchanges the authorization code from the consent redirect for a refresh token.
///
/// The refresh token is returned once so the operator can put it into the
/// configuration; it is never stored or logged here.
async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<impl IntoResponse, HTTPError> {
    if let Some(denied) = params.error.as_deref() {
        warn!(error = denied, "Spotify authorization was denied");
        return Err(HTTPError::bad_request("Authorization was denied"));
    }
    if let Err(e) = state.oauth_state.verify(params.state.as_deref()) {
        warn!(
            event_name = "spotify.callback.state_rejected",
            event_domain = "spotify",
            "Rejected authorization callback: {}",
            e
        );
        return Err(HTTPError::bad_request("Invalid state"));
    }
    let code = params
        .code
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| HTTPError::bad_request("Missing authorization code"))?;

    match state.spotify.exchange_code(code).await {
        Ok(refresh_token) => {
            info!(
                event_name = "spotify.callback.exchanged",
                event_domain = "spotify",
                "Authorization code exchanged; copy the returned refresh token into the configuration"
            );
            Ok((NO_STORE, Json(RefreshTokenBody { refresh_token })))
        }
        Err(e) => {
            error!(error_kind = e.kind(), "Authorization code exchange failed: {}", e);
            Err(HTTPError::internal("Failed to exchange authorization code"))
        }
    }
}

/// Mints a short-lived access token from the configured refresh token.
async fn refresh(State(state): State<AppState>) -> Result<impl IntoResponse, HTTPError> {
    match state.spotify.refresh_access_token().await {
        Ok(access_token) => {
            info!("Spotify refresh succeeded, issued new access token");
            Ok((NO_STORE, Json(AccessTokenBody { access_token })))
        }
        Err(e) => {
            error!(error_kind = e.kind(), "Spotify token refresh failed: {}", e);
            Err(HTTPError::internal("Failed to refresh token"))
        }
    }
}

/// Reports what is playing now, or what played last. Never cached.
async fn now_playing_handler(State(state): State<AppState>) -> Response {
    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

    match now_playing(&state.spotify, &timestamp).await {
        Ok((source, playback)) => {
            state.metrics.record_now_playing(source.as_str());
            (NO_STORE, Json(playback)).into_response()
        }
        Err(e) => {
            state.metrics.record_now_playing("error");
            error!(
                event_name = "spotify.now_playing.failed",
                event_domain = "spotify",
                error_kind = e.kind(),
                "Now-playing lookup failed: {}",
                e
            );
            (
                NO_STORE,
                HTTPError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error",
                    Some(timestamp),
                ),
            )
                .into_response()
        }
    }
}
