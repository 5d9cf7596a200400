use std::time::Duration;
use tracing::{debug, info, warn};

use super::client::{CurrentlyPlayingResponse, SpotifyClient};
use super::error::SpotifyError;
use crate::models::PlaybackState;
use crate::utils::log_throttle::should_emit;

/// The widget polls every few seconds, so idle-path logs are rate limited.
const FALLBACK_LOG_WINDOW: Duration = Duration::from_secs(60);

/// Which branch of the aggregator produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackSource {
    /// Currently-playing returned a track.
    Live,
    /// Fell back to the most recent history entry.
    Recent,
    /// Neither endpoint had a track.
    Empty,
}

impl PlaybackSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackSource::Live => "live",
            PlaybackSource::Recent => "recent",
            PlaybackSource::Empty => "empty",
        }
    }
}

/// Resolves the current (or most recent) track into a [`PlaybackState`].
///
/// Mints a fresh access token, asks for the live player state, and when
/// nothing usable is playing falls back to the last played track. Every
/// call is a sequential chain of requests; any error aborts the chain.
pub async fn now_playing(
    client: &SpotifyClient,
    timestamp: &str,
) -> Result<(PlaybackSource, PlaybackState), SpotifyError> {
    let access_token = client.refresh_access_token().await?;

    let reason = match client.currently_playing(&access_token).await? {
        CurrentlyPlayingResponse::Active(current) => match current.track() {
            Some(track) => {
                debug!(
                    is_playing = current.is_playing,
                    title = track.name.as_str(),
                    "Live playback found"
                );
                return Ok((
                    PlaybackSource::Live,
                    PlaybackState::live(&current, track, timestamp),
                ));
            }
            None => "no track item",
        },
        CurrentlyPlayingResponse::NoContent => "no content",
        CurrentlyPlayingResponse::Failed(_) => "error status",
    };

    if let Some(suppressed_count) = should_emit("spotify.now_playing.fallback", FALLBACK_LOG_WINDOW)
    {
        info!(
            event_name = "spotify.now_playing.fallback",
            event_domain = "spotify",
            reason,
            suppressed_count,
            "Nothing playing, falling back to recently played"
        );
    }

    let history = match client.recently_played(&access_token).await {
        Ok(items) => items,
        Err(SpotifyError::Rejected { status, .. }) => {
            warn!(status, "recently-played was rejected, reporting no track data");
            Vec::new()
        }
        Err(e) => return Err(e),
    };

    match history.first() {
        Some(entry) => Ok((
            PlaybackSource::Recent,
            PlaybackState::recent(entry, timestamp),
        )),
        None => Ok((PlaybackSource::Empty, PlaybackState::empty(timestamp))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Secret, SpotifyConfig};
    use crate::metrics::Metrics;
    use mockito::{Matcher, Mock, Server, ServerGuard};

    const TS: &str = "2024-05-01T12:00:00.000Z";

    fn client(server: &ServerGuard) -> SpotifyClient {
        let config = SpotifyConfig {
            client_id: "test-client".to_string(),
            client_secret: Secret::new("test-secret"),
            refresh_token: Some(Secret::new("test-refresh")),
            redirect_uri: "http://localhost:3000/api/spotify/callback".to_string(),
            state_secret: None,
            state_ttl_seconds: 600,
            scopes: vec![],
            accounts_url: server.url(),
            api_url: server.url(),
            timeout_in_ms: 2_000,
        };
        SpotifyClient::new(&config, Metrics::new()).expect("client builds")
    }

    async fn token_mock(server: &mut ServerGuard) -> Mock {
        server
            .mock("POST", "/api/token")
            .with_status(200)
            .with_body(r#"{"access_token": "access"}"#)
            .create_async()
            .await
    }

    fn recent_mock(server: &mut ServerGuard) -> Mock {
        server.mock("GET", Matcher::Regex(r"^/me/player/recently-played".into()))
    }

    #[tokio::test]
    async fn ad_break_falls_back_to_history() {
        let mut server = Server::new_async().await;
        token_mock(&mut server).await;
        server
            .mock("GET", "/me/player/currently-playing")
            .with_status(200)
            .with_body(r#"{"is_playing": true, "currently_playing_type": "ad", "item": null}"#)
            .create_async()
            .await;
        let recent = recent_mock(&mut server)
            .with_status(200)
            .with_body(
                r#"{"items": [{"played_at": "2024-05-01T11:00:00.000Z",
                    "track": {"name": "Before The Ad", "artists": [{"name": "Band"}]}}]}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let (source, state) = now_playing(&client(&server), TS).await.expect("resolves");

        recent.assert_async().await;
        assert_eq!(source, PlaybackSource::Recent);
        assert!(!state.is_playing);
        assert_eq!(state.title.as_deref(), Some("Before The Ad"));
    }

    #[tokio::test]
    async fn rejected_history_reports_no_track_data() {
        let mut server = Server::new_async().await;
        token_mock(&mut server).await;
        server
            .mock("GET", "/me/player/currently-playing")
            .with_status(204)
            .create_async()
            .await;
        recent_mock(&mut server)
            .with_status(403)
            .with_body(r#"{"error": {"status": 403, "message": "Insufficient client scope"}}"#)
            .create_async()
            .await;

        let (source, state) = now_playing(&client(&server), TS).await.expect("resolves");

        assert_eq!(source, PlaybackSource::Empty);
        assert_eq!(state, PlaybackState::empty(TS));
    }

    #[tokio::test]
    async fn token_failure_aborts_before_any_player_call() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/api/token")
            .with_status(401)
            .with_body(r#"{"error": "invalid_client"}"#)
            .create_async()
            .await;
        let player = server
            .mock("GET", Matcher::Regex(r"^/me/player/".into()))
            .expect(0)
            .create_async()
            .await;

        let err = now_playing(&client(&server), TS)
            .await
            .expect_err("must fail");

        player.assert_async().await;
        assert!(matches!(err, SpotifyError::Rejected { status: 401, .. }));
    }
}
