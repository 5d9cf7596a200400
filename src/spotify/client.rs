use reqwest::header::{CACHE_CONTROL, PRAGMA};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::error::{Endpoint, SpotifyError};
use crate::config::SpotifyConfig;
use crate::metrics::{Metrics, MetricsRecorder};
use crate::models::{CurrentlyPlaying, PlayHistory, RecentlyPlayed, TokenResponse};
use crate::utils::snippet::{snippet, MAX_SNIPPET_CHARS};

/// What the currently-playing endpoint told us.
#[derive(Debug)]
pub enum CurrentlyPlayingResponse {
    /// A playback object (which may still lack a usable track).
    Active(CurrentlyPlaying),
    /// 204, or a success with an empty body: no active device.
    NoContent,
    /// The endpoint answered with a 4xx or 5xx status.
    Failed(u16),
}

/// Thin client over the Spotify accounts service and Web API.
///
/// Holds one pooled `reqwest::Client` and the credential set. Access tokens
/// are never stored: every [`refresh_access_token`](Self::refresh_access_token)
/// call goes to the token endpoint.
pub struct SpotifyClient {
    http: Client,
    config: SpotifyConfig,
    metrics: Metrics,
}

impl SpotifyClient {
    pub fn new(config: &SpotifyConfig, metrics: Metrics) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_in_ms))
            .build()?;
        Ok(Self {
            http,
            config: config.clone(),
            metrics,
        })
    }

    /// Builds the consent URL the operator visits to start the one-time setup.
    pub fn authorize_url(&self, state: &str) -> Result<Url, SpotifyError> {
        let scope = self.config.scopes.join(" ");
        Url::parse_with_params(
            &self.config.authorize_url(),
            &[
                ("response_type", "code"),
                ("client_id", self.config.client_id.as_str()),
                ("scope", scope.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("state", state),
            ],
        )
        .map_err(|e| SpotifyError::InvalidAuthorizeUrl(e.to_string()))
    }

    /// Trades an authorization code for a refresh token.
    pub async fn exchange_code(&self, code: &str) -> Result<String, SpotifyError> {
        let form = [
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];
        let token = self.token_grant(&form).await?;
        token
            .refresh_token
            .filter(|t| !t.is_empty())
            .ok_or(SpotifyError::MissingField {
                endpoint: Endpoint::Token,
                field: "refresh_token",
            })
    }

    /// Trades the configured refresh token for a fresh access token.
    pub async fn refresh_access_token(&self) -> Result<String, SpotifyError> {
        let refresh_token = self
            .config
            .refresh_token
            .as_ref()
            .ok_or(SpotifyError::MissingRefreshToken)?;
        debug!(
            has_client_id = !self.config.client_id.is_empty(),
            has_client_secret = !self.config.client_secret.is_empty(),
            has_refresh_token = !refresh_token.is_empty(),
            "Refreshing Spotify access token"
        );

        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.expose()),
        ];
        let token = self.token_grant(&form).await?;
        token
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(SpotifyError::MissingField {
                endpoint: Endpoint::Token,
                field: "access_token",
            })
    }

    pub async fn currently_playing(
        &self,
        access_token: &str,
    ) -> Result<CurrentlyPlayingResponse, SpotifyError> {
        let endpoint = Endpoint::CurrentlyPlaying;
        let request = self
            .http
            .get(self.config.api_endpoint("/me/player/currently-playing"))
            .bearer_auth(access_token)
            .header(CACHE_CONTROL, "no-cache, no-store, must-revalidate")
            .header(PRAGMA, "no-cache");

        let (status, body) = self.send(endpoint, request).await?;
        if status.is_client_error() || status.is_server_error() {
            debug!(
                status = status.as_u16(),
                body_snippet = %snippet(&body, MAX_SNIPPET_CHARS),
                "currently-playing returned an error status"
            );
            return Ok(CurrentlyPlayingResponse::Failed(status.as_u16()));
        }
        if status == StatusCode::NO_CONTENT || body.trim().is_empty() {
            return Ok(CurrentlyPlayingResponse::NoContent);
        }
        parse(endpoint, &body).map(CurrentlyPlayingResponse::Active)
    }

    /// Fetches the single most recent play-history entry, if any.
    pub async fn recently_played(
        &self,
        access_token: &str,
    ) -> Result<Vec<PlayHistory>, SpotifyError> {
        let endpoint = Endpoint::RecentlyPlayed;
        let request = self
            .http
            .get(self.config.api_endpoint("/me/player/recently-played"))
            .query(&[("limit", "1")])
            .bearer_auth(access_token)
            .header(CACHE_CONTROL, "no-cache");

        let (status, body) = self.send(endpoint, request).await?;
        if !status.is_success() {
            return Err(rejected(endpoint, status, &body));
        }
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        let history: RecentlyPlayed = parse(endpoint, &body)?;
        Ok(history.items)
    }

    /// POSTs a form to the token endpoint with HTTP Basic client authentication.
    async fn token_grant(&self, form: &[(&str, &str)]) -> Result<TokenResponse, SpotifyError> {
        let endpoint = Endpoint::Token;
        let request = self
            .http
            .post(self.config.token_url())
            .basic_auth(
                &self.config.client_id,
                Some(self.config.client_secret.expose()),
            )
            .header(CACHE_CONTROL, "no-cache")
            .form(form);

        let (status, body) = self.send(endpoint, request).await?;
        if !status.is_success() {
            return Err(rejected(endpoint, status, &body));
        }

        let mut token: TokenResponse = parse(endpoint, &body)?;
        if let Some(error) = token.error.take() {
            warn!(
                event_name = "spotify.token.error_field",
                event_domain = "spotify",
                error = error.as_str(),
                "Token endpoint response contained an error"
            );
            return Err(SpotifyError::ErrorField {
                endpoint,
                error,
                description: token.error_description.take(),
            });
        }
        Ok(token)
    }

    /// Sends a request and reads the whole body, recording metrics either way.
    async fn send(
        &self,
        endpoint: Endpoint,
        request: RequestBuilder,
    ) -> Result<(StatusCode, String), SpotifyError> {
        let started = Instant::now();
        let outcome = async {
            let response = request.send().await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        }
        .await;
        self.metrics
            .record_upstream_duration(endpoint.as_str(), started.elapsed().as_secs_f64());

        match outcome {
            Ok((status, body)) => {
                self.metrics
                    .record_upstream_request(endpoint.as_str(), status_label(status));
                Ok((status, body))
            }
            Err(source) => {
                self.metrics
                    .record_upstream_request(endpoint.as_str(), "transport_error");
                Err(SpotifyError::Transport { endpoint, source })
            }
        }
    }
}

fn status_label(status: StatusCode) -> &'static str {
    if status == StatusCode::NO_CONTENT {
        "no_content"
    } else if status.is_success() {
        "success"
    } else if status.is_client_error() {
        "client_error"
    } else if status.is_server_error() {
        "server_error"
    } else {
        "other"
    }
}

fn rejected(endpoint: Endpoint, status: StatusCode, body: &str) -> SpotifyError {
    let snippet = snippet(body, MAX_SNIPPET_CHARS);
    warn!(
        event_name = "spotify.upstream.rejected",
        event_domain = "spotify",
        endpoint = endpoint.as_str(),
        status = status.as_u16(),
        body_snippet = snippet.as_str(),
        "Spotify rejected the request"
    );
    SpotifyError::Rejected {
        endpoint,
        status: status.as_u16(),
        snippet,
    }
}

fn parse<T: DeserializeOwned>(endpoint: Endpoint, body: &str) -> Result<T, SpotifyError> {
    serde_json::from_str(body).map_err(|source| SpotifyError::Parse { endpoint, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Secret;
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use mockito::{Matcher, Server};

    fn test_config(url: &str) -> SpotifyConfig {
        SpotifyConfig {
            client_id: "test-client".to_string(),
            client_secret: Secret::new("test-secret"),
            refresh_token: Some(Secret::new("test-refresh")),
            redirect_uri: "http://localhost:3000/api/spotify/callback".to_string(),
            state_secret: None,
            state_ttl_seconds: 600,
            scopes: vec![
                "user-read-currently-playing".to_string(),
                "user-read-recently-played".to_string(),
            ],
            accounts_url: url.to_string(),
            api_url: url.to_string(),
            timeout_in_ms: 2_000,
        }
    }

    fn client(url: &str) -> SpotifyClient {
        SpotifyClient::new(&test_config(url), Metrics::new()).expect("client builds")
    }

    fn basic_header() -> String {
        format!("Basic {}", STANDARD.encode("test-client:test-secret"))
    }

    #[tokio::test]
    async fn refresh_posts_basic_auth_and_form() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/api/token")
            .match_header("authorization", basic_header().as_str())
            .match_header("content-type", "application/x-www-form-urlencoded")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
                Matcher::UrlEncoded("refresh_token".into(), "test-refresh".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "fresh-access", "token_type": "Bearer", "expires_in": 3600}"#)
            .create_async()
            .await;

        let token = client(&server.url()).refresh_access_token().await;

        m.assert_async().await;
        assert_eq!(token.expect("refresh succeeds"), "fresh-access");
    }

    #[tokio::test]
    async fn refresh_surfaces_status_and_snippet_on_rejection() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/api/token")
            .with_status(400)
            .with_body(r#"{"error": "invalid_grant", "error_description": "Invalid refresh token"}"#)
            .create_async()
            .await;

        let err = client(&server.url())
            .refresh_access_token()
            .await
            .expect_err("400 must fail");

        match err {
            SpotifyError::Rejected {
                endpoint,
                status,
                snippet,
            } => {
                assert_eq!(endpoint, Endpoint::Token);
                assert_eq!(status, 400);
                assert!(snippet.contains("invalid_grant"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn refresh_treats_error_field_as_failure() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/api/token")
            .with_status(200)
            .with_body(r#"{"error": "invalid_client"}"#)
            .create_async()
            .await;

        let err = client(&server.url())
            .refresh_access_token()
            .await
            .expect_err("error field must fail");
        assert!(matches!(err, SpotifyError::ErrorField { ref error, .. } if error == "invalid_client"));
    }

    #[tokio::test]
    async fn refresh_without_configured_token_never_calls_out() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/api/token")
            .expect(0)
            .create_async()
            .await;

        let mut config = test_config(&server.url());
        config.refresh_token = None;
        let client = SpotifyClient::new(&config, Metrics::new()).expect("client builds");

        let err = client.refresh_access_token().await.expect_err("must fail");
        m.assert_async().await;
        assert!(matches!(err, SpotifyError::MissingRefreshToken));
    }

    #[tokio::test]
    async fn exchange_code_sends_code_and_redirect_uri() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/api/token")
            .match_header("authorization", basic_header().as_str())
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("code".into(), "auth-code".into()),
                Matcher::UrlEncoded(
                    "redirect_uri".into(),
                    "http://localhost:3000/api/spotify/callback".into(),
                ),
                Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"access_token": "a", "refresh_token": "long-lived"}"#)
            .create_async()
            .await;

        let refresh = client(&server.url()).exchange_code("auth-code").await;

        m.assert_async().await;
        assert_eq!(refresh.expect("exchange succeeds"), "long-lived");
    }

    #[tokio::test]
    async fn exchange_code_requires_a_refresh_token_in_the_body() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/api/token")
            .with_status(200)
            .with_body(r#"{"access_token": "a"}"#)
            .create_async()
            .await;

        let err = client(&server.url())
            .exchange_code("auth-code")
            .await
            .expect_err("must fail");
        assert!(matches!(
            err,
            SpotifyError::MissingField {
                field: "refresh_token",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn currently_playing_maps_statuses() {
        let mut server = Server::new_async().await;
        let client = client(&server.url());

        let idle = server
            .mock("GET", "/me/player/currently-playing")
            .match_header("authorization", "Bearer access")
            .with_status(204)
            .create_async()
            .await;
        assert!(matches!(
            client.currently_playing("access").await,
            Ok(CurrentlyPlayingResponse::NoContent)
        ));
        idle.remove_async().await;

        let failing = server
            .mock("GET", "/me/player/currently-playing")
            .with_status(503)
            .create_async()
            .await;
        assert!(matches!(
            client.currently_playing("access").await,
            Ok(CurrentlyPlayingResponse::Failed(503))
        ));
        failing.remove_async().await;

        server
            .mock("GET", "/me/player/currently-playing")
            .with_status(200)
            .with_body(r#"{"is_playing": true, "item": {"name": "Song", "artists": []}}"#)
            .create_async()
            .await;
        match client.currently_playing("access").await {
            Ok(CurrentlyPlayingResponse::Active(current)) => {
                assert!(current.is_playing);
                assert_eq!(current.track().map(|t| t.name.as_str()), Some("Song"));
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn currently_playing_rejects_malformed_json() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/me/player/currently-playing")
            .with_status(200)
            .with_body("{not json")
            .create_async()
            .await;

        let err = client(&server.url())
            .currently_playing("access")
            .await
            .expect_err("must fail");
        assert!(matches!(
            err,
            SpotifyError::Parse {
                endpoint: Endpoint::CurrentlyPlaying,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn recently_played_asks_for_one_item() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", Matcher::Regex(r"^/me/player/recently-played".into()))
            .match_query(Matcher::UrlEncoded("limit".into(), "1".into()))
            .match_header("authorization", "Bearer access")
            .with_status(200)
            .with_body(
                r#"{"items": [{"played_at": "2024-05-01T11:58:00.000Z",
                    "track": {"name": "Old Song", "artists": [{"name": "Someone"}]}}]}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let items = client(&server.url())
            .recently_played("access")
            .await
            .expect("history loads");

        m.assert_async().await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].track.name, "Old Song");
        assert_eq!(items[0].played_at, "2024-05-01T11:58:00.000Z");
    }

    #[test]
    fn authorize_url_carries_every_parameter() {
        let url = client("https://accounts.example.com")
            .authorize_url("signed-state")
            .expect("url builds");
        let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(url.path(), "/authorize");
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["client_id"], "test-client");
        assert_eq!(
            params["scope"],
            "user-read-currently-playing user-read-recently-played"
        );
        assert_eq!(
            params["redirect_uri"],
            "http://localhost:3000/api/spotify/callback"
        );
        assert_eq!(params["state"], "signed-state");
    }
}
