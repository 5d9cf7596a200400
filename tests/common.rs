#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use figment::{
    providers::{Format, Yaml},
    Figment,
};
use nowplaying_proxy::config::{load_config_from, ConfigV1};
use nowplaying_proxy::routes::create_router;
use nowplaying_proxy::state::AppState;

pub const CLIENT_ID: &str = "test-client";
pub const CLIENT_SECRET: &str = "test-client-secret";
pub const REFRESH_TOKEN: &str = "test-refresh-token";
pub const STATE_SECRET: &str = "test-state-secret";
pub const STATE_ISSUER: &str = "nowplaying-proxy/authorize";

/// Builds a configuration whose provider URLs point at a mock server.
pub fn build_config(server_url: &str) -> ConfigV1 {
    let yaml = format!(
        r#"
version: "1.0.0"
bind_address: "127.0.0.1:0"
logging:
  level: "debug"
  format: "console"
spotify:
  client_id: "{CLIENT_ID}"
  client_secret: "{CLIENT_SECRET}"
  refresh_token: "{REFRESH_TOKEN}"
  redirect_uri: "http://127.0.0.1:3000/api/spotify/callback"
  state_secret: "{STATE_SECRET}"
  accounts_url: "{server_url}"
  api_url: "{server_url}"
  timeout_in_ms: 3000
"#
    );
    load_config_from(Figment::new().merge(Yaml::string(&yaml))).expect("test config is valid")
}

pub fn build_app(config: ConfigV1) -> Router {
    let state = AppState::new(Arc::new(config)).expect("app state builds");
    create_router(state)
}

pub fn get(path: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(path)
        .body(Body::empty())
        .expect("failed to build request")
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body is readable");
    String::from_utf8(bytes.to_vec()).expect("body is UTF-8")
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let text = body_text(response).await;
    serde_json::from_str(&text).expect("body is JSON")
}

pub fn header<'a>(response: &'a Response<Body>, name: &str) -> Option<&'a str> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
}
