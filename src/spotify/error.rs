use std::fmt;
use thiserror::Error;

/// The provider endpoints we call, used in errors, logs and metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Token,
    CurrentlyPlaying,
    RecentlyPlayed,
}

impl Endpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Token => "token",
            Endpoint::CurrentlyPlaying => "currently_playing",
            Endpoint::RecentlyPlayed => "recently_played",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything that can go wrong talking to Spotify.
///
/// Messages may name the endpoint, status and provider error code, and carry
/// a truncated body snippet, but never a credential. They are for logs only;
/// callers get a generic message.
#[derive(Debug, Error)]
pub enum SpotifyError {
    #[error("{endpoint} request failed: {source}")]
    Transport {
        endpoint: Endpoint,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} responded with status {status}")]
    Rejected {
        endpoint: Endpoint,
        status: u16,
        snippet: String,
    },
    #[error("{endpoint} returned error `{error}`")]
    ErrorField {
        endpoint: Endpoint,
        error: String,
        description: Option<String>,
    },
    #[error("{endpoint} response is missing `{field}`")]
    MissingField {
        endpoint: Endpoint,
        field: &'static str,
    },
    #[error("{endpoint} returned malformed JSON: {source}")]
    Parse {
        endpoint: Endpoint,
        #[source]
        source: serde_json::Error,
    },
    #[error("no refresh token is configured")]
    MissingRefreshToken,
    #[error("authorize URL could not be built: {0}")]
    InvalidAuthorizeUrl(String),
}

impl SpotifyError {
    /// Short label for the `result` metric dimension.
    pub fn kind(&self) -> &'static str {
        match self {
            SpotifyError::Transport { .. } => "transport_error",
            SpotifyError::Rejected { .. } => "rejected",
            SpotifyError::ErrorField { .. } => "error_field",
            SpotifyError::MissingField { .. } => "missing_field",
            SpotifyError::Parse { .. } => "parse_error",
            SpotifyError::MissingRefreshToken => "not_configured",
            SpotifyError::InvalidAuthorizeUrl(_) => "invalid_url",
        }
    }
}
