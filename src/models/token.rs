use serde::{Deserialize, Serialize};

/// Body returned by the provider's token endpoint.
///
/// Every field is optional: a success carries the tokens, a rejection carries
/// `error` (and usually `error_description`). Deliberately not `Debug`, since
/// it holds live credentials.
#[derive(Deserialize, Default)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    pub expires_in: Option<u64>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// `GET /api/spotify/callback` success body.
#[derive(Serialize, Deserialize)]
pub struct RefreshTokenBody {
    pub refresh_token: String,
}

/// `GET /api/spotify/refresh` success body.
#[derive(Serialize, Deserialize)]
pub struct AccessTokenBody {
    pub access_token: String,
}
