use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

const STATE_ISSUER: &str = "nowplaying-proxy/authorize";

/// Claims carried by the `state` parameter of the authorization redirect.
#[derive(Serialize, Deserialize, Debug)]
struct StateClaims {
    iss: String,
    iat: i64,
    exp: i64,
    nonce: String,
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("state is missing")]
    Missing,
    #[error("state could not be signed: {0}")]
    Sign(#[source] jsonwebtoken::errors::Error),
    #[error("state failed verification: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),
}

/// Issues and verifies the anti-CSRF `state` of the authorization-code flow.
///
/// The state is a short-lived HS256 JWT, so verification needs no server-side
/// session: any instance holding the same secret accepts it until it expires.
pub struct StateSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_seconds: i64,
}

impl StateSigner {
    pub fn new(secret: &[u8], ttl_seconds: i64) -> Self {
        StateSigner {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl_seconds,
        }
    }

    /// A signer with a random key that lives as long as the process.
    pub fn ephemeral(ttl_seconds: i64) -> Self {
        let secret = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        Self::new(secret.as_bytes(), ttl_seconds)
    }

    pub fn issue(&self) -> Result<String, StateError> {
        let now = Utc::now().timestamp();
        let claims = StateClaims {
            iss: STATE_ISSUER.to_string(),
            iat: now,
            exp: now + self.ttl_seconds,
            nonce: Uuid::new_v4().to_string(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(StateError::Sign)
    }

    /// Accepts only states this signer issued and that have not expired.
    pub fn verify(&self, state: Option<&str>) -> Result<(), StateError> {
        let state = state.filter(|s| !s.is_empty()).ok_or(StateError::Missing)?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_issuer(&[STATE_ISSUER]);

        decode::<StateClaims>(state, &self.decoding, &validation)
            .map(|_| ())
            .map_err(StateError::Invalid)
    }
}
