use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// A general purpose HTTP error type that can be converted into an `IntoResponse`.
///
/// The message is what the caller sees, so it must stay generic: upstream
/// details belong in the logs.
#[derive(Debug)]
pub struct HTTPError {
    status: StatusCode,
    message: String,
    timestamp: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<&'a str>,
}

impl HTTPError {
    /// Creates a new HTTP error with the given status code, message and optional timestamp.
    pub fn new(status: StatusCode, message: impl Into<String>, timestamp: Option<String>) -> Self {
        HTTPError {
            status,
            message: message.into(),
            timestamp,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, None)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message, None)
    }
}

/// Converts our `HTTPError` into a JSON `{ "error": ... }` response.
impl IntoResponse for HTTPError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: &self.message,
            timestamp: self.timestamp.as_deref(),
        };
        (self.status, Json(body)).into_response()
    }
}
