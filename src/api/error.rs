use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use crate::error::Error;

/// Error surfaced to HTTP callers.
#[derive(Debug)]
pub enum ApiError {
    /// Request rejected before anything was fetched.
    BadRequest(&'static str),
    /// Fetching or computing failed. `context` becomes the `error` field.
    Failed {
        context: &'static str,
        source: Error,
    },
}

impl ApiError {
    pub fn failed(context: &'static str) -> impl FnOnce(Error) -> ApiError {
        move |source| ApiError::Failed { context, source }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest(msg) => write!(f, "bad_request: {msg}"),
            Self::Failed { context, source } => write!(f, "{context}: {source}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            Self::Failed { context, source } => match source {
                // Mirror the provider's status so callers see e.g. a 404 for unknown tickers
                Error::Upstream { status, body } => (
                    StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                    json!({ "error": context, "details": body }),
                ),
                Error::InvalidParameters(msg) => (
                    StatusCode::BAD_REQUEST,
                    json!({ "error": context, "details": msg }),
                ),
                other => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": context, "details": other.to_string() }),
                ),
            },
        };

        (status, axum::Json(body)).into_response()
    }
}
