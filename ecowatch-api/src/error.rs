//! Error types for ecowatch-api
//!
//! Every error response is a JSON object with an `error` key. Server faults
//! use a fixed message and carry the fault text under `details`.

use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Message for every 500 response
pub const INTERNAL_ERROR_MESSAGE: &str = "An internal server error occurred.";

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("{0}")]
    BadRequest(String),

    /// Resource not found (404)
    #[error("{0}")]
    NotFound(String),

    /// Internal server error (500); the string becomes `details`
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Request body is not multipart
    #[error(transparent)]
    MultipartRejected(#[from] MultipartRejection),

    /// Multipart stream broke off or exceeded the body limit
    #[error(transparent)]
    Multipart(#[from] MultipartError),

    /// ecowatch-common error
    #[error(transparent)]
    Common(#[from] ecowatch_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::MultipartRejected(ref rejection) => {
                (rejection.status(), rejection.body_text())
            }
            ApiError::Multipart(ref err) => (err.status(), err.body_text()),
            ApiError::Common(ecowatch_common::Error::InvalidInput(msg)) => {
                (StatusCode::BAD_REQUEST, msg)
            }
            ApiError::Internal(details) => return internal_error(details),
            ApiError::Common(err) => return internal_error(err.to_string()),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

fn internal_error(details: String) -> Response {
    tracing::error!(details = %details, "Request failed with internal error");

    let body = Json(json!({
        "error": INTERNAL_ERROR_MESSAGE,
        "details": details,
    }));

    (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::Value;

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_bad_request_shape() {
        let response = ApiError::BadRequest("Missing required form fields: image".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({"error": "Missing required form fields: image"})
        );
    }

    #[tokio::test]
    async fn test_internal_error_carries_details() {
        let err = ApiError::Common(ecowatch_common::Error::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk full",
        )));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"], INTERNAL_ERROR_MESSAGE);
        assert_eq!(body["details"], "IO error: disk full");
    }

    #[tokio::test]
    async fn test_common_invalid_input_maps_to_400() {
        let response =
            ApiError::Common(ecowatch_common::Error::InvalidInput("Unsafe image key".into()))
                .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await, json!({"error": "Unsafe image key"}));
    }
}
