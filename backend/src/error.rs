//! Unified error handling for the backend API.
//!
//! Each stage of a request produces its own error kind; this module is the
//! only place where those kinds become HTTP status codes and JSON bodies.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use shared::api::ErrorResponse;
use thiserror::Error;

/// Unified error type for API handlers
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad client input
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Issuer answered but the payload is missing required parts
    #[error("Upstream protocol error: {0}")]
    UpstreamProtocol(String),

    /// Identity token missing, invalid or expired
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but rejected by policy
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource missing or not owned by the caller
    #[error("Not found: {0}")]
    NotFound(String),

    /// Issuer rejected the request with an HTTP error
    #[error("Upstream returned {status}")]
    Upstream {
        status: u16,
        details: serde_json::Value,
    },

    /// Transport failure while talking to the issuer
    #[error("Network error: {0}")]
    Network(String),

    /// Database connection pool error
    #[error("Database connection error")]
    ConnectionPool(#[source] diesel_async::pooled_connection::deadpool::PoolError),

    /// Database query error
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    /// Anything not classified above
    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    /// Classify an error coming back from the persistence layer.
    pub fn from_store(err: anyhow::Error) -> Self {
        let err = match err.downcast::<diesel_async::pooled_connection::deadpool::PoolError>() {
            Ok(pool_err) => return ApiError::ConnectionPool(pool_err),
            Err(other) => other,
        };
        match err.downcast::<diesel::result::Error>() {
            Ok(db_err) => ApiError::Database(db_err),
            Err(other) => ApiError::Internal(other),
        }
    }
}

impl From<diesel_async::pooled_connection::deadpool::PoolError> for ApiError {
    fn from(err: diesel_async::pooled_connection::deadpool::PoolError) -> Self {
        ApiError::ConnectionPool(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorResponse::new(msg)),
            ApiError::UpstreamProtocol(msg) => {
                tracing::error!("Upstream protocol error: {}", msg);
                (StatusCode::BAD_GATEWAY, ErrorResponse::new(msg))
            }
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, ErrorResponse::new(msg)),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, ErrorResponse::new(msg)),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorResponse::new(msg)),
            ApiError::Upstream { status, details } => {
                tracing::warn!(status, "Issuer rejected token exchange");
                (
                    StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                    ErrorResponse::with_details("Failed to exchange code with Google", details),
                )
            }
            ApiError::Network(msg) => {
                tracing::error!("Network error: {}", msg);
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    ErrorResponse::new("Network error communicating with Google"),
                )
            }
            ApiError::ConnectionPool(e) => {
                tracing::error!("Connection pool error: {:?}", e);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorResponse::new("Database connection unavailable"),
                )
            }
            ApiError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("Internal server error"),
                )
            }
            ApiError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("Internal server error"),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        serde_json::from_slice(&bytes).expect("body should be JSON")
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let cases = [
            (ApiError::bad_request("x"), StatusCode::BAD_REQUEST),
            (
                ApiError::UpstreamProtocol("x".into()),
                StatusCode::BAD_GATEWAY,
            ),
            (ApiError::unauthorized("x"), StatusCode::UNAUTHORIZED),
            (ApiError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (ApiError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ApiError::Network("x".into()), StatusCode::GATEWAY_TIMEOUT),
            (
                ApiError::Internal(anyhow::anyhow!("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[tokio::test]
    async fn test_upstream_status_passthrough() {
        let error = ApiError::Upstream {
            status: 400,
            details: serde_json::json!({"error": "invalid_grant"}),
        };
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"], "Failed to exchange code with Google");
        assert_eq!(body["details"]["error"], "invalid_grant");
    }

    #[test]
    fn test_store_errors_classified() {
        let err = ApiError::from_store(anyhow::Error::new(diesel::result::Error::NotFound));
        assert!(matches!(err, ApiError::Database(_)));

        let err = ApiError::from_store(anyhow::anyhow!("disk on fire"));
        assert!(matches!(err, ApiError::Internal(_)));
    }

    #[tokio::test]
    async fn test_internal_error_hides_cause() {
        let response = ApiError::Internal(anyhow::anyhow!("secret detail")).into_response();
        let body = body_json(response).await;
        assert_eq!(body, serde_json::json!({"error": "Internal server error"}));
    }
}
