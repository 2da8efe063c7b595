//! Wire-level error taxonomy for the OAuth surfaces.
//!
//! Four families, each with a fixed reporting shape:
//! - client errors (`invalid_request`, `invalid_client`): 400/401, caller
//!   mistake, never retried automatically
//! - grant errors (`invalid_grant`): 400, the client must restart the flow
//! - rate limiting: 429 with a retry hint
//! - server errors: 500, generic body, detail goes to the log only
//!
//! Revocation never reports an error at all; that special case lives in its
//! handler, not here.

use axum::response::{IntoResponse, Response};
use axum::Json;
use http::{header, StatusCode};
use log::error;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// OAuth error response body (RFC 6749 §5.2)
#[derive(Debug, Serialize, ToSchema)]
pub struct OAuthErrorBody {
    /// Error code
    pub error: String,
    /// Human-readable error description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
    /// Client CSRF state, echoed on authorization errors when provided
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid_request: {description}")]
    InvalidRequest {
        description: String,
        state: Option<String>,
    },
    #[error("invalid_client: {description}")]
    InvalidClient { description: String },
    #[error("invalid_grant: {description}")]
    InvalidGrant { description: String },
    #[error("unsupported_grant_type")]
    UnsupportedGrantType,
    #[error("rate limited")]
    RateLimited { retry_after_secs: u64 },
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn invalid_request(description: impl Into<String>) -> Self {
        Self::InvalidRequest {
            description: description.into(),
            state: None,
        }
    }

    pub fn invalid_request_with_state(
        description: impl Into<String>,
        state: Option<String>,
    ) -> Self {
        Self::InvalidRequest {
            description: description.into(),
            state,
        }
    }

    pub fn invalid_client(description: impl Into<String>) -> Self {
        Self::InvalidClient {
            description: description.into(),
        }
    }

    pub fn invalid_grant(description: impl Into<String>) -> Self {
        Self::InvalidGrant {
            description: description.into(),
        }
    }

    pub fn internal(description: impl Into<String>) -> Self {
        Self::Internal(description.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::InvalidRequest { description, state } => (
                StatusCode::BAD_REQUEST,
                Json(OAuthErrorBody {
                    error: "invalid_request".to_string(),
                    error_description: Some(description),
                    state,
                }),
            )
                .into_response(),
            Self::InvalidClient { description } => (
                StatusCode::UNAUTHORIZED,
                Json(OAuthErrorBody {
                    error: "invalid_client".to_string(),
                    error_description: Some(description),
                    state: None,
                }),
            )
                .into_response(),
            Self::InvalidGrant { description } => (
                StatusCode::BAD_REQUEST,
                Json(OAuthErrorBody {
                    error: "invalid_grant".to_string(),
                    error_description: Some(description),
                    state: None,
                }),
            )
                .into_response(),
            Self::UnsupportedGrantType => (
                StatusCode::BAD_REQUEST,
                Json(OAuthErrorBody {
                    error: "unsupported_grant_type".to_string(),
                    error_description: Some(
                        "Supported grant types: authorization_code, refresh_token".to_string(),
                    ),
                    state: None,
                }),
            )
                .into_response(),
            Self::RateLimited { retry_after_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, retry_after_secs.to_string())],
                Json(OAuthErrorBody {
                    error: "rate_limited".to_string(),
                    error_description: Some(format!(
                        "Too many requests; retry after {} seconds",
                        retry_after_secs
                    )),
                    state: None,
                }),
            )
                .into_response(),
            Self::Internal(detail) => {
                // The detail stays in the log; the caller gets a generic body
                error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(OAuthErrorBody {
                        error: "server_error".to_string(),
                        error_description: Some("Internal server error".to_string()),
                        state: None,
                    }),
                )
                    .into_response()
            }
        }
    }
}

impl From<crate::store::StoreError> for ApiError {
    fn from(err: crate::store::StoreError) -> Self {
        Self::Internal(format!("store failure: {}", err))
    }
}

impl From<crate::tokens::TokenError> for ApiError {
    fn from(err: crate::tokens::TokenError) -> Self {
        Self::Internal(format!("token failure: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::invalid_request("x").into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::invalid_client("x").into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::invalid_grant("x").into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::UnsupportedGrantType.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::internal("x").into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_rate_limit_carries_retry_after() {
        let response = ApiError::RateLimited {
            retry_after_secs: 17,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get(header::RETRY_AFTER).unwrap(),
            &"17".parse::<http::HeaderValue>().unwrap()
        );
    }
}
