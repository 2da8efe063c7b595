//! Internal surface for the trusted login UI collaborator.
//!
//! `/authorize` is public; minting a code is not. The login UI calls
//! `complete_session` once it has authenticated the user, authenticating
//! itself with the internal API key. Keeping this a separate, key-protected
//! route makes the trust boundary structural instead of implied.

use crate::api::oauth::models::{CompleteSessionRequest, CompleteSessionResponse};
use crate::errors::{ApiError, OAuthErrorBody};
use crate::openapi::INTERNAL_TAG;
use crate::state::AppState;
use crate::store::{AuthorizationCode, StoreBackend};
use crate::tokens;
use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
    routing::post,
    Json, Router,
};
use chrono::Utc;
use log::{error, info, warn};
use subtle::ConstantTimeEq;

pub(super) fn router() -> Router<AppState> {
    Router::new().route("/internal/sessions/complete", post(complete_session))
}

/// Bearer API-key check for the internal surface. An unset key rejects
/// everything rather than opening the surface.
pub(super) async fn authentication_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let configured = state.config.internal_api_key.as_str();
    if configured.is_empty() {
        error!("Internal API key is not configured; rejecting internal call");
        return forbidden();
    }

    let auth_header = match request.headers().get(http::header::AUTHORIZATION) {
        Some(header) => header,
        None => {
            warn!("Missing Authorization header on internal call");
            return Response::builder()
                .status(StatusCode::UNAUTHORIZED)
                .body("Missing Authorization header".into())
                .unwrap_or_default();
        }
    };

    let presented = match auth_header.to_str() {
        Ok(header) if header.to_lowercase().starts_with("bearer ") => &header[7..],
        _ => {
            warn!("Invalid Authorization header format on internal call");
            return forbidden();
        }
    };

    if !bool::from(presented.as_bytes().ct_eq(configured.as_bytes())) {
        warn!("Internal authentication failed: invalid API key");
        return forbidden();
    }
    next.run(request).await
}

fn forbidden() -> Response {
    Response::builder()
        .status(StatusCode::FORBIDDEN)
        .body("You are not authorized to access this resource.".into())
        .unwrap_or_default()
}

/// Complete an authorization session with an authenticated user and mint
/// the single-use authorization code bound to the session's challenge,
/// redirect URI and scope.
#[utoipa::path(
    post,
    path = "/internal/sessions/complete",
    request_body = CompleteSessionRequest,
    responses(
        (status = 200, description = "Code minted", body = CompleteSessionResponse),
        (status = 400, description = "Unknown or expired session", body = OAuthErrorBody),
        (status = 401, description = "Missing credentials"),
        (status = 403, description = "Invalid API key")
    ),
    tag = INTERNAL_TAG
)]
pub(crate) async fn complete_session(
    State(state): State<AppState>,
    Json(request): Json<CompleteSessionRequest>,
) -> Result<Json<CompleteSessionResponse>, ApiError> {
    if request.user_id.is_empty() {
        return Err(ApiError::invalid_request("user_id is required"));
    }

    // Single-use: taking the session removes it, so a second completion
    // attempt for the same session fails
    let session = state
        .store
        .take_session(&request.session_id)
        .await?
        .ok_or_else(|| ApiError::invalid_grant("Unknown or expired session"))?;

    let code = AuthorizationCode {
        code: tokens::random_token(),
        client_id: session.client_id.clone(),
        user_id: request.user_id.clone(),
        redirect_uri: session.redirect_uri.clone(),
        code_challenge: session.code_challenge,
        scope: session.scope,
        expires_at: Utc::now().timestamp() + state.config.tokens.code_ttl_secs,
    };
    state.store.put_code(&code).await?;

    info!(
        "Issued authorization code for user '{}' via client '{}'",
        request.user_id, session.client_id
    );
    Ok(Json(CompleteSessionResponse {
        code: code.code,
        state: session.state,
        redirect_uri: session.redirect_uri,
    }))
}
