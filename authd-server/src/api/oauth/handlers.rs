//! Public OAuth endpoint handlers: authorize, token, revoke, discovery.

use crate::api::oauth::models::{
    AuthorizationRequest, DiscoveryDocument, RevocationRequest, RevocationResponse, TokenRequest,
    TokenResponse,
};
use crate::clients::OAuthClient;
use crate::errors::{ApiError, OAuthErrorBody};
use crate::headers;
use crate::openapi::OAUTH_TAG;
use crate::pkce;
use crate::ratelimit::Decision;
use crate::state::AppState;
use crate::store::{AuthorizationSession, RotateOutcome, StoreBackend};
use crate::tokens::{self, TokenIssuer};
use axum::{
    extract::{Form, Query, State},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use chrono::Utc;
use log::{info, warn};
use url::Url;
use uuid::Uuid;

/// Authorization endpoint (RFC 6749 §4.1.1, front channel).
///
/// Validates the request against the client registry, creates an
/// authorization session and redirects the user agent to the login UI.
/// Validation failures return a structured error body; nothing is ever
/// redirected to an unvalidated `redirect_uri`.
#[utoipa::path(
    get,
    path = "/authorize",
    params(
        ("response_type" = String, Query, description = "Must be 'code'"),
        ("client_id" = String, Query, description = "Client identifier"),
        ("redirect_uri" = String, Query, description = "Registered redirect URI, exact match"),
        ("scope" = Option<String>, Query, description = "Requested scopes, space-separated"),
        ("state" = Option<String>, Query, description = "Client CSRF state"),
        ("code_challenge" = String, Query, description = "PKCE S256 challenge (mandatory)"),
        ("code_challenge_method" = Option<String>, Query, description = "Omit or 'S256'")
    ),
    responses(
        (status = 303, description = "Redirect to the login UI with a session reference"),
        (status = 400, description = "Invalid request", body = OAuthErrorBody),
        (status = 401, description = "Unknown client", body = OAuthErrorBody),
        (status = 429, description = "Rate limited", body = OAuthErrorBody)
    ),
    tag = OAUTH_TAG
)]
pub(crate) async fn authorize(
    State(state): State<AppState>,
    Query(request): Query<AuthorizationRequest>,
) -> Result<Response, ApiError> {
    let client_id = require(request.client_id, "client_id")?;
    check_rate_limit(&state.authorize_limiter, &client_id).await?;

    info!("Authorization request from client_id: {}", client_id);

    let response_type = require(request.response_type, "response_type")?;
    if response_type != "code" {
        return Err(ApiError::invalid_request_with_state(
            "Only the 'code' response type is supported",
            request.state,
        ));
    }

    let client = state
        .clients
        .lookup(&client_id)
        .await
        .ok_or_else(|| ApiError::invalid_client("Unknown client"))?;

    let redirect_uri = require(request.redirect_uri, "redirect_uri")?;
    if !client.redirect_uri_registered(&redirect_uri) {
        return Err(ApiError::invalid_request_with_state(
            "redirect_uri is not registered for this client",
            request.state,
        ));
    }

    let scope = request.scope.unwrap_or_default();
    if !client.scopes_allowed(&scope) {
        return Err(ApiError::invalid_request_with_state(
            "Requested scope exceeds the client's allowed scopes",
            request.state,
        ));
    }

    // PKCE is mandatory for every client type, confidential ones included
    if !pkce::method_is_supported(request.code_challenge_method.as_deref()) {
        return Err(ApiError::invalid_request_with_state(
            "Only the S256 code_challenge_method is supported",
            request.state,
        ));
    }
    let code_challenge = request
        .code_challenge
        .filter(|challenge| !challenge.is_empty())
        .ok_or_else(|| {
            ApiError::invalid_request_with_state("code_challenge is required", request.state.clone())
        })?;
    if !pkce::challenge_is_well_formed(&code_challenge) {
        return Err(ApiError::invalid_request_with_state(
            "Malformed code_challenge",
            request.state,
        ));
    }

    let session = AuthorizationSession {
        session_id: Uuid::new_v4().to_string(),
        client_id: client.client_id.clone(),
        redirect_uri,
        scope,
        state: request.state,
        code_challenge,
        code_challenge_method: pkce::METHOD_S256.to_string(),
        expires_at: Utc::now().timestamp() + state.config.tokens.session_ttl_secs,
    };
    state.store.put_session(&session).await?;

    let mut login_url = Url::parse(&state.config.login_url)
        .map_err(|err| ApiError::internal(format!("invalid login_url configured: {}", err)))?;
    login_url
        .query_pairs_mut()
        .append_pair("session_id", &session.session_id)
        .append_pair("client_name", &client.name);

    info!(
        "Created authorization session for client '{}', awaiting login",
        client.client_id
    );
    Ok(Redirect::to(login_url.as_str()).into_response())
}

/// Token endpoint (RFC 6749 §3.2, back channel)
#[utoipa::path(
    post,
    path = "/token",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 400, description = "Invalid request or grant", body = OAuthErrorBody),
        (status = 401, description = "Client authentication failed", body = OAuthErrorBody),
        (status = 429, description = "Rate limited", body = OAuthErrorBody)
    ),
    tag = OAUTH_TAG
)]
pub(crate) async fn token(
    State(state): State<AppState>,
    Form(request): Form<TokenRequest>,
) -> Result<Response, ApiError> {
    let client_id = require(request.client_id.clone(), "client_id")?;
    check_rate_limit(&state.token_limiter, &client_id).await?;

    let grant_type = require(request.grant_type.clone(), "grant_type")?;
    info!(
        "Token request from client_id: {} with grant_type: {}",
        client_id, grant_type
    );

    let client = state
        .clients
        .lookup(&client_id)
        .await
        .ok_or_else(|| ApiError::invalid_client("Unknown client"))?;

    // Confidential clients authenticate with their secret on every
    // back-channel call; PKCE comes on top, not instead
    if !client.verify_secret(request.client_secret.as_deref()) {
        warn!("Client authentication failed for '{}'", client_id);
        return Err(ApiError::invalid_client("Client authentication failed"));
    }

    match grant_type.as_str() {
        "authorization_code" => exchange_authorization_code(&state, &client, request).await,
        "refresh_token" => rotate_refresh_token(&state, &client, request).await,
        _ => {
            warn!(
                "Unsupported grant type '{}' from client '{}'",
                grant_type, client_id
            );
            Err(ApiError::UnsupportedGrantType)
        }
    }
}

/// Authorization-code exchange: consume the code atomically, re-check the
/// bindings recorded at authorization time, verify proof of possession,
/// then mint the first token pair of a new rotation chain.
async fn exchange_authorization_code(
    state: &AppState,
    client: &OAuthClient,
    request: TokenRequest,
) -> Result<Response, ApiError> {
    let code = require(request.code, "code")?;
    let redirect_uri = require(request.redirect_uri, "redirect_uri")?;
    let code_verifier = require(request.code_verifier, "code_verifier")?;

    // Single-use: the read is also the delete, so a second exchange of the
    // same code finds nothing no matter how close the race
    let stored = state
        .store
        .consume_code(&code)
        .await?
        .ok_or_else(|| ApiError::invalid_grant("Authorization code is invalid or expired"))?;

    if stored.client_id != client.client_id {
        warn!(
            "Authorization code presented by '{}' was issued to another client",
            client.client_id
        );
        return Err(ApiError::invalid_grant(
            "Authorization code is invalid or expired",
        ));
    }

    if stored.redirect_uri != redirect_uri {
        warn!("redirect_uri mismatch in token request from '{}'", client.client_id);
        return Err(ApiError::invalid_grant(
            "redirect_uri does not match the authorization request",
        ));
    }

    if !pkce::verify(&stored.code_challenge, &code_verifier) {
        warn!("PKCE verification failed for client '{}'", client.client_id);
        return Err(ApiError::invalid_grant(
            "code_verifier does not match the code_challenge",
        ));
    }

    let issuer = TokenIssuer::new(state.signer.clone(), state.config.tokens.access_ttl_secs);
    let (access_token, expires_in) =
        issuer.issue_access_token(&stored.user_id, &client.client_id, &stored.scope)?;

    let refresh = issuer.mint_refresh_token(
        &stored.user_id,
        &client.client_id,
        &stored.scope,
        state.config.tokens.refresh_ttl_secs,
    );
    state.store.insert_refresh(&refresh).await?;

    info!(
        "Issued token pair for user '{}' via client '{}'",
        stored.user_id, client.client_id
    );
    Ok(headers::no_store(
        Json(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in,
            refresh_token: refresh.token,
            scope: stored.scope,
        })
        .into_response(),
    ))
}

/// Refresh grant: one atomic rotation in the store decides the winner;
/// everything after it is pure signing.
async fn rotate_refresh_token(
    state: &AppState,
    client: &OAuthClient,
    request: TokenRequest,
) -> Result<Response, ApiError> {
    let old_token = require(request.refresh_token, "refresh_token")?;

    let outcome = state
        .store
        .rotate_refresh(
            &old_token,
            &tokens::random_token(),
            &client.client_id,
            state.config.tokens.refresh_ttl_secs,
        )
        .await?;

    let successor = match outcome {
        RotateOutcome::Rotated(successor) => successor,
        // Reuse already triggered downstream revocation and a security log
        // inside the store; the caller learns nothing beyond invalid_grant
        RotateOutcome::NotFound | RotateOutcome::Reused { .. } => {
            return Err(ApiError::invalid_grant(
                "Refresh token is invalid or expired",
            ));
        }
    };

    let issuer = TokenIssuer::new(state.signer.clone(), state.config.tokens.access_ttl_secs);
    let (access_token, expires_in) =
        issuer.issue_access_token(&successor.user_id, &client.client_id, &successor.scope)?;

    info!(
        "Rotated refresh token for user '{}' via client '{}'",
        successor.user_id, client.client_id
    );
    Ok(headers::no_store(
        Json(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in,
            refresh_token: successor.token,
            scope: successor.scope,
        })
        .into_response(),
    ))
}

/// Revocation endpoint (RFC 7009).
///
/// Always reports success: a different answer for valid, unknown and
/// already-dead tokens would make this endpoint a validity oracle.
#[utoipa::path(
    post,
    path = "/revoke",
    request_body = RevocationRequest,
    responses(
        (status = 200, description = "Always", body = RevocationResponse)
    ),
    tag = OAUTH_TAG
)]
pub(crate) async fn revoke(
    State(state): State<AppState>,
    Form(request): Form<RevocationRequest>,
) -> Response {
    let token = request.token.unwrap_or_default();
    match state.store.revoke_refresh(&token).await {
        Ok(existed) => {
            info!("Revocation request processed (token known: {})", existed);
        }
        Err(err) => {
            // Still report success; the failure is ours, not the caller's
            log::error!("Store failure during revocation: {}", err);
        }
    }
    headers::no_store(Json(RevocationResponse { revoked: true }).into_response())
}

/// Server metadata (RFC 8414). Static, derived from configuration.
#[utoipa::path(
    get,
    path = "/.well-known/oauth-authorization-server",
    responses(
        (status = 200, description = "Server metadata", body = DiscoveryDocument)
    ),
    tag = OAUTH_TAG
)]
pub(crate) async fn discovery(State(state): State<AppState>) -> Json<DiscoveryDocument> {
    let issuer = state.config.issuer.trim_end_matches('/').to_string();
    Json(DiscoveryDocument {
        authorization_endpoint: format!("{}/authorize", issuer),
        token_endpoint: format!("{}/token", issuer),
        revocation_endpoint: format!("{}/revoke", issuer),
        issuer,
        response_types_supported: vec!["code".to_string()],
        grant_types_supported: vec![
            "authorization_code".to_string(),
            "refresh_token".to_string(),
        ],
        code_challenge_methods_supported: vec![pkce::METHOD_S256.to_string()],
        scopes_supported: state.clients.all_scopes().await,
    })
}

fn require(value: Option<String>, name: &str) -> Result<String, ApiError> {
    value
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::invalid_request(format!("{} is required", name)))
}

async fn check_rate_limit(
    limiter: &crate::ratelimit::SlidingWindowLimiter,
    caller: &str,
) -> Result<(), ApiError> {
    match limiter.check(caller).await {
        Decision::Allowed => Ok(()),
        Decision::Limited { retry_after_secs } => {
            warn!("Rate limit exceeded for caller '{}'", caller);
            Err(ApiError::RateLimited { retry_after_secs })
        }
    }
}
