//! OAuth wire-level request and response structures

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Authorization request (front channel, RFC 6749 §4.1.1).
///
/// Fields are optional at the type level so a missing parameter produces a
/// proper `invalid_request` body instead of an extractor rejection.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AuthorizationRequest {
    /// Must be "code"
    pub response_type: Option<String>,
    /// Client identifier
    pub client_id: Option<String>,
    /// Redirect URI; must exactly match a registered URI
    pub redirect_uri: Option<String>,
    /// Requested scopes (space-separated)
    pub scope: Option<String>,
    /// Client CSRF state, echoed back unchanged
    pub state: Option<String>,
    /// PKCE code challenge (mandatory)
    pub code_challenge: Option<String>,
    /// PKCE challenge method; omit or "S256"
    pub code_challenge_method: Option<String>,
}

/// Token request (back channel, form-encoded)
#[derive(Debug, Deserialize, ToSchema)]
pub struct TokenRequest {
    /// "authorization_code" or "refresh_token"
    pub grant_type: Option<String>,
    /// Client identifier
    pub client_id: Option<String>,
    /// Client secret (confidential clients only)
    pub client_secret: Option<String>,
    /// Authorization code (authorization_code grant)
    pub code: Option<String>,
    /// Redirect URI; must match the one recorded at authorization time
    pub redirect_uri: Option<String>,
    /// PKCE code verifier (authorization_code grant)
    pub code_verifier: Option<String>,
    /// Refresh token (refresh_token grant)
    pub refresh_token: Option<String>,
}

/// Successful token response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    /// Signed access token
    pub access_token: String,
    /// Always "Bearer"
    pub token_type: String,
    /// Access-token lifetime in seconds
    pub expires_in: i64,
    /// Opaque refresh token heading the (possibly new) rotation chain
    pub refresh_token: String,
    /// Granted scope (space-separated)
    pub scope: String,
}

/// Revocation request (RFC 7009)
#[derive(Debug, Deserialize, ToSchema)]
pub struct RevocationRequest {
    /// The token to revoke. Optional at the type level because this
    /// endpoint answers success no matter what it is handed.
    pub token: Option<String>,
    /// Optional hint; this server only revokes refresh tokens either way
    #[allow(dead_code)]
    pub token_type_hint: Option<String>,
}

/// Revocation response. Deliberately identical for valid, unknown and
/// already-dead tokens so revocation is not a token-validity oracle.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RevocationResponse {
    pub revoked: bool,
}

/// Server metadata document (RFC 8414 shape)
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DiscoveryDocument {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub revocation_endpoint: String,
    pub response_types_supported: Vec<String>,
    pub grant_types_supported: Vec<String>,
    pub code_challenge_methods_supported: Vec<String>,
    pub scopes_supported: Vec<String>,
}

/// Session completion call from the login UI (trusted, internal)
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CompleteSessionRequest {
    /// Session reference handed to the login UI at redirect time
    pub session_id: String,
    /// The user the login UI authenticated
    pub user_id: String,
}

/// Everything the login UI needs to send the user agent back to the client
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CompleteSessionResponse {
    /// Single-use authorization code
    pub code: String,
    /// Client CSRF state from the original authorization request
    pub state: Option<String>,
    /// Where to redirect the user agent
    pub redirect_uri: String,
}
