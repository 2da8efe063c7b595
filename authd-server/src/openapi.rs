use utoipa::OpenApi;

pub(crate) const OAUTH_TAG: &str = "OAuth 2.1";
pub(crate) const INTERNAL_TAG: &str = "Internal API";
pub(crate) const HEALTH_TAG: &str = "Health API";

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::oauth::handlers::authorize,
        crate::api::oauth::handlers::token,
        crate::api::oauth::handlers::revoke,
        crate::api::oauth::handlers::discovery,
        crate::api::internal::complete_session,
        crate::api::health::healthy,
    ),
    components(schemas(
        crate::api::oauth::models::TokenRequest,
        crate::api::oauth::models::TokenResponse,
        crate::api::oauth::models::RevocationRequest,
        crate::api::oauth::models::RevocationResponse,
        crate::api::oauth::models::DiscoveryDocument,
        crate::api::oauth::models::CompleteSessionRequest,
        crate::api::oauth::models::CompleteSessionResponse,
        crate::errors::OAuthErrorBody,
    )),
    tags(
        (name = OAUTH_TAG, description = "Authorization-code flow with PKCE, token rotation, revocation and discovery"),
        (name = INTERNAL_TAG, description = "Trusted login-UI surface, API-key protected"),
        (name = HEALTH_TAG, description = "Health check endpoints"),
    ),
    info(
        title = "authd API",
        description = "OAuth 2.1 authorization server",
        version = "0.1.0"
    )
)]
pub(crate) struct ApiDoc;
