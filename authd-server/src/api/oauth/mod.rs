//! OAuth 2.1 authorization server surface.
//!
//! Authorization-code flow with mandatory S256 PKCE, refresh-token rotation
//! with reuse containment, oracle-free revocation and static discovery.
//! The user-facing login UI is an external collaborator: `/authorize` hands
//! it a session reference and the internal completion endpoint takes the
//! authenticated result back.

pub mod handlers;
pub mod models;

use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

/// Public OAuth routes
pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/authorize", get(handlers::authorize))
        .route("/token", post(handlers::token))
        .route("/revoke", post(handlers::revoke))
        .route(
            "/.well-known/oauth-authorization-server",
            get(handlers::discovery),
        )
}
