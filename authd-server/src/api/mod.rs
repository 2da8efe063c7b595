pub(crate) mod health;
pub(crate) mod internal;
pub(crate) mod oauth;

use crate::state::AppState;
use axum::{middleware, Router};

/// Combines all API routes into a single router
pub(super) fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(oauth::router())
        .merge(internal_routes(state))
}

/// The internal surface is only for the login UI; everything on it sits
/// behind the API-key middleware
fn internal_routes(state: &AppState) -> Router<AppState> {
    internal::router().layer(middleware::from_fn_with_state(
        state.clone(),
        internal::authentication_middleware,
    ))
}
