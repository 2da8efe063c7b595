use crate::openapi::HEALTH_TAG;
use crate::state::AppState;
use crate::store::StoreBackend;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use log::error;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct Health {
    status: &'static str,
}

pub(super) fn router() -> Router<AppState> {
    Router::new().route("/healthy", get(healthy))
}

/// Health check: verifies the backing store is reachable
#[utoipa::path(
    get,
    path = "/healthy",
    tag = HEALTH_TAG,
    responses(
        (status = 200, description = "Service is healthy", body = Health),
        (status = 503, description = "Store unavailable", body = Health)
    )
)]
pub(crate) async fn healthy(State(state): State<AppState>) -> Response {
    match state.store.health_check().await {
        Ok(()) => (StatusCode::OK, axum::Json(Health { status: "ok" })).into_response(),
        Err(err) => {
            error!("Store health check failed: {}", err);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                axum::Json(Health { status: "error" }),
            )
                .into_response()
        }
    }
}
