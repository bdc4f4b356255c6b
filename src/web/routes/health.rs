use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use serde::Serialize;

use crate::web::AppState;

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
}

impl HealthResponse {
    fn new(status: &str, database: &str) -> Self {
        Self {
            status: status.to_string(),
            database: database.to_string(),
        }
    }
}

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/health",
    description = "Liveness probe that also pings the database",
    responses(
        (status = 200, description = "Database reachable", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse),
    ),
    tag = "health"
)]
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    if state.pool().is_healthy().await {
        (StatusCode::OK, Json(HealthResponse::new("ok", "connected")))
    } else {
        tracing::warn!("health check failed: database unreachable");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse::new("degraded", "disconnected")),
        )
    }
}
