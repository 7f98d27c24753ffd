//! Liveness endpoint, mounted outside `/api/v1` and without auth.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok` when every dependency answers, `degraded` otherwise.
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
    pub storage_healthy: bool,
    /// Plan generations still running in the background.
    pub plans_in_flight: usize,
}

/// GET /health
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let (db, storage) = tokio::join!(
        screenplan_db::health_check(&state.pool),
        state.storage.health_check(),
    );
    if let Err(e) = &storage {
        tracing::warn!(error = %e, "Image storage health check failed");
    }

    let db_healthy = db.is_ok();
    let storage_healthy = storage.is_ok();
    Json(HealthResponse {
        status: if db_healthy && storage_healthy { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        storage_healthy,
        plans_in_flight: state.plan_runner.in_flight(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
