use std::sync::Arc;

use crate::config::ServerConfig;
use crate::engine::plan_runner::PlanRunner;
use crate::staging::UploadStaging;
use crate::storage::ImageStorage;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: screenplan_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Backend holding committed screen images.
    pub storage: Arc<dyn ImageStorage>,
    /// Images uploaded but not yet committed.
    pub staging: Arc<UploadStaging>,
    /// Runs plan generations in the background.
    pub plan_runner: Arc<PlanRunner>,
}
