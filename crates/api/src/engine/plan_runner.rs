//! Background plan generation.
//!
//! The request handler moves a screen to `IN_PROGRESS` and hands it to
//! [`PlanRunner::spawn`]. The spawned task runs the generator, then stores
//! the plan and marks the screen `COMPLETED` in one write. Any failure rolls
//! the screen back to `NOT_GENERATED` so the user can retry.

use std::sync::Arc;
use std::time::Duration;

use screenplan_core::error::CoreError;
use screenplan_core::plan::{PlanGenerator, PlanRequest};
use screenplan_core::plan_status::ensure_plan_present;
use screenplan_core::types::DbId;
use screenplan_db::models::screen::Screen;
use screenplan_db::repositories::ScreenRepo;
use sqlx::PgPool;
use tokio_util::task::TaskTracker;

/// Runs plan generations as tracked Tokio tasks.
pub struct PlanRunner {
    pool: PgPool,
    generator: Arc<dyn PlanGenerator>,
    tracker: TaskTracker,
}

impl PlanRunner {
    pub fn new(pool: PgPool, generator: Arc<dyn PlanGenerator>) -> Self {
        Self {
            pool,
            generator,
            tracker: TaskTracker::new(),
        }
    }

    /// Start generating a plan for `screen`, which must already be
    /// `IN_PROGRESS`.
    pub fn spawn(&self, screen: &Screen) {
        let request = PlanRequest {
            screen_name: screen.screen_name.clone(),
            documentation: screen.documentation.clone().unwrap_or_default(),
        };
        let pool = self.pool.clone();
        let generator = Arc::clone(&self.generator);
        let screen_id = screen.id;

        tracing::info!(screen_id, project_id = screen.project_id, "Plan generation started");
        self.tracker
            .spawn(async move { run(&pool, generator.as_ref(), screen_id, &request).await });
    }

    /// Number of generations still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Stop accepting work and wait up to `timeout` for running generations.
    ///
    /// Generations still running after the timeout are abandoned; their
    /// screens are reset at the next startup.
    pub async fn shutdown(&self, timeout: Duration) {
        self.tracker.close();
        let in_flight = self.tracker.len();
        if in_flight > 0 {
            tracing::info!(in_flight, "Waiting for plan generations to finish");
        }
        if tokio::time::timeout(timeout, self.tracker.wait()).await.is_err() {
            tracing::warn!(
                in_flight = self.tracker.len(),
                "Plan generations still running at shutdown"
            );
        }
    }
}

/// Generate and store one plan, rolling back on failure.
async fn run(pool: &PgPool, generator: &dyn PlanGenerator, screen_id: DbId, request: &PlanRequest) {
    let outcome = match generator.generate_plan(request).await {
        Ok(plan) => match ensure_plan_present(&plan) {
            Ok(()) => store(pool, screen_id, &plan).await,
            Err(e) => Err(e),
        },
        Err(e) => Err(e),
    };

    if let Err(e) = outcome {
        tracing::error!(screen_id, error = %e, "Plan generation failed");
        match ScreenRepo::fail_generation(pool, screen_id).await {
            Ok(true) => tracing::info!(screen_id, "Plan status rolled back"),
            Ok(false) => {}
            Err(e) => tracing::error!(screen_id, error = %e, "Failed to roll back plan status"),
        }
    }
}

async fn store(pool: &PgPool, screen_id: DbId, plan: &str) -> Result<(), CoreError> {
    match ScreenRepo::complete_generation(pool, screen_id, plan).await {
        Ok(Some(_)) => {
            tracing::info!(screen_id, plan_len = plan.len(), "Plan generation completed");
            Ok(())
        }
        Ok(None) => {
            tracing::warn!(screen_id, "Screen deleted or no longer in progress, plan discarded");
            Ok(())
        }
        Err(e) => Err(CoreError::Internal(format!("Failed to store plan: {e}"))),
    }
}
