//! Repository for the `screens` table.
//!
//! Plan status changes go through dedicated methods whose `WHERE` clauses
//! encode the allowed transitions, so concurrent requests cannot move a
//! screen through an illegal path.

use screenplan_core::plan_status::PlanStatus;
use screenplan_core::types::{DbId, OwnerId};
use sqlx::PgPool;

use crate::models::screen::{CreateScreen, Screen};

/// Columns selected into [`Screen`].
const COLUMNS: &str = "id, project_id, image_path, storage_key, documentation, screen_name, \
    plan_status_id AS plan_status, implementation_plan, created_at, updated_at";

/// Queries on `screens`, including the plan status transitions.
pub struct ScreenRepo;

impl ScreenRepo {
    /// Insert a new screen with status `NOT_GENERATED`, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateScreen) -> Result<Screen, sqlx::Error> {
        let query = format!(
            "INSERT INTO screens (project_id, image_path, storage_key, plan_status_id)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Screen>(&query)
            .bind(input.project_id)
            .bind(&input.image_path)
            .bind(&input.storage_key)
            .bind(PlanStatus::NotGenerated.id())
            .fetch_one(pool)
            .await
    }

    /// Find a screen by ID, provided its project belongs to `owner_id`.
    pub async fn find_for_owner(
        pool: &PgPool,
        id: DbId,
        owner_id: OwnerId,
    ) -> Result<Option<Screen>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM screens
             WHERE id = $1
               AND project_id IN (SELECT id FROM projects WHERE owner_id = $2)"
        );
        sqlx::query_as::<_, Screen>(&query)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(pool)
            .await
    }

    /// List all screens of a project in upload order.
    pub async fn list_by_project(pool: &PgPool, project_id: DbId) -> Result<Vec<Screen>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM screens
             WHERE project_id = $1
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, Screen>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// Replace a screen's documentation.
    pub async fn update_documentation(
        pool: &PgPool,
        id: DbId,
        documentation: &str,
    ) -> Result<Option<Screen>, sqlx::Error> {
        let query = format!(
            "UPDATE screens SET documentation = $2
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Screen>(&query)
            .bind(id)
            .bind(documentation)
            .fetch_optional(pool)
            .await
    }

    /// Replace the documentation of several screens of one project in a
    /// single transaction.
    ///
    /// Returns the id of a screen that is no longer part of the project, in
    /// which case nothing is written. Any database error also leaves every
    /// screen unchanged.
    pub async fn update_documentation_batch(
        pool: &PgPool,
        project_id: DbId,
        documentation: &[(DbId, String)],
    ) -> Result<Option<DbId>, sqlx::Error> {
        let (ids, docs): (Vec<DbId>, Vec<String>) = documentation.iter().cloned().unzip();

        let mut tx = pool.begin().await?;
        let updated: Vec<DbId> = sqlx::query_scalar(
            "UPDATE screens SET documentation = v.doc
             FROM unnest($1::bigint[], $2::text[]) AS v(id, doc)
             WHERE screens.id = v.id AND screens.project_id = $3
             RETURNING screens.id",
        )
        .bind(&ids)
        .bind(&docs)
        .bind(project_id)
        .fetch_all(&mut *tx)
        .await?;

        if let Some(&missing) = ids.iter().find(|id| !updated.contains(*id)) {
            tx.rollback().await?;
            return Ok(Some(missing));
        }
        tx.commit().await?;
        Ok(None)
    }

    /// Replace a screen's display name and documentation together.
    pub async fn update_details(
        pool: &PgPool,
        id: DbId,
        screen_name: &str,
        documentation: &str,
    ) -> Result<Option<Screen>, sqlx::Error> {
        let query = format!(
            "UPDATE screens SET screen_name = $2, documentation = $3
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Screen>(&query)
            .bind(id)
            .bind(screen_name)
            .bind(documentation)
            .fetch_optional(pool)
            .await
    }

    /// Move a screen to `IN_PROGRESS`.
    ///
    /// Only succeeds when the screen is documented and not already in
    /// progress; returns `None` otherwise, which also covers losing a race
    /// against a concurrent request.
    pub async fn start_generation(pool: &PgPool, id: DbId) -> Result<Option<Screen>, sqlx::Error> {
        let query = format!(
            "UPDATE screens SET plan_status_id = $2
             WHERE id = $1
               AND plan_status_id <> $2
               AND documentation IS NOT NULL
               AND btrim(documentation) <> ''
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Screen>(&query)
            .bind(id)
            .bind(PlanStatus::InProgress.id())
            .fetch_optional(pool)
            .await
    }

    /// Store the generated plan and mark the screen `COMPLETED` in one write.
    ///
    /// Returns `None` if the screen is gone or no longer `IN_PROGRESS`.
    pub async fn complete_generation(
        pool: &PgPool,
        id: DbId,
        plan: &str,
    ) -> Result<Option<Screen>, sqlx::Error> {
        let query = format!(
            "UPDATE screens SET implementation_plan = $2, plan_status_id = $3
             WHERE id = $1 AND plan_status_id = $4
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Screen>(&query)
            .bind(id)
            .bind(plan)
            .bind(PlanStatus::Completed.id())
            .bind(PlanStatus::InProgress.id())
            .fetch_optional(pool)
            .await
    }

    /// Roll an in-progress screen back to `NOT_GENERATED` after a failed
    /// generation. Returns `true` if a row was changed.
    pub async fn fail_generation(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE screens SET plan_status_id = $2 WHERE id = $1 AND plan_status_id = $3",
        )
        .bind(id)
        .bind(PlanStatus::NotGenerated.id())
        .bind(PlanStatus::InProgress.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Reset every `IN_PROGRESS` screen to `NOT_GENERATED`.
    ///
    /// Run at startup: generation tasks do not survive a restart.
    pub async fn reset_stale_generations(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE screens SET plan_status_id = $1 WHERE plan_status_id = $2")
            .bind(PlanStatus::NotGenerated.id())
            .bind(PlanStatus::InProgress.id())
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Permanently delete a screen, returning the removed row so the caller
    /// can release its stored image.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<Option<Screen>, sqlx::Error> {
        let query = format!("DELETE FROM screens WHERE id = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, Screen>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
