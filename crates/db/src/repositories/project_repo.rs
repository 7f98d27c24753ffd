//! Repository for the `projects` table.
//!
//! Every query is scoped by `owner_id`: a project that belongs to someone
//! else behaves exactly like one that does not exist.

use screenplan_core::listing::{like_pattern, SortState};
use screenplan_core::types::{DbId, OwnerId};
use sqlx::PgPool;

use crate::models::project::{CreateProject, Project, UpdateProject};

/// Columns selected into [`Project`].
const COLUMNS: &str = "id, owner_id, name, description, created_at, updated_at";

/// Queries on `projects`.
pub struct ProjectRepo;

impl ProjectRepo {
    /// Insert a new project owned by `owner_id`, returning the created row.
    pub async fn create(
        pool: &PgPool,
        owner_id: OwnerId,
        input: &CreateProject,
    ) -> Result<Project, sqlx::Error> {
        let query = format!(
            "INSERT INTO projects (owner_id, name, description)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(owner_id)
            .bind(&input.name)
            .bind(&input.description)
            .fetch_one(pool)
            .await
    }

    /// Find one of the owner's projects by ID.
    pub async fn find_for_owner(
        pool: &PgPool,
        id: DbId,
        owner_id: OwnerId,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects WHERE id = $1 AND owner_id = $2");
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(pool)
            .await
    }

    /// List the owner's projects.
    ///
    /// `search`, when present, is matched case-insensitively as a substring
    /// of the name or the description.
    pub async fn list_for_owner(
        pool: &PgPool,
        owner_id: OwnerId,
        search: Option<&str>,
        sort: &SortState,
    ) -> Result<Vec<Project>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM projects
             WHERE owner_id = $1
               AND ($2::TEXT IS NULL OR name ILIKE $2 OR description ILIKE $2)
             ORDER BY {}",
            sort.order_by_clause()
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(owner_id)
            .bind(search.map(like_pattern))
            .fetch_all(pool)
            .await
    }

    /// Update a project. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if the owner has no project with the given `id`.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        owner_id: OwnerId,
        input: &UpdateProject,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "UPDATE projects SET
                name = COALESCE($3, name),
                description = COALESCE($4, description)
             WHERE id = $1 AND owner_id = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(owner_id)
            .bind(&input.name)
            .bind(&input.description)
            .fetch_optional(pool)
            .await
    }

    /// Bump `updated_at` without changing any field.
    pub async fn touch(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE projects SET updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Permanently delete a project. Its screens go with it (`ON DELETE
    /// CASCADE`). Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId, owner_id: OwnerId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
