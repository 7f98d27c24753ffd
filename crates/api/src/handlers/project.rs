//! Handlers for the `/projects` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use screenplan_core::error::CoreError;
use screenplan_core::listing::{normalize_search, SortState};
use screenplan_core::types::{DbId, OwnerId};
use screenplan_core::validation::{normalize_optional, require_non_blank};
use screenplan_db::models::project::{CreateProject, Project, UpdateProject};
use screenplan_db::repositories::ProjectRepo;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::ProjectListParams;
use crate::state::AppState;

/// Load one of the caller's projects, reporting foreign projects as missing.
pub(crate) async fn find_owned_project(
    state: &AppState,
    id: DbId,
    owner_id: OwnerId,
) -> AppResult<Project> {
    ProjectRepo::find_for_owner(&state.pool, id, owner_id)
        .await?
        .ok_or(AppError::Core(CoreError::not_found("Project", id)))
}

/// POST /api/v1/projects
pub async fn create(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateProject>,
) -> AppResult<(StatusCode, Json<Project>)> {
    let input = CreateProject {
        name: input.name.trim().to_string(),
        description: normalize_optional(input.description.as_deref()),
    };
    require_non_blank(&input.name, "Project name is required")?;
    input.validate()?;

    let project = ProjectRepo::create(&state.pool, auth.owner_id, &input).await?;
    tracing::info!(project_id = project.id, owner_id = %auth.owner_id, "Project created");
    Ok((StatusCode::CREATED, Json(project)))
}

/// GET /api/v1/projects?search=&sort=&direction=
///
/// Lists the caller's projects, newest update first unless a sort is given.
pub async fn list(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ProjectListParams>,
) -> AppResult<Json<Vec<Project>>> {
    let search = normalize_search(params.search.as_deref())?;
    let sort = SortState::from_params(params.sort, params.direction);

    let projects =
        ProjectRepo::list_for_owner(&state.pool, auth.owner_id, search.as_deref(), &sort).await?;
    tracing::debug!(%sort, search = ?search, count = projects.len(), "Listed projects");
    Ok(Json(projects))
}

/// GET /api/v1/projects/{id}
pub async fn get_by_id(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<Project>> {
    let project = find_owned_project(&state, id, auth.owner_id).await?;
    Ok(Json(project))
}

/// PUT /api/v1/projects/{id}
///
/// A blank description leaves the stored one unchanged.
pub async fn update(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateProject>,
) -> AppResult<Json<Project>> {
    let input = UpdateProject {
        name: input.name.map(|n| n.trim().to_string()),
        description: normalize_optional(input.description.as_deref()),
    };
    if let Some(name) = &input.name {
        require_non_blank(name, "Project name is required")?;
    }
    input.validate()?;

    let project = ProjectRepo::update(&state.pool, id, auth.owner_id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::not_found("Project", id)))?;
    Ok(Json(project))
}

/// DELETE /api/v1/projects/{id}
///
/// Removes the project, its screens, their stored images and anything still
/// staged for it.
pub async fn delete(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let deleted = ProjectRepo::delete(&state.pool, id, auth.owner_id).await?;
    if !deleted {
        return Err(AppError::Core(CoreError::not_found("Project", id)));
    }

    state.staging.take_all(auth.owner_id, id).await;
    // The rows are gone; a leftover folder only wastes disk.
    if let Err(e) = state.storage.delete_prefix(&id.to_string()).await {
        tracing::warn!(project_id = id, error = %e, "Failed to remove project images");
    }

    tracing::info!(project_id = id, owner_id = %auth.owner_id, "Project deleted");
    Ok(StatusCode::NO_CONTENT)
}
