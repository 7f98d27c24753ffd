//! Handlers for screens: documentation, details, plan generation.

use std::collections::HashSet;

use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use screenplan_core::error::CoreError;
use screenplan_core::plan::suggest_screen_name;
use screenplan_core::plan_status::{ensure_generation_allowed, validate_transition, PlanStatus};
use screenplan_core::types::{DbId, OwnerId};
use screenplan_core::validation::{has_text, require_non_blank};
use screenplan_db::models::screen::{
    BatchDocumentation, Screen, UpdateScreenDetails, UpdateScreenDocumentation,
};
use screenplan_db::repositories::ScreenRepo;
use serde::Serialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::handlers::project::find_owned_project;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Load a screen whose project belongs to the caller.
async fn find_owned_screen(state: &AppState, id: DbId, owner_id: OwnerId) -> AppResult<Screen> {
    ScreenRepo::find_for_owner(&state.pool, id, owner_id)
        .await?
        .ok_or(AppError::Core(CoreError::not_found("Screen", id)))
}

fn screen_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::not_found("Screen", id))
}

/// GET /api/v1/projects/{id}/screens
pub async fn list_by_project(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
) -> AppResult<Json<Vec<Screen>>> {
    find_owned_project(&state, project_id, auth.owner_id).await?;
    let screens = ScreenRepo::list_by_project(&state.pool, project_id).await?;
    Ok(Json(screens))
}

/// GET /api/v1/screens/{id}
pub async fn get_by_id(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<Screen>> {
    let screen = find_owned_screen(&state, id, auth.owner_id).await?;
    Ok(Json(screen))
}

/// PUT /api/v1/screens/{id}
///
/// Edit dialog save: name and documentation are both required.
pub async fn update_details(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateScreenDetails>,
) -> AppResult<Json<Screen>> {
    let input = UpdateScreenDetails {
        screen_name: input.screen_name.trim().to_string(),
        documentation: input.documentation.trim().to_string(),
    };
    require_non_blank(&input.screen_name, "Screen name is required")?;
    require_non_blank(&input.documentation, "Documentation is required")?;
    input.validate()?;

    find_owned_screen(&state, id, auth.owner_id).await?;
    let screen =
        ScreenRepo::update_details(&state.pool, id, &input.screen_name, &input.documentation)
            .await?
            .ok_or_else(|| screen_not_found(id))?;
    Ok(Json(screen))
}

/// PUT /api/v1/screens/{id}/documentation
pub async fn save_documentation(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateScreenDocumentation>,
) -> AppResult<Json<Screen>> {
    let input = UpdateScreenDocumentation {
        documentation: input.documentation.trim().to_string(),
    };
    input.validate()?;

    find_owned_screen(&state, id, auth.owner_id).await?;
    let screen = ScreenRepo::update_documentation(&state.pool, id, &input.documentation)
        .await?
        .ok_or_else(|| screen_not_found(id))?;
    Ok(Json(screen))
}

/// PUT /api/v1/projects/{id}/screens/documentation
///
/// Saves documentation for several screens of a project. Nothing is written
/// unless every screen of the project ends up documented, and the batch is
/// stored all-or-nothing.
pub async fn save_documentation_batch(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
    Json(input): Json<BatchDocumentation>,
) -> AppResult<Json<DataResponse<Vec<Screen>>>> {
    find_owned_project(&state, project_id, auth.owner_id).await?;
    let screens = ScreenRepo::list_by_project(&state.pool, project_id).await?;

    let known: HashSet<DbId> = screens.iter().map(|s| s.id).collect();
    if let Some(&foreign) = input.documentation.keys().find(|id| !known.contains(*id)) {
        return Err(screen_not_found(foreign));
    }

    let mut entries = Vec::with_capacity(input.documentation.len());
    for (&id, documentation) in &input.documentation {
        let entry = UpdateScreenDocumentation {
            documentation: documentation.trim().to_string(),
        };
        entry.validate()?;
        entries.push((id, entry.documentation));
    }
    for screen in &screens {
        let documentation = entries
            .iter()
            .find(|(id, _)| *id == screen.id)
            .map(|(_, doc)| doc.as_str())
            .or(screen.documentation.as_deref());
        if !has_text(documentation) {
            return Err(AppError::Core(CoreError::Validation(
                "Please add documentation for all screens".into(),
            )));
        }
    }

    // A screen deleted since the listing above aborts the whole batch.
    if let Some(missing) =
        ScreenRepo::update_documentation_batch(&state.pool, project_id, &entries).await?
    {
        return Err(screen_not_found(missing));
    }

    tracing::info!(project_id, saved = entries.len(), "Saved documentation batch");
    let screens = ScreenRepo::list_by_project(&state.pool, project_id).await?;
    Ok(Json(DataResponse { data: screens }))
}

/// DELETE /api/v1/screens/{id}
pub async fn delete(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    find_owned_screen(&state, id, auth.owner_id).await?;
    let screen = ScreenRepo::delete(&state.pool, id)
        .await?
        .ok_or_else(|| screen_not_found(id))?;

    if let Err(e) = state.storage.delete(&screen.storage_key).await {
        tracing::warn!(screen_id = id, key = %screen.storage_key, error = %e, "Failed to remove screen image");
    }
    tracing::info!(screen_id = id, project_id = screen.project_id, "Screen deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/screens/{id}/plan
///
/// Moves the screen to `IN_PROGRESS` and starts generation in the
/// background. Poll the screen for the outcome.
pub async fn generate_plan(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<(StatusCode, Json<Screen>)> {
    let screen = find_owned_screen(&state, id, auth.owner_id).await?;
    ensure_generation_allowed(screen.plan_status, screen.documentation.as_deref())?;
    validate_transition(screen.plan_status, PlanStatus::InProgress)?;

    // A concurrent request may have started generation since the read.
    let screen = ScreenRepo::start_generation(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::Conflict(
            "Plan generation is already in progress for this screen".into(),
        )))?;

    state.plan_runner.spawn(&screen);
    Ok((StatusCode::ACCEPTED, Json(screen)))
}

/// GET /api/v1/screens/{id}/plan
///
/// Returns the stored plan as `text/markdown`.
pub async fn get_plan(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let screen = find_owned_screen(&state, id, auth.owner_id).await?;
    let plan = screen
        .implementation_plan
        .ok_or(AppError::Core(CoreError::not_found("ImplementationPlan", id)))?;
    Ok(([(CONTENT_TYPE, "text/markdown; charset=utf-8")], plan))
}

/// Response body of the name suggestion endpoint.
#[derive(Debug, Serialize)]
pub struct NameSuggestion {
    pub screen_name: String,
}

/// POST /api/v1/screens/{id}/suggest-name
///
/// Suggests a name from the stored documentation. Nothing is saved.
pub async fn suggest_name(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<NameSuggestion>>> {
    let screen = find_owned_screen(&state, id, auth.owner_id).await?;
    let documentation = screen
        .documentation
        .as_deref()
        .filter(|d| has_text(Some(d)))
        .ok_or(AppError::Core(CoreError::Validation(
            "Add documentation before suggesting a name".into(),
        )))?;

    Ok(Json(DataResponse {
        data: NameSuggestion {
            screen_name: suggest_screen_name(documentation),
        },
    }))
}
