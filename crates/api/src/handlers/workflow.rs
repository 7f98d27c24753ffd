//! Handlers for a project's three-step workflow (upload, document, plan).

use axum::extract::{Path, State};
use axum::Json;
use screenplan_core::types::{DbId, OwnerId};
use screenplan_core::upload::display_name_from_path;
use screenplan_core::workflow::{
    ensure_can_finish, navigate as resolve_step, Navigation, ScreenProgress, WorkflowSnapshot,
    WorkflowStep,
};
use screenplan_db::repositories::{ProjectRepo, ScreenRepo};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::handlers::project::find_owned_project;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for a stepper move.
#[derive(Debug, Deserialize)]
pub struct NavigateRequest {
    pub from: WorkflowStep,
    pub direction: Navigation,
}

/// Outcome of a permitted stepper move.
#[derive(Debug, Serialize)]
pub struct NavigateResult {
    pub step: WorkflowStep,
    pub workflow: WorkflowSnapshot,
}

async fn load_snapshot(
    state: &AppState,
    project_id: DbId,
    owner_id: OwnerId,
) -> AppResult<WorkflowSnapshot> {
    find_owned_project(state, project_id, owner_id).await?;
    let screens = ScreenRepo::list_by_project(&state.pool, project_id).await?;

    let progress = screens
        .into_iter()
        .enumerate()
        .map(|(index, screen)| {
            ScreenProgress::new(
                screen.id,
                screen.screen_name,
                display_name_from_path(&screen.image_path, index),
                screen.documentation.as_deref(),
                screen.plan_status,
            )
        })
        .collect();
    Ok(WorkflowSnapshot::from_screens(progress))
}

/// GET /api/v1/projects/{id}/workflow
pub async fn snapshot(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
) -> AppResult<Json<DataResponse<WorkflowSnapshot>>> {
    let snapshot = load_snapshot(&state, project_id, auth.owner_id).await?;
    Ok(Json(DataResponse { data: snapshot }))
}

/// POST /api/v1/projects/{id}/workflow/navigate
///
/// Moving back is always allowed; moving forward requires the current step
/// to be satisfied.
pub async fn navigate(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
    Json(input): Json<NavigateRequest>,
) -> AppResult<Json<DataResponse<NavigateResult>>> {
    let workflow = load_snapshot(&state, project_id, auth.owner_id).await?;
    let step = resolve_step(input.from, input.direction, &workflow)?;
    Ok(Json(DataResponse {
        data: NavigateResult { step, workflow },
    }))
}

/// POST /api/v1/projects/{id}/workflow/finish
pub async fn finish(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
) -> AppResult<Json<DataResponse<WorkflowSnapshot>>> {
    let snapshot = load_snapshot(&state, project_id, auth.owner_id).await?;
    ensure_can_finish(&snapshot)?;

    ProjectRepo::touch(&state.pool, project_id).await?;
    tracing::info!(
        project_id,
        screens = snapshot.screen_count,
        "Project workflow finished"
    );
    Ok(Json(DataResponse { data: snapshot }))
}
