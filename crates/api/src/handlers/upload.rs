//! Handlers for the upload step: stage images, preview, drop, commit.
//!
//! Staging keeps images in memory so the user can review them; commit
//! stores every staged image and creates one screen per stored image.

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use futures::future::join_all;
use screenplan_core::error::CoreError;
use screenplan_core::types::DbId;
use screenplan_core::upload::{ensure_any_accepted, inspect_image, storage_key};
use screenplan_db::models::screen::{CreateScreen, Screen};
use screenplan_db::repositories::{ProjectRepo, ScreenRepo};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::handlers::project::find_owned_project;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::staging::{StagedImage, StagedImageInfo, MAX_STAGED_PER_PROJECT};
use crate::state::AppState;

/// A file from an upload that was not staged or not stored.
#[derive(Debug, Serialize)]
pub struct RejectedFile {
    pub file_name: String,
    pub reason: String,
}

/// Response of the stage endpoint.
#[derive(Debug, Serialize)]
pub struct StageResult {
    /// Everything now staged for the project, including earlier uploads.
    pub staged: Vec<StagedImageInfo>,
    /// Files from this request that were skipped.
    pub rejected: Vec<RejectedFile>,
}

/// Response of the commit endpoint.
#[derive(Debug, Serialize)]
pub struct CommitResult {
    /// Screens created from stored images.
    pub created: Vec<Screen>,
    /// Images that could not be stored. They stay staged for a retry.
    pub failed: Vec<RejectedFile>,
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::BadRequest(e.body_text())
    }
}

fn staged_not_found(staged_id: &str) -> AppError {
    AppError::NotFound(format!("Staged upload {staged_id} not found"))
}

/// GET /api/v1/projects/{id}/uploads
pub async fn list(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<StagedImageInfo>>>> {
    find_owned_project(&state, project_id, auth.owner_id).await?;
    let staged = state.staging.list(auth.owner_id, project_id).await;
    Ok(Json(DataResponse { data: staged }))
}

/// POST /api/v1/projects/{id}/uploads
///
/// Accepts a multipart form with one or more file fields. Files that are not
/// accepted images are skipped and reported; a request without any image is
/// rejected.
pub async fn stage(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<StageResult>)> {
    find_owned_project(&state, project_id, auth.owner_id).await?;

    let mut accepted = Vec::new();
    let mut rejected = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        // Plain form fields carry no file.
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let declared = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;

        match inspect_image(
            &file_name,
            declared.as_deref(),
            &bytes,
            state.config.max_upload_bytes,
        ) {
            Ok(image) => accepted.push(StagedImage::new(
                file_name,
                image.content_type,
                image.extension,
                bytes,
            )),
            Err(reason) => {
                tracing::debug!(project_id, file_name = %file_name, %reason, "Skipped upload");
                rejected.push(RejectedFile {
                    file_name,
                    reason: reason.to_string(),
                });
            }
        }
    }

    ensure_any_accepted(accepted.len())?;

    let overflow = state
        .staging
        .stage(auth.owner_id, project_id, accepted)
        .await;
    rejected.extend(overflow.into_iter().map(|image| RejectedFile {
        file_name: image.file_name,
        reason: format!("At most {MAX_STAGED_PER_PROJECT} images can be staged at once"),
    }));

    let staged = state.staging.list(auth.owner_id, project_id).await;
    tracing::info!(
        project_id,
        staged = staged.len(),
        rejected = rejected.len(),
        "Staged screen images"
    );
    Ok((StatusCode::CREATED, Json(StageResult { staged, rejected })))
}

/// GET /api/v1/projects/{id}/uploads/{staged_id}/preview
pub async fn preview(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((project_id, staged_id)): Path<(DbId, String)>,
) -> AppResult<impl IntoResponse> {
    find_owned_project(&state, project_id, auth.owner_id).await?;
    let (content_type, bytes) = state
        .staging
        .preview(auth.owner_id, project_id, &staged_id)
        .await
        .ok_or_else(|| staged_not_found(&staged_id))?;
    Ok(([(CONTENT_TYPE, content_type)], bytes))
}

/// DELETE /api/v1/projects/{id}/uploads/{staged_id}
pub async fn remove(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((project_id, staged_id)): Path<(DbId, String)>,
) -> AppResult<StatusCode> {
    find_owned_project(&state, project_id, auth.owner_id).await?;
    if state
        .staging
        .remove(auth.owner_id, project_id, &staged_id)
        .await
    {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(staged_not_found(&staged_id))
    }
}

/// POST /api/v1/projects/{id}/uploads/commit
///
/// Stores every staged image concurrently and creates a screen for each.
/// A failure on one image does not affect the others.
pub async fn commit(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
) -> AppResult<(StatusCode, Json<CommitResult>)> {
    find_owned_project(&state, project_id, auth.owner_id).await?;

    let staged = state.staging.take_all(auth.owner_id, project_id).await;
    if staged.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Please upload at least one screen image".into(),
        )));
    }

    let results = join_all(
        staged
            .into_iter()
            .map(|image| store_image(&state, project_id, image)),
    )
    .await;

    let mut created = Vec::new();
    let mut failed = Vec::new();
    let mut retry = Vec::new();
    for result in results {
        match result {
            Ok(screen) => created.push(screen),
            Err((image, e)) => {
                tracing::error!(project_id, file_name = %image.file_name, error = %e, "Failed to store screen image");
                failed.push(RejectedFile {
                    file_name: image.file_name.clone(),
                    reason: format!("Failed to upload {}", image.file_name),
                });
                retry.push(image);
            }
        }
    }
    state
        .staging
        .restore(auth.owner_id, project_id, retry)
        .await;

    if created.is_empty() {
        return Err(AppError::InternalError(format!(
            "No screen image could be stored ({} failed)",
            failed.len()
        )));
    }

    ProjectRepo::touch(&state.pool, project_id).await?;
    tracing::info!(
        project_id,
        created = created.len(),
        failed = failed.len(),
        "Committed screen images"
    );
    Ok((StatusCode::CREATED, Json(CommitResult { created, failed })))
}

/// Store one staged image and create its screen. On failure the image is
/// handed back together with the error.
async fn store_image(
    state: &AppState,
    project_id: DbId,
    image: StagedImage,
) -> Result<Screen, (StagedImage, AppError)> {
    let key = storage_key(project_id, image.extension);
    if let Err(e) = state
        .storage
        .put(&key, image.bytes.clone(), image.content_type)
        .await
    {
        return Err((image, e.into()));
    }

    let input = CreateScreen {
        project_id,
        image_path: state.storage.public_url(&key),
        storage_key: key.clone(),
    };
    match ScreenRepo::create(&state.pool, &input).await {
        Ok(screen) => Ok(screen),
        Err(e) => {
            if let Err(cleanup) = state.storage.delete(&key).await {
                tracing::warn!(key = %key, error = %cleanup, "Failed to remove orphaned image");
            }
            Err((image, e.into()))
        }
    }
}
