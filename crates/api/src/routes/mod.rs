pub mod health;
pub mod project;
pub mod screen;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree. Every route requires a Bearer token.
///
/// Route hierarchy:
///
/// ```text
/// /projects                                        list, create
/// /projects/{id}                                   get, update, delete
///
/// /projects/{id}/workflow                          workflow snapshot
/// /projects/{id}/workflow/navigate                 stepper move (POST)
/// /projects/{id}/workflow/finish                   finish (POST)
///
/// /projects/{id}/uploads                           list staged, stage (multipart)
/// /projects/{id}/uploads/commit                    store staged images (POST)
/// /projects/{id}/uploads/{staged_id}               remove staged image
/// /projects/{id}/uploads/{staged_id}/preview       staged image bytes
///
/// /projects/{id}/screens                           list screens
/// /projects/{id}/screens/documentation             batch documentation save (PUT)
///
/// /screens/{id}                                    get, update details, delete
/// /screens/{id}/documentation                      save documentation (PUT)
/// /screens/{id}/plan                               start generation (POST), read plan (GET)
/// /screens/{id}/suggest-name                       name suggestion (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/projects", project::router())
        .nest("/screens", screen::router())
}
