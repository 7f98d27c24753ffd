//! Route definitions for the `/projects` resource.
//!
//! Also nests the workflow, upload staging and screen-list routes under
//! `/projects/{id}/...`.

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::handlers::{project, screen, upload, workflow};
use crate::state::AppState;

/// Routes mounted at `/projects`.
///
/// ```text
/// GET    /                                   -> list
/// POST   /                                   -> create
/// GET    /{id}                               -> get_by_id
/// PUT    /{id}                               -> update
/// DELETE /{id}                               -> delete
///
/// GET    /{id}/workflow                      -> workflow::snapshot
/// POST   /{id}/workflow/navigate             -> workflow::navigate
/// POST   /{id}/workflow/finish               -> workflow::finish
///
/// GET    /{id}/uploads                       -> upload::list
/// POST   /{id}/uploads                       -> upload::stage
/// POST   /{id}/uploads/commit                -> upload::commit
/// DELETE /{id}/uploads/{staged_id}           -> upload::remove
/// GET    /{id}/uploads/{staged_id}/preview   -> upload::preview
///
/// GET    /{id}/screens                       -> screen::list_by_project
/// PUT    /{id}/screens/documentation         -> screen::save_documentation_batch
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(project::list).post(project::create))
        .route(
            "/{id}",
            get(project::get_by_id)
                .put(project::update)
                .delete(project::delete),
        )
        .route("/{id}/workflow", get(workflow::snapshot))
        .route("/{id}/workflow/navigate", post(workflow::navigate))
        .route("/{id}/workflow/finish", post(workflow::finish))
        .route("/{id}/uploads", get(upload::list).post(upload::stage))
        .route("/{id}/uploads/commit", post(upload::commit))
        .route("/{id}/uploads/{staged_id}", delete(upload::remove))
        .route("/{id}/uploads/{staged_id}/preview", get(upload::preview))
        .route("/{id}/screens", get(screen::list_by_project))
        .route(
            "/{id}/screens/documentation",
            put(screen::save_documentation_batch),
        )
}
