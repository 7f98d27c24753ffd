//! Route definitions for the `/screens` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::screen;
use crate::state::AppState;

/// Routes mounted at `/screens`.
///
/// ```text
/// GET    /{id}                 -> get_by_id
/// PUT    /{id}                 -> update_details
/// DELETE /{id}                 -> delete
/// PUT    /{id}/documentation   -> save_documentation
/// POST   /{id}/plan            -> generate_plan
/// GET    /{id}/plan            -> get_plan
/// POST   /{id}/suggest-name    -> suggest_name
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{id}",
            get(screen::get_by_id)
                .put(screen::update_details)
                .delete(screen::delete),
        )
        .route("/{id}/documentation", put(screen::save_documentation))
        .route(
            "/{id}/plan",
            post(screen::generate_plan).get(screen::get_plan),
        )
        .route("/{id}/suggest-name", post(screen::suggest_name))
}
