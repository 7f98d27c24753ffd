//! `{ "data": ... }` envelope for list and summary endpoints.
//!
//! Single entities (a project, a screen) are returned bare.

use serde::Serialize;

/// Wraps upload listings, workflow snapshots, batch results and the like.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
