//! Typed query-string parameters shared by list handlers.

use screenplan_core::listing::{SortDirection, SortField};
use serde::Deserialize;

/// Query parameters for `GET /projects`.
///
/// `sort` and `direction` use the wire names of [`SortField`] and
/// [`SortDirection`] (`name`, `created_at`, `updated_at`; `asc`, `desc`).
#[derive(Debug, Default, Deserialize)]
pub struct ProjectListParams {
    pub search: Option<String>,
    pub sort: Option<SortField>,
    pub direction: Option<SortDirection>,
}
