//! Screen entity model and DTOs.

use std::collections::HashMap;

use screenplan_core::plan_status::PlanStatus;
use screenplan_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `screens` table.
///
/// `plan_status` is read from the `plan_status_id` SMALLINT column and
/// serialized by name.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Screen {
    pub id: DbId,
    pub project_id: DbId,
    /// Public URL of the stored image.
    pub image_path: String,
    /// Storage backend key; internal.
    #[serde(skip)]
    pub storage_key: String,
    pub documentation: Option<String>,
    pub screen_name: Option<String>,
    #[sqlx(try_from = "i16")]
    pub plan_status: PlanStatus,
    pub implementation_plan: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Insert data for a screen whose image has just been stored.
#[derive(Debug, Clone)]
pub struct CreateScreen {
    pub project_id: DbId,
    pub image_path: String,
    pub storage_key: String,
}

/// DTO for saving one screen's documentation.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateScreenDocumentation {
    #[validate(length(max = 20000))]
    pub documentation: String,
}

/// DTO for the edit dialog: both fields are required.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateScreenDetails {
    #[validate(length(max = 200))]
    pub screen_name: String,
    #[validate(length(max = 20000))]
    pub documentation: String,
}

/// DTO for saving documentation of several screens at once, keyed by
/// screen id.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchDocumentation {
    pub documentation: HashMap<DbId, String>,
}
