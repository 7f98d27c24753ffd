use crate::types::DbId;

/// Domain errors shared by the repositories, the plan runner and the HTTP
/// layer. The api crate maps each variant to a status code.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A project or screen does not exist or belongs to another owner.
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    /// User input the caller can fix (blank name, missing documentation).
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The request is valid but the current state forbids it, e.g. starting
    /// a plan while one is being generated.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn not_found(entity: &'static str, id: DbId) -> Self {
        Self::NotFound { entity, id }
    }
}
