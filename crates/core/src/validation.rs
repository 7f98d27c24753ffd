//! Text field checks shared by project and screen DTOs.
//!
//! Length limits live on the DTOs (`validator` derive); these helpers cover
//! what a length check cannot: whitespace-only input.

use crate::error::CoreError;

/// Returns `true` when `value` contains something other than whitespace.
pub fn has_text(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

/// Require a value that is not blank.
///
/// `message` is returned verbatim so handlers surface the same wording the
/// client shows next to the field.
pub fn require_non_blank(value: &str, message: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::Validation(message.to_string()));
    }
    Ok(())
}

/// Normalize an optional free-text field: trims it and maps blank to `None`.
pub fn normalize_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
