//! Project listing: search and sort.
//!
//! Search is a case-insensitive substring match on the project name or
//! description. Sorting follows the dashboard's stepper-like behaviour:
//! picking the active field again flips the direction, picking a different
//! field starts from that field's natural direction.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Maximum length of a search string, in characters.
pub const MAX_SEARCH_LEN: usize = 200;

/// Column a project list can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Name,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
        }
    }

    /// Natural direction: alphabetical for names, newest first for dates.
    pub fn default_direction(self) -> SortDirection {
        match self {
            Self::Name => SortDirection::Asc,
            Self::CreatedAt | Self::UpdatedAt => SortDirection::Desc,
        }
    }

    /// Database column backing this field. Whitelisted, safe to interpolate.
    fn column(self) -> &'static str {
        match self {
            Self::Name => "LOWER(name)",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
        }
    }
}

impl FromStr for SortField {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(Self::Name),
            "created_at" => Ok(Self::CreatedAt),
            "updated_at" => Ok(Self::UpdatedAt),
            other => Err(CoreError::Validation(format!(
                "Invalid sort field '{other}'. Must be one of: name, created_at, updated_at"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl FromStr for SortDirection {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(CoreError::Validation(format!(
                "Invalid sort direction '{other}'. Must be asc or desc"
            ))),
        }
    }
}

/// Active sort of a project list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SortState {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for SortState {
    fn default() -> Self {
        Self::for_field(SortField::UpdatedAt)
    }
}

impl SortState {
    pub fn for_field(field: SortField) -> Self {
        Self {
            field,
            direction: field.default_direction(),
        }
    }

    /// Build from optional query parameters, filling in defaults.
    pub fn from_params(field: Option<SortField>, direction: Option<SortDirection>) -> Self {
        let field = field.unwrap_or(SortField::UpdatedAt);
        Self {
            field,
            direction: direction.unwrap_or_else(|| field.default_direction()),
        }
    }

    /// The sort after the user picks `field` in a list header: the active
    /// field flips direction, any other field starts at its default.
    ///
    /// The server only receives the result as `sort`/`direction`; this is
    /// the rule clients follow to produce them.
    pub fn click(self, field: SortField) -> Self {
        if field == self.field {
            Self {
                field,
                direction: self.direction.toggled(),
            }
        } else {
            Self::for_field(field)
        }
    }

    /// SQL `ORDER BY` body for the `projects` table. `id` breaks ties so
    /// pagination stays stable.
    pub fn order_by_clause(&self) -> String {
        let dir = self.direction.keyword();
        format!("{} {dir}, id {dir}", self.field.column())
    }
}

impl fmt::Display for SortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.field.as_str(), self.direction.keyword())
    }
}

/// Trim a search string, returning `None` when nothing is left.
pub fn normalize_search(raw: Option<&str>) -> Result<Option<String>, CoreError> {
    let Some(trimmed) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    if trimmed.chars().count() > MAX_SEARCH_LEN {
        return Err(CoreError::Validation(format!(
            "Search is too long (maximum {MAX_SEARCH_LEN} characters)"
        )));
    }
    Ok(Some(trimmed.to_string()))
}

/// Build an `ILIKE` pattern matching `search` anywhere in the value.
///
/// `%`, `_` and `\` are escaped so user input is matched literally; the
/// query must use the default `\` escape character.
pub fn like_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
