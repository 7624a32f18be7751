//! Knowledge area domain model.
//!
//! # Responsibility
//! - Define the self-referencing internal node of the content hierarchy.
//! - Enforce name length rules before a write reaches persistence.
//!
//! # Invariants
//! - `parent_id == None` marks a top-level area.
//! - An area must never reference itself as parent; that rule lives in the
//!   service layer because it needs the persisted id of the row under edit.
//!
//! # See also
//! - docs/architecture/data-model.md

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable identifier for a knowledge area row.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type AreaId = i64;

/// Minimum accepted area name length after trimming.
pub const AREA_NAME_MIN_CHARS: usize = 2;
/// Maximum accepted area name length after trimming.
pub const AREA_NAME_MAX_CHARS: usize = 40;

/// Validation failures for knowledge area fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AreaValidationError {
    /// Name is blank after trimming.
    BlankName,
    /// Trimmed name is shorter than `AREA_NAME_MIN_CHARS` or longer than
    /// `AREA_NAME_MAX_CHARS`.
    NameLengthOutOfRange { chars: usize },
}

impl Display for AreaValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "knowledge area name must not be blank"),
            Self::NameLengthOutOfRange { chars } => write!(
                f,
                "knowledge area name must be {AREA_NAME_MIN_CHARS}..={AREA_NAME_MAX_CHARS} characters, got {chars}"
            ),
        }
    }
}

impl Error for AreaValidationError {}

/// Knowledge area read model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Area {
    /// Stable surrogate key.
    pub id: AreaId,
    /// User-facing name, unique among siblings.
    pub name: String,
    /// Parent area. `None` means top-level.
    pub parent_id: Option<AreaId>,
}

/// Listing projection for area browse endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaSummary {
    pub id: AreaId,
    pub name: String,
}

/// Validates and normalizes a candidate area name.
///
/// Returns the trimmed name on success.
pub fn normalize_area_name(name: &str) -> Result<String, AreaValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AreaValidationError::BlankName);
    }
    let chars = trimmed.chars().count();
    if !(AREA_NAME_MIN_CHARS..=AREA_NAME_MAX_CHARS).contains(&chars) {
        return Err(AreaValidationError::NameLengthOutOfRange { chars });
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::{normalize_area_name, AreaValidationError, AREA_NAME_MAX_CHARS};

    #[test]
    fn normalize_trims_surrounding_whitespace() {
        assert_eq!(normalize_area_name("  Math  ").unwrap(), "Math");
    }

    #[test]
    fn normalize_rejects_blank_name() {
        assert_eq!(
            normalize_area_name("   ").unwrap_err(),
            AreaValidationError::BlankName
        );
    }

    #[test]
    fn normalize_rejects_single_char_name() {
        assert!(matches!(
            normalize_area_name("X").unwrap_err(),
            AreaValidationError::NameLengthOutOfRange { chars: 1 }
        ));
    }

    #[test]
    fn normalize_rejects_overlong_name() {
        let name = "x".repeat(AREA_NAME_MAX_CHARS + 1);
        assert!(matches!(
            normalize_area_name(&name).unwrap_err(),
            AreaValidationError::NameLengthOutOfRange { .. }
        ));
    }

    #[test]
    fn area_serializes_parent_id_as_camel_case() {
        let area = super::Area {
            id: 7,
            name: "Math".to_string(),
            parent_id: None,
        };
        let json = serde_json::to_value(&area).unwrap();
        assert!(json.get("parentId").is_some());
        assert!(json.get("parent_id").is_none());
    }
}
