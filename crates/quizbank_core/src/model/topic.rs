//! Topic domain model.
//!
//! # Responsibility
//! - Define the leaf node of the content hierarchy.
//!
//! # Invariants
//! - A topic belongs to exactly one knowledge area and never has children.

use crate::model::area::AreaId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable identifier for a topic row.
pub type TopicId = i64;

/// Validation failures for topic fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicValidationError {
    /// Name is blank after trimming.
    BlankName,
}

impl Display for TopicValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "topic name must not be blank"),
        }
    }
}

impl Error for TopicValidationError {}

/// Topic read model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    /// Stable surrogate key.
    pub id: TopicId,
    /// User-facing name, unique among siblings under the same area.
    pub name: String,
    /// Owning knowledge area.
    pub area_id: AreaId,
}

/// Validates and normalizes a candidate topic name.
///
/// Returns the trimmed name on success.
pub fn normalize_topic_name(name: &str) -> Result<String, TopicValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(TopicValidationError::BlankName);
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::{normalize_topic_name, TopicValidationError};

    #[test]
    fn normalize_trims_and_accepts_short_names() {
        assert_eq!(normalize_topic_name(" Sets ").unwrap(), "Sets");
    }

    #[test]
    fn normalize_rejects_blank_name() {
        assert_eq!(
            normalize_topic_name("\t").unwrap_err(),
            TopicValidationError::BlankName
        );
    }
}
