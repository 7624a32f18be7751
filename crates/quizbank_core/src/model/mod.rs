//! Domain model for the learning-content hierarchy.
//!
//! # Responsibility
//! - Define the canonical records for knowledge areas and topics.
//! - Keep name validation rules next to the data they protect.
//!
//! # Invariants
//! - A knowledge area may nest arbitrarily deep; a topic is always a leaf.
//! - Every record is identified by a stable integer surrogate key.
//!
//! # See also
//! - docs/architecture/data-model.md

pub mod area;
pub mod topic;

use serde::{Deserialize, Serialize};

/// Kind tag for a child of a knowledge area.
///
/// The cross-table sibling-name uniqueness check dispatches over this
/// sum type instead of duplicating per-entity logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChildKind {
    /// Nested knowledge area.
    Area,
    /// Leaf topic.
    Topic,
}
