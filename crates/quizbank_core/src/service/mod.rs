//! Core use-case services.
//!
//! # Responsibility
//! - Enforce the hierarchy invariants the database cannot express.
//! - Translate store-level failures into precise user-facing errors.
//!
//! # See also
//! - docs/architecture/data-model.md

pub mod hierarchy_service;
