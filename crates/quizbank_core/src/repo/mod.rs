//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the hierarchy store contract consumed by the service layer.
//! - Isolate SQLite query details from business orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`, `UniqueViolation`,
//!   `RestrictViolation`) in addition to DB transport errors.
//! - Any storage engine implementing `HierarchyRepository` is substitutable.

pub mod hierarchy_repo;
