//! Core domain logic for quizbank's learning-content hierarchy.
//! This crate is the single source of truth for business invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod tree;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::area::{Area, AreaId, AreaSummary, AreaValidationError};
pub use model::topic::{Topic, TopicId, TopicValidationError};
pub use model::ChildKind;
pub use repo::hierarchy_repo::{
    HierarchyChild, HierarchyRepoError, HierarchyRepoResult, HierarchyRepository,
    SqliteHierarchyRepository, TopicListQuery,
};
pub use service::hierarchy_service::{ExistingChild, HierarchyService, HierarchyServiceError};
pub use tree::cache::{ChildRecord, ChildSource, NodeId, TreeCache, TreeError};
pub use tree::select::{NodePredicate, TreeSelect, TreeSelectError};
pub use tree::source::HierarchySource;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
