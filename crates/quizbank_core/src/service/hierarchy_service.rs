//! Hierarchy consistency service.
//!
//! # Responsibility
//! - Guard the invariants the two-table split leaves unreachable to the
//!   database: cross-table sibling names, self-parenting, ancestry cycles.
//! - Translate repository constraint failures into structured validation
//!   errors that name the offending field and value.
//!
//! # Invariants
//! - Every mutating operation re-runs the checks against the *new* parent.
//! - Name conflicts always report which existing child collided and its kind.
//! - Deletion is restrict-on-delete; childless deletes always succeed.
//!
//! The cross-table name probe runs before the write, so a concurrent writer
//! can in principle slip a conflicting sibling of the *other* kind in
//! between. The per-table unique index still catches same-table races; the
//! cross-table race window is accepted and documented in the data-model
//! notes rather than defended against.

use crate::model::area::{normalize_area_name, Area, AreaId, AreaSummary, AreaValidationError};
use crate::model::topic::{normalize_topic_name, Topic, TopicId, TopicValidationError};
use crate::model::ChildKind;
use crate::repo::hierarchy_repo::{
    HierarchyChild, HierarchyRepoError, HierarchyRepository, TopicListQuery,
};
use log::debug;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// The sibling an attempted name collided with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExistingChild {
    /// Which table the conflicting sibling lives in.
    pub kind: ChildKind,
    /// Conflicting sibling id. `None` when the conflict was detected by the
    /// store's own unique index and the row could not be re-read (lost race).
    pub id: Option<i64>,
}

/// Errors from hierarchy service operations.
///
/// All variants are recoverable validation outcomes, never fatal.
#[derive(Debug)]
pub enum HierarchyServiceError {
    /// Area name failed validation.
    InvalidAreaName(AreaValidationError),
    /// Topic name failed validation.
    InvalidTopicName(TopicValidationError),
    /// Target knowledge area does not exist.
    AreaNotFound(AreaId),
    /// Target topic does not exist.
    TopicNotFound(TopicId),
    /// Referenced parent/area id does not exist.
    ParentNotFound(AreaId),
    /// A sibling under the same parent already carries this name.
    NameConflict {
        name: String,
        parent_id: Option<AreaId>,
        existing: ExistingChild,
    },
    /// An area was submitted as its own parent.
    SelfParenting(AreaId),
    /// Moving the area under the requested parent would close a cycle.
    CycleDetected { id: AreaId, parent_id: AreaId },
    /// Delete blocked because the area still has children.
    HasChildren(AreaId),
    /// Repository-level failure.
    Repo(HierarchyRepoError),
}

impl Display for HierarchyServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidAreaName(err) => write!(f, "{err}"),
            Self::InvalidTopicName(err) => write!(f, "{err}"),
            Self::AreaNotFound(id) => write!(f, "there exists no knowledge area with id {id}"),
            Self::TopicNotFound(id) => write!(f, "there exists no topic with id {id}"),
            Self::ParentNotFound(id) => {
                write!(f, "there exists no parent knowledge area with id {id}")
            }
            Self::NameConflict {
                name,
                parent_id,
                existing,
            } => {
                let kind = match existing.kind {
                    ChildKind::Area => "knowledge area",
                    ChildKind::Topic => "topic",
                };
                match parent_id {
                    Some(parent_id) => write!(
                        f,
                        "knowledge area {parent_id} already has a child {kind} named '{name}'"
                    ),
                    None => write!(
                        f,
                        "there exists already a top-level {kind} named '{name}'"
                    ),
                }
            }
            Self::SelfParenting(id) => {
                write!(f, "knowledge area {id} cannot be a parent of itself")
            }
            Self::CycleDetected { id, parent_id } => write!(
                f,
                "moving knowledge area {id} under {parent_id} would create a cycle"
            ),
            Self::HasChildren(id) => write!(
                f,
                "cannot delete knowledge area {id} because it has children"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for HierarchyServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidAreaName(err) => Some(err),
            Self::InvalidTopicName(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<AreaValidationError> for HierarchyServiceError {
    fn from(value: AreaValidationError) -> Self {
        Self::InvalidAreaName(value)
    }
}

impl From<TopicValidationError> for HierarchyServiceError {
    fn from(value: TopicValidationError) -> Self {
        Self::InvalidTopicName(value)
    }
}

impl From<HierarchyRepoError> for HierarchyServiceError {
    fn from(value: HierarchyRepoError) -> Self {
        match value {
            HierarchyRepoError::AreaNotFound(id) => Self::AreaNotFound(id),
            HierarchyRepoError::TopicNotFound(id) => Self::TopicNotFound(id),
            HierarchyRepoError::RestrictViolation(id) => Self::HasChildren(id),
            other => Self::Repo(other),
        }
    }
}

/// Consistency facade over the hierarchy store.
///
/// Owns no persistent state; every operation is one linear validate-then-
/// write sequence against the repository.
pub struct HierarchyService<R: HierarchyRepository> {
    repo: R,
}

impl<R: HierarchyRepository> HierarchyService<R> {
    /// Creates a service from a repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates one top-level knowledge area.
    ///
    /// Top-level creation has no cross-table check: a topic is always
    /// attached to an area, so no topic can be a top-level sibling.
    pub fn create_top_level_area(
        &self,
        name: impl Into<String>,
    ) -> Result<AreaId, HierarchyServiceError> {
        let name = normalize_area_name(&name.into())?;
        match self.repo.create_area(&name, None) {
            Ok(id) => {
                debug!("event=area_created module=hierarchy id={id} parent=none");
                Ok(id)
            }
            Err(HierarchyRepoError::UniqueViolation) => {
                Err(self.area_name_conflict(name, None)?)
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Creates one knowledge area under an existing parent.
    pub fn create_child_area(
        &self,
        parent_id: AreaId,
        name: impl Into<String>,
    ) -> Result<AreaId, HierarchyServiceError> {
        let name = normalize_area_name(&name.into())?;
        self.ensure_no_sibling_topic(parent_id, &name)?;

        match self.repo.create_area(&name, Some(parent_id)) {
            Ok(id) => {
                debug!("event=area_created module=hierarchy id={id} parent={parent_id}");
                Ok(id)
            }
            Err(HierarchyRepoError::UniqueViolation) => {
                Err(self.area_name_conflict(name, Some(parent_id))?)
            }
            Err(HierarchyRepoError::ForeignKeyViolation) => {
                Err(HierarchyServiceError::ParentNotFound(parent_id))
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Renames and/or moves one knowledge area.
    ///
    /// Re-runs every sibling check against the *new* parent. Rejects the
    /// immediate self-reference and any deeper ancestry cycle; the latter
    /// goes beyond what the persisted schema can ever express.
    pub fn update_area(
        &self,
        id: AreaId,
        name: impl Into<String>,
        new_parent_id: Option<AreaId>,
    ) -> Result<(), HierarchyServiceError> {
        let name = normalize_area_name(&name.into())?;

        let current = self
            .repo
            .get_area(id)?
            .ok_or(HierarchyServiceError::AreaNotFound(id))?;

        if let Some(parent_id) = new_parent_id {
            if parent_id == id {
                return Err(HierarchyServiceError::SelfParenting(id));
            }
            if self.would_create_cycle(id, parent_id)? {
                return Err(HierarchyServiceError::CycleDetected { id, parent_id });
            }
            self.ensure_no_sibling_topic(parent_id, &name)?;
        }

        match self.repo.rename_or_move_area(id, &name, new_parent_id) {
            Ok(()) => {
                debug!(
                    "event=area_updated module=hierarchy id={id} previous_parent={:?}",
                    current.parent_id
                );
                Ok(())
            }
            Err(HierarchyRepoError::UniqueViolation) => {
                Err(self.area_name_conflict(name, new_parent_id)?)
            }
            Err(HierarchyRepoError::ForeignKeyViolation) => Err(
                HierarchyServiceError::ParentNotFound(new_parent_id.unwrap_or(id)),
            ),
            Err(other) => Err(other.into()),
        }
    }

    /// Deletes one knowledge area; blocked while any child area or topic
    /// still references it.
    pub fn delete_area(&self, id: AreaId) -> Result<(), HierarchyServiceError> {
        self.repo
            .get_area(id)?
            .ok_or(HierarchyServiceError::AreaNotFound(id))?;
        self.repo.delete_area(id)?;
        debug!("event=area_deleted module=hierarchy id={id}");
        Ok(())
    }

    /// Creates one topic under one knowledge area.
    pub fn create_topic(
        &self,
        area_id: AreaId,
        name: impl Into<String>,
    ) -> Result<TopicId, HierarchyServiceError> {
        let name = normalize_topic_name(&name.into())?;
        self.ensure_no_sibling_area(area_id, &name)?;

        match self.repo.create_topic(&name, area_id) {
            Ok(id) => {
                debug!("event=topic_created module=hierarchy id={id} area={area_id}");
                Ok(id)
            }
            Err(HierarchyRepoError::UniqueViolation) => {
                Err(self.topic_name_conflict(name, area_id)?)
            }
            Err(HierarchyRepoError::ForeignKeyViolation) => {
                Err(HierarchyServiceError::ParentNotFound(area_id))
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Renames and/or moves one topic.
    pub fn update_topic(
        &self,
        id: TopicId,
        area_id: AreaId,
        name: impl Into<String>,
    ) -> Result<(), HierarchyServiceError> {
        let name = normalize_topic_name(&name.into())?;

        self.repo
            .get_topic(id)?
            .ok_or(HierarchyServiceError::TopicNotFound(id))?;
        self.ensure_no_sibling_area(area_id, &name)?;

        match self.repo.rename_or_move_topic(id, &name, area_id) {
            Ok(()) => {
                debug!("event=topic_updated module=hierarchy id={id} area={area_id}");
                Ok(())
            }
            Err(HierarchyRepoError::UniqueViolation) => {
                Err(self.topic_name_conflict(name, area_id)?)
            }
            Err(HierarchyRepoError::ForeignKeyViolation) => {
                Err(HierarchyServiceError::ParentNotFound(area_id))
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Deletes one topic. Topics have no children, so no extra checks.
    pub fn delete_topic(&self, id: TopicId) -> Result<(), HierarchyServiceError> {
        self.repo.delete_topic(id)?;
        debug!("event=topic_deleted module=hierarchy id={id}");
        Ok(())
    }

    /// Lists top-level areas, optionally filtered by name substring.
    pub fn top_level_areas(
        &self,
        name_filter: Option<&str>,
    ) -> Result<Vec<AreaSummary>, HierarchyServiceError> {
        self.repo.list_top_level_areas(name_filter).map_err(Into::into)
    }

    /// Lists area and topic children of one area, optionally filtered.
    pub fn children_of(
        &self,
        area_id: AreaId,
        name_filter: Option<&str>,
        kind_filter: Option<ChildKind>,
    ) -> Result<Vec<HierarchyChild>, HierarchyServiceError> {
        self.repo
            .get_area(area_id)?
            .ok_or(HierarchyServiceError::AreaNotFound(area_id))?;
        self.repo
            .list_children(area_id, name_filter, kind_filter)
            .map_err(Into::into)
    }

    /// Loads one knowledge area by id.
    pub fn get_area(&self, id: AreaId) -> Result<Area, HierarchyServiceError> {
        self.repo
            .get_area(id)?
            .ok_or(HierarchyServiceError::AreaNotFound(id))
    }

    /// Loads one topic by id.
    pub fn get_topic(&self, id: TopicId) -> Result<Topic, HierarchyServiceError> {
        self.repo
            .get_topic(id)?
            .ok_or(HierarchyServiceError::TopicNotFound(id))
    }

    /// Lists topics using filter options.
    pub fn list_topics(
        &self,
        query: &TopicListQuery,
    ) -> Result<Vec<Topic>, HierarchyServiceError> {
        self.repo.list_topics(query).map_err(Into::into)
    }

    /// Rejects an area write when a topic sibling already carries the name.
    ///
    /// The database cannot see this collision: area and topic names live in
    /// different tables and a unique index only ever covers one of them.
    fn ensure_no_sibling_topic(
        &self,
        parent_id: AreaId,
        name: &str,
    ) -> Result<(), HierarchyServiceError> {
        if let Some(topic_id) = self.repo.find_child_topic(parent_id, name)? {
            return Err(HierarchyServiceError::NameConflict {
                name: name.to_string(),
                parent_id: Some(parent_id),
                existing: ExistingChild {
                    kind: ChildKind::Topic,
                    id: Some(topic_id),
                },
            });
        }
        Ok(())
    }

    /// Rejects a topic write when an area sibling already carries the name.
    fn ensure_no_sibling_area(
        &self,
        area_id: AreaId,
        name: &str,
    ) -> Result<(), HierarchyServiceError> {
        if let Some(existing_id) = self.repo.find_child_area(Some(area_id), name)? {
            return Err(HierarchyServiceError::NameConflict {
                name: name.to_string(),
                parent_id: Some(area_id),
                existing: ExistingChild {
                    kind: ChildKind::Area,
                    id: Some(existing_id),
                },
            });
        }
        Ok(())
    }

    /// Builds the conflict error for a store-detected area collision,
    /// re-reading the conflicting sibling for the error details.
    fn area_name_conflict(
        &self,
        name: String,
        parent_id: Option<AreaId>,
    ) -> Result<HierarchyServiceError, HierarchyServiceError> {
        let existing_id = self.repo.find_child_area(parent_id, &name)?;
        Ok(HierarchyServiceError::NameConflict {
            name,
            parent_id,
            existing: ExistingChild {
                kind: ChildKind::Area,
                id: existing_id,
            },
        })
    }

    /// Builds the conflict error for a store-detected topic collision.
    fn topic_name_conflict(
        &self,
        name: String,
        area_id: AreaId,
    ) -> Result<HierarchyServiceError, HierarchyServiceError> {
        let existing_id = self.repo.find_child_topic(area_id, &name)?;
        Ok(HierarchyServiceError::NameConflict {
            name,
            parent_id: Some(area_id),
            existing: ExistingChild {
                kind: ChildKind::Topic,
                id: existing_id,
            },
        })
    }

    /// Walks the candidate parent's ancestry looking for the moved area.
    ///
    /// The persisted schema only ever rejects the single-row self-reference;
    /// a three-node cycle (A under B under A) passes every table constraint
    /// and must be caught here.
    fn would_create_cycle(
        &self,
        id: AreaId,
        candidate_parent_id: AreaId,
    ) -> Result<bool, HierarchyServiceError> {
        let mut visited = HashSet::new();
        let mut cursor = Some(candidate_parent_id);
        while let Some(current) = cursor {
            if current == id {
                return Ok(true);
            }
            if !visited.insert(current) {
                return Ok(true);
            }

            let area = self
                .repo
                .get_area(current)?
                .ok_or(HierarchyServiceError::ParentNotFound(current))?;
            cursor = area.parent_id;
        }
        Ok(false)
    }
}
