//! Hierarchy-backed child source for the tree cache.
//!
//! # Responsibility
//! - Adapt the hierarchy service's read API to the `ChildSource` hook.
//!
//! # Invariants
//! - The root fetch yields top-level areas; an area fetch yields its merged
//!   area/topic children; a topic never yields anything.

use crate::model::ChildKind;
use crate::repo::hierarchy_repo::HierarchyRepository;
use crate::service::hierarchy_service::{HierarchyService, HierarchyServiceError};
use crate::tree::cache::{ChildRecord, ChildSource, NodeId};

/// `ChildSource` implementation reading through the hierarchy service.
pub struct HierarchySource<'a, R: HierarchyRepository> {
    service: &'a HierarchyService<R>,
}

impl<'a, R: HierarchyRepository> HierarchySource<'a, R> {
    /// Creates a source over a hierarchy service.
    pub fn new(service: &'a HierarchyService<R>) -> Self {
        Self { service }
    }
}

impl<R: HierarchyRepository> ChildSource for HierarchySource<'_, R> {
    type Error = HierarchyServiceError;

    fn fetch_children(&mut self, node: NodeId) -> Result<Vec<ChildRecord>, Self::Error> {
        match node {
            NodeId::Root => {
                let areas = self.service.top_level_areas(None)?;
                Ok(areas
                    .into_iter()
                    .map(|area| ChildRecord {
                        id: NodeId::Area(area.id),
                        label: area.name,
                    })
                    .collect())
            }
            NodeId::Area(id) => {
                let children = self.service.children_of(id, None, None)?;
                Ok(children
                    .into_iter()
                    .map(|child| ChildRecord {
                        id: match child.kind {
                            ChildKind::Area => NodeId::Area(child.id),
                            ChildKind::Topic => NodeId::Topic(child.id),
                        },
                        label: child.name,
                    })
                    .collect())
            }
            NodeId::Topic(_) => Ok(Vec::new()),
        }
    }
}
