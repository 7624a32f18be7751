//! Memoizing tree node cache.
//!
//! # Responsibility
//! - Represent nodes of a possibly-infinite, externally-sourced tree.
//! - Fetch and memoize each node's children exactly once.
//!
//! # Invariants
//! - Nodes live in an arena keyed by `NodeId`; parent links are an explicit
//!   map, so ownership stays non-cyclic.
//! - Resolved-empty is distinct from unresolved: a leaf and an unfetched
//!   node differ only by the resolved flag.
//! - A failed fetch is never cached; the next call retries.
//!
//! Access is `&mut self` and single-threaded; two calls can never overlap,
//! so each node sees at most one underlying fetch by construction.

use crate::model::area::AreaId;
use crate::model::topic::TopicId;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Key of one tree node.
///
/// The synthetic root is a tagged variant rather than a distinguished
/// instance, so no identity comparison can confuse it with a stored row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeId {
    /// Synthetic root whose children are the top-level areas.
    Root,
    /// Knowledge area node.
    Area(AreaId),
    /// Topic node, always a leaf.
    Topic(TopicId),
}

/// One child as returned by a `ChildSource` fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildRecord {
    /// Key of the child node.
    pub id: NodeId,
    /// User-facing label used for display and path building.
    pub label: String,
}

/// Polymorphic children-fetch hook.
///
/// Concrete sources decide what "children" means per node: the root yields
/// top-level areas, an area yields its immediate area/topic children, a
/// topic yields nothing.
pub trait ChildSource {
    type Error: Error;

    /// Fetches the immediate children of `node` from the backing store.
    fn fetch_children(&mut self, node: NodeId) -> Result<Vec<ChildRecord>, Self::Error>;
}

/// Errors from tree cache operations.
#[derive(Debug)]
pub enum TreeError<E> {
    /// The node key is not present in the arena.
    UnknownNode(NodeId),
    /// The underlying fetch failed; nothing was cached.
    Source(E),
}

impl<E: Display> Display for TreeError<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownNode(id) => write!(f, "unknown tree node: {id:?}"),
            Self::Source(err) => write!(f, "{err}"),
        }
    }
}

impl<E: Error + 'static> Error for TreeError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::UnknownNode(_) => None,
            Self::Source(err) => Some(err),
        }
    }
}

struct NodeEntry {
    label: String,
    /// `None` = unresolved (never fetched); `Some` = resolved, possibly empty.
    children: Option<Vec<NodeId>>,
}

/// Lazily-populated, memoizing tree handle with a synthetic root.
pub struct TreeCache<S: ChildSource> {
    source: S,
    nodes: HashMap<NodeId, NodeEntry>,
    parents: HashMap<NodeId, NodeId>,
}

impl<S: ChildSource> TreeCache<S> {
    /// Creates a cache containing only the unresolved synthetic root.
    pub fn new(source: S) -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(
            NodeId::Root,
            NodeEntry {
                label: String::new(),
                children: None,
            },
        );
        Self {
            source,
            nodes,
            parents: HashMap::new(),
        }
    }

    /// Returns the key of the synthetic root.
    pub fn root() -> NodeId {
        NodeId::Root
    }

    /// Returns the memoized children of `node`, fetching them on first use.
    ///
    /// Returns `None` for a node that resolved to no children. Parent links
    /// for every returned child are assigned here; a node never decides its
    /// own parent.
    pub fn get_children(
        &mut self,
        node: NodeId,
    ) -> Result<Option<Vec<NodeId>>, TreeError<S::Error>> {
        let entry = self
            .nodes
            .get(&node)
            .ok_or(TreeError::UnknownNode(node))?;

        if entry.children.is_none() {
            let fetched = self
                .source
                .fetch_children(node)
                .map_err(TreeError::Source)?;

            let mut child_ids = Vec::with_capacity(fetched.len());
            for child in fetched {
                child_ids.push(child.id);
                self.parents.insert(child.id, node);
                // Keep an already-known entry so its own cached subtree
                // survives a parent re-resolution.
                self.nodes.entry(child.id).or_insert(NodeEntry {
                    label: child.label,
                    children: None,
                });
            }

            if let Some(entry) = self.nodes.get_mut(&node) {
                entry.children = Some(child_ids);
            }
        }

        let children = self
            .nodes
            .get(&node)
            .and_then(|entry| entry.children.as_ref())
            .filter(|children| !children.is_empty())
            .cloned();
        Ok(children)
    }

    /// Depth-first search for the first child satisfying `predicate`.
    ///
    /// With `recursive` set, descends into every child's subtree in order,
    /// fetching as needed, until a match is found or the reachable subtree
    /// is exhausted.
    pub fn get_child<F>(
        &mut self,
        node: NodeId,
        predicate: F,
        recursive: bool,
    ) -> Result<Option<NodeId>, TreeError<S::Error>>
    where
        F: Fn(NodeId, &str) -> bool,
    {
        self.get_child_inner(node, &predicate, recursive)
    }

    fn get_child_inner<F>(
        &mut self,
        node: NodeId,
        predicate: &F,
        recursive: bool,
    ) -> Result<Option<NodeId>, TreeError<S::Error>>
    where
        F: Fn(NodeId, &str) -> bool,
    {
        let children = match self.get_children(node)? {
            Some(children) => children,
            None => return Ok(None),
        };

        for child in children {
            let matched = self
                .nodes
                .get(&child)
                .map(|entry| predicate(child, &entry.label))
                .unwrap_or(false);
            if matched {
                return Ok(Some(child));
            }

            if recursive {
                if let Some(found) = self.get_child_inner(child, predicate, recursive)? {
                    return Ok(Some(found));
                }
            }
        }

        Ok(None)
    }

    /// Returns the first *currently cached* child satisfying `predicate`.
    ///
    /// Never triggers a fetch; an unresolved node yields `None`.
    pub fn find_child<F>(&self, node: NodeId, predicate: F) -> Option<NodeId>
    where
        F: Fn(NodeId, &str) -> bool,
    {
        let children = self.nodes.get(&node)?.children.as_ref()?;
        children
            .iter()
            .copied()
            .find(|child| {
                self.nodes
                    .get(child)
                    .map(|entry| predicate(*child, &entry.label))
                    .unwrap_or(false)
            })
    }

    /// Returns whether `node` has any *currently cached* child satisfying
    /// `predicate`. Never triggers a fetch.
    pub fn has_child<F>(&self, node: NodeId, predicate: F) -> bool
    where
        F: Fn(NodeId, &str) -> bool,
    {
        self.find_child(node, predicate).is_some()
    }

    /// Number of cached children; 0 for an unresolved node.
    pub fn child_count(&self, node: NodeId) -> usize {
        self.nodes
            .get(&node)
            .and_then(|entry| entry.children.as_ref())
            .map_or(0, Vec::len)
    }

    /// Whether `node` has any cached children.
    pub fn has_children(&self, node: NodeId) -> bool {
        self.child_count(node) > 0
    }

    /// Whether the children of `node` have been fetched (even if empty).
    pub fn is_resolved(&self, node: NodeId) -> bool {
        self.nodes
            .get(&node)
            .map_or(false, |entry| entry.children.is_some())
    }

    /// Builds the ancestry string of `node`, excluding the synthetic root.
    ///
    /// The root itself maps to an empty string.
    pub fn get_path(&self, node: NodeId, separator: &str) -> String {
        let mut labels = Vec::new();
        let mut cursor = node;
        while cursor != NodeId::Root {
            if let Some(entry) = self.nodes.get(&cursor) {
                labels.push(entry.label.as_str());
            }
            cursor = match self.parents.get(&cursor) {
                Some(parent) => *parent,
                None => break,
            };
        }
        labels.reverse();
        labels.join(separator)
    }

    /// Parent of `node`; `None` exactly for the root (or an unknown key).
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.parents.get(&node).copied()
    }

    /// Whether `node` is the node with no parent.
    pub fn is_root(&self, node: NodeId) -> bool {
        node == NodeId::Root
    }

    /// Label of `node`, if it is known to the arena.
    pub fn label(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(&node).map(|entry| entry.label.as_str())
    }

    /// Whether `node` is present in the arena.
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    /// Read access to the underlying source.
    pub fn source_ref(&self) -> &S {
        &self.source
    }
}
