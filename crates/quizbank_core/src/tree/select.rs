//! Tree selection controller.
//!
//! # Responsibility
//! - Drive a selection widget over a `TreeCache`: loading state, current
//!   selection, disabled/selectable policies, change notification.
//!
//! # Invariants
//! - The root stands in for "nothing selected"; the widget-facing sentinel
//!   (`None`) is translated at the boundary only, so no other code
//!   special-cases the root.
//! - The controller is `ready` exactly when the root's children resolved.

use crate::tree::cache::{ChildSource, NodeId, TreeCache, TreeError};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Caller-supplied policy over nodes (disabled / branch-selectable).
pub type NodePredicate = Box<dyn Fn(NodeId, &str) -> bool>;

/// Errors from selection operations.
#[derive(Debug)]
pub enum TreeSelectError<E> {
    /// The root's children have not been resolved yet.
    NotReady,
    /// The node is disabled by the caller-supplied policy.
    NodeDisabled(NodeId),
    /// The node is an interior branch the policy allows only for navigation.
    BranchNotSelectable(NodeId),
    /// Cache-level failure.
    Tree(TreeError<E>),
}

impl<E: Display> Display for TreeSelectError<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotReady => write!(f, "tree selection is still loading"),
            Self::NodeDisabled(id) => write!(f, "node is disabled: {id:?}"),
            Self::BranchNotSelectable(id) => {
                write!(f, "branch can only be used for navigation: {id:?}")
            }
            Self::Tree(err) => write!(f, "{err}"),
        }
    }
}

impl<E: Error + 'static> Error for TreeSelectError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Tree(err) => Some(err),
            _ => None,
        }
    }
}

impl<E> From<TreeError<E>> for TreeSelectError<E> {
    fn from(value: TreeError<E>) -> Self {
        Self::Tree(value)
    }
}

enum SelectState {
    Loading,
    Ready { selection: NodeId },
}

/// Interaction state machine for a hierarchy selection widget.
pub struct TreeSelect<S: ChildSource> {
    cache: TreeCache<S>,
    state: SelectState,
    is_node_disabled: Option<NodePredicate>,
    is_branch_selectable: Option<NodePredicate>,
    on_change: Option<Box<dyn FnMut(NodeId)>>,
}

impl<S: ChildSource> TreeSelect<S> {
    /// Creates a controller in the `loading` state.
    pub fn new(source: S) -> Self {
        Self {
            cache: TreeCache::new(source),
            state: SelectState::Loading,
            is_node_disabled: None,
            is_branch_selectable: None,
            on_change: None,
        }
    }

    /// Installs the disabled-node policy (e.g. forbid selecting the node
    /// currently being edited as its own parent).
    pub fn set_node_disabled(&mut self, predicate: NodePredicate) {
        self.is_node_disabled = Some(predicate);
    }

    /// Installs the branch-selectable policy controlling whether an interior
    /// node can itself be chosen versus only used for navigation.
    pub fn set_branch_selectable(&mut self, predicate: NodePredicate) {
        self.is_branch_selectable = Some(predicate);
    }

    /// Registers the change callback invoked on every user selection.
    pub fn set_on_change(&mut self, callback: Box<dyn FnMut(NodeId)>) {
        self.on_change = Some(callback);
    }

    /// Resolves the root's children and enters `ready` with the externally
    /// supplied initial value, or the root ("nothing selected") if none.
    pub fn init(&mut self, initial: Option<NodeId>) -> Result<(), TreeError<S::Error>> {
        self.cache.get_children(NodeId::Root)?;
        self.state = SelectState::Ready {
            selection: initial.unwrap_or(NodeId::Root),
        };
        Ok(())
    }

    /// Re-enters with an externally supplied value; `None` means the root.
    ///
    /// Resolves the root first when still loading.
    pub fn set_value(&mut self, value: Option<NodeId>) -> Result<(), TreeError<S::Error>> {
        match self.state {
            SelectState::Loading => self.init(value),
            SelectState::Ready { .. } => {
                self.state = SelectState::Ready {
                    selection: value.unwrap_or(NodeId::Root),
                };
                Ok(())
            }
        }
    }

    /// Moves the selection to `node`, honouring the installed policies, and
    /// invokes the change callback.
    pub fn select(&mut self, node: NodeId) -> Result<(), TreeSelectError<S::Error>> {
        if matches!(self.state, SelectState::Loading) {
            return Err(TreeSelectError::NotReady);
        }

        let label = self
            .cache
            .label(node)
            .ok_or(TreeSelectError::Tree(TreeError::UnknownNode(node)))?
            .to_string();

        if let Some(is_disabled) = &self.is_node_disabled {
            if is_disabled(node, &label) {
                return Err(TreeSelectError::NodeDisabled(node));
            }
        }

        if let Some(is_branch_selectable) = &self.is_branch_selectable {
            if self.cache.has_children(node) && !is_branch_selectable(node, &label) {
                return Err(TreeSelectError::BranchNotSelectable(node));
            }
        }

        self.state = SelectState::Ready { selection: node };
        if let Some(on_change) = &mut self.on_change {
            on_change(node);
        }
        Ok(())
    }

    /// Lists the children of `node` for navigation, fetching as needed.
    pub fn options(&mut self, node: NodeId) -> Result<Vec<NodeId>, TreeError<S::Error>> {
        Ok(self.cache.get_children(node)?.unwrap_or_default())
    }

    /// Current selection; `None` while loading. The root means "nothing
    /// selected".
    pub fn selection(&self) -> Option<NodeId> {
        match self.state {
            SelectState::Loading => None,
            SelectState::Ready { selection } => Some(selection),
        }
    }

    /// Widget-facing value: `None` while loading and for the root sentinel.
    pub fn widget_value(&self) -> Option<NodeId> {
        match self.selection() {
            Some(NodeId::Root) | None => None,
            other => other,
        }
    }

    /// Maps the widget's native "no selection" sentinel back to the root.
    pub fn from_widget(value: Option<NodeId>) -> NodeId {
        value.unwrap_or(NodeId::Root)
    }

    /// Whether the controller is still resolving the root.
    pub fn is_loading(&self) -> bool {
        matches!(self.state, SelectState::Loading)
    }

    /// Whether the widget should render disabled: still loading, or the
    /// root resolved with nothing to select.
    pub fn is_widget_disabled(&self) -> bool {
        self.is_loading() || !self.cache.has_children(NodeId::Root)
    }

    /// Read access to the underlying cache (path building, cached lookups).
    pub fn cache(&self) -> &TreeCache<S> {
        &self.cache
    }

    /// Mutable access to the underlying cache (explicit fetches).
    pub fn cache_mut(&mut self) -> &mut TreeCache<S> {
        &mut self.cache
    }
}
