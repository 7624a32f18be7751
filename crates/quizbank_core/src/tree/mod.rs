//! Lazily-populated hierarchy tree for browsing and selection.
//!
//! # Responsibility
//! - Cache an externally-sourced tree one node at a time, fetching each
//!   node's children at most once.
//! - Drive a selection widget over that cache without re-fetching
//!   already-visited subtrees.
//!
//! # Invariants
//! - The synthetic root is an ordinary node (`NodeId::Root`); traversal code
//!   never special-cases it.
//! - A node never decides its own parent; parent links are assigned when
//!   the parent's children resolve.

pub mod cache;
pub mod select;
pub mod source;
