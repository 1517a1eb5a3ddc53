//! Syntax nodes - graph-side wrappers around tree nodes
//!
//! A [`SyntaxNode`] pairs a tree node with the identity the graph handed out
//! for it during the last rebuild. Identities are only meaningful for the
//! rebuild that produced them: every `refresh` bumps the generation, and an
//! id from an older generation is rejected instead of resolving to whatever
//! node now sits at the same position.

use crate::ast::NodeRef;
use serde::Serialize;

/// Identity of a syntax node within one graph rebuild.
///
/// `index` is the node's position in the pre-order walk of the tree, so
/// comparing two ids of the same generation compares source order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SyntaxId {
    pub generation: u32,
    pub index: u32,
}

impl SyntaxId {
    pub fn new(generation: u32, index: u32) -> Self {
        Self { generation, index }
    }

    /// Whether this id precedes `other` in source order
    pub fn precedes(&self, other: &SyntaxId) -> bool {
        self.generation == other.generation && self.index < other.index
    }
}

impl std::fmt::Display for SyntaxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}@{}", self.index, self.generation)
    }
}

/// A tree node as seen by the graph
#[derive(Debug, Clone, Serialize)]
pub struct SyntaxNode {
    pub id: SyntaxId,
    /// The underlying tree node
    pub node: NodeRef,
    /// Back-reference to the parent; not an ownership edge
    pub parent: Option<SyntaxId>,
    /// Distance from the root
    pub depth: u32,
}

impl SyntaxNode {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}
