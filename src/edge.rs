//! Syntax edges - parent → child relations
//!
//! Every non-root node has exactly one inbound edge. The edge records where
//! the child sits inside its parent: the field name and, for ordered
//! sequences, the list index.

use crate::node::SyntaxId;
use serde::Serialize;

/// A directed parent → child edge of the syntax tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SyntaxEdge {
    pub parent: SyntaxId,
    pub child: SyntaxId,
    /// Field of the parent holding the child
    pub field: &'static str,
    /// Position in the field when the field is a list
    pub index: Option<usize>,
}

impl SyntaxEdge {
    pub fn new(parent: SyntaxId, child: SyntaxId, field: &'static str, index: Option<usize>) -> Self {
        Self { parent, child, field, index }
    }

    /// (parent, child) pair identifying the edge
    pub fn id(&self) -> (SyntaxId, SyntaxId) {
        (self.parent, self.child)
    }

    /// Check if the child is held in an ordered sequence
    pub fn is_list_slot(&self) -> bool {
        self.index.is_some()
    }

    /// Structural position rendered as `field` or `field[index]`
    pub fn attrs(&self) -> String {
        match self.index {
            Some(i) => format!("{}[{}]", self.field, i),
            None => self.field.to_string(),
        }
    }
}

impl std::fmt::Display for SyntaxEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -{}-> {}", self.parent, self.attrs(), self.child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_attrs() {
        let parent = SyntaxId::new(0, 0);
        let child = SyntaxId::new(0, 1);

        let listed = SyntaxEdge::new(parent, child, "body", Some(2));
        assert!(listed.is_list_slot());
        assert_eq!(listed.attrs(), "body[2]");
        assert_eq!(listed.id(), (parent, child));

        let single = SyntaxEdge::new(parent, child, "value", None);
        assert!(!single.is_list_slot());
        assert_eq!(single.to_string(), "n0@0 -value-> n1@0");
    }
}
