//! Syntax Node Store
//!
//! One pre-order traversal of the tree assigns every reachable node a fresh
//! [`SyntaxId`] and records its inbound [`SyntaxEdge`]. The store never
//! mutates the tree.

use crate::ast::{Ast, NodeRef};
use crate::edge::SyntaxEdge;
use crate::node::{SyntaxId, SyntaxNode};
use crate::{Error, Result};
use std::collections::HashMap;

/// Node and edge tables for one graph generation
#[derive(Debug, Default)]
pub struct NodeStore {
    generation: u32,
    /// Nodes in pre-order; a node's `SyntaxId::index` is its position here
    nodes: Vec<SyntaxNode>,
    /// Edges in discovery order
    edges: Vec<SyntaxEdge>,
    /// Node index → index of its inbound edge
    inbound: Vec<Option<usize>>,
    by_ref: HashMap<NodeRef, SyntaxId>,
}

impl NodeStore {
    /// Walk the tree from its root and build the tables.
    ///
    /// Fails with [`Error::SharedNode`] if a tree node is reachable through
    /// more than one parent.
    pub fn build(ast: &Ast, generation: u32) -> Result<Self> {
        let mut store = Self {
            generation,
            ..Self::default()
        };
        let mut seen = vec![false; ast.len()];
        let mut stack: Vec<(NodeRef, Option<(SyntaxId, &'static str, Option<usize>)>, u32)> =
            vec![(ast.root(), None, 0)];

        while let Some((node, parent, depth)) = stack.pop() {
            let slot = seen
                .get_mut(node.index())
                .ok_or(Error::SharedNode(node))?;
            if *slot {
                return Err(Error::SharedNode(node));
            }
            *slot = true;

            let id = SyntaxId::new(generation, store.nodes.len() as u32);
            store.nodes.push(SyntaxNode {
                id,
                node,
                parent: parent.map(|(p, _, _)| p),
                depth,
            });
            store.by_ref.insert(node, id);

            match parent {
                Some((parent_id, field, index)) => {
                    store.inbound.push(Some(store.edges.len()));
                    store.edges.push(SyntaxEdge::new(parent_id, id, field, index));
                }
                None => store.inbound.push(None),
            }

            let children = ast[node].kind.children();
            for slot in children.into_iter().rev() {
                stack.push((slot.node, Some((id, slot.field, slot.index)), depth + 1));
            }
        }

        Ok(store)
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Look up a node, rejecting ids from other generations
    pub fn get(&self, id: SyntaxId) -> Result<&SyntaxNode> {
        if id.generation != self.generation {
            return Err(Error::StaleNode {
                id,
                current: self.generation,
            });
        }
        self.nodes
            .get(id.index as usize)
            .ok_or(Error::NodeNotFound(id))
    }

    /// Parent of a node; `None` for the root
    pub fn parent(&self, id: SyntaxId) -> Result<Option<SyntaxId>> {
        Ok(self.get(id)?.parent)
    }

    /// Inbound edge of a node; `None` for the root
    pub fn edge(&self, id: SyntaxId) -> Result<Option<&SyntaxEdge>> {
        self.get(id)?;
        Ok(self
            .inbound
            .get(id.index as usize)
            .copied()
            .flatten()
            .and_then(|i| self.edges.get(i)))
    }

    /// Id assigned to a tree node in this generation
    pub fn syntax_id(&self, node: NodeRef) -> Option<SyntaxId> {
        self.by_ref.get(&node).copied()
    }

    pub fn root(&self) -> Option<&SyntaxNode> {
        self.nodes.first()
    }

    pub fn nodes(&self) -> &[SyntaxNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[SyntaxEdge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ExprContext, NodeKind};

    fn sample_tree() -> Ast {
        // x = y
        let mut ast = Ast::new();
        let target = ast.name("x", ExprContext::Store);
        let value = ast.name("y", ExprContext::Load);
        let assign = ast.add(NodeKind::Assign { targets: vec![target], value });
        ast.push_statement(assign);
        ast
    }

    #[test]
    fn test_every_non_root_node_has_one_parent() {
        let ast = sample_tree();
        let store = NodeStore::build(&ast, 0).unwrap();

        assert_eq!(store.len(), 4);
        assert_eq!(store.edges().len(), 3);
        for node in store.nodes().iter().skip(1) {
            let parent = store.parent(node.id).unwrap().unwrap();
            let edge = store.edge(node.id).unwrap().unwrap();
            assert_eq!(edge.parent, parent);
            let parent_ref = store.get(parent).unwrap().node;
            let holders = ast[parent_ref]
                .kind
                .children()
                .into_iter()
                .filter(|slot| slot.node == node.node)
                .count();
            assert_eq!(holders, 1);
        }
        let root = store.root().unwrap();
        assert!(root.is_root());
        assert!(store.edge(root.id).unwrap().is_none());
    }

    #[test]
    fn test_edges_record_field_and_index() {
        let ast = sample_tree();
        let store = NodeStore::build(&ast, 0).unwrap();

        let attrs: Vec<_> = store.edges().iter().map(|e| e.attrs()).collect();
        assert_eq!(attrs, vec!["body[0]", "targets[0]", "value"]);
    }

    #[test]
    fn test_stale_and_unknown_ids() {
        let ast = sample_tree();
        let store = NodeStore::build(&ast, 5).unwrap();

        assert!(matches!(
            store.get(SyntaxId::new(4, 0)),
            Err(Error::StaleNode { current: 5, .. })
        ));
        assert!(matches!(
            store.get(SyntaxId::new(5, 99)),
            Err(Error::NodeNotFound(_))
        ));
    }

    #[test]
    fn test_shared_node_is_rejected() {
        let mut ast = Ast::new();
        let shared = ast.name("x", ExprContext::Load);
        let first = ast.add(NodeKind::Expr { value: shared });
        let second = ast.add(NodeKind::Expr { value: shared });
        ast.push_statement(first);
        ast.push_statement(second);

        assert!(matches!(
            NodeStore::build(&ast, 0),
            Err(Error::SharedNode(node)) if node == shared
        ));
    }
}
