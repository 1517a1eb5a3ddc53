//! Scope tree
//!
//! Tracks the scope hierarchy built by one resolver pass:
//! - the module scope at the root
//! - one function scope per function definition or lambda, nested the way
//!   the definitions nest
//! - the syntax node that opened each scope

use crate::node::SyntaxId;
use serde::Serialize;
use std::collections::HashMap;

/// Unique identifier for a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ScopeId(pub u32);

impl ScopeId {
    /// The module scope
    pub fn root() -> Self {
        Self(0)
    }
}

impl std::fmt::Display for ScopeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "scope_{}", self.0)
    }
}

/// The kind of scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    /// Top-level module body
    Module,
    /// Function body
    Function,
    /// Lambda expression
    Lambda,
}

/// One lexical naming context
#[derive(Debug, Clone, Serialize)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    /// Function name, `<lambda>` or `<module>`
    pub name: String,
    /// Node that opened the scope
    pub node: SyntaxId,
    pub parent: Option<ScopeId>,
}

/// Scope hierarchy for one graph generation
#[derive(Debug, Default)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    /// Scope hierarchy (parent → children)
    children: HashMap<ScopeId, Vec<ScopeId>>,
    by_node: HashMap<SyntaxId, ScopeId>,
}

impl ScopeTree {
    /// Create a scope tree holding the module scope opened by `module`
    pub fn new(module: SyntaxId) -> Self {
        let mut tree = Self::default();
        tree.scopes.push(Scope {
            id: ScopeId::root(),
            kind: ScopeKind::Module,
            name: "<module>".to_string(),
            node: module,
            parent: None,
        });
        tree.by_node.insert(module, ScopeId::root());
        tree
    }

    /// Create a new child scope
    pub fn add_scope(
        &mut self,
        parent: ScopeId,
        kind: ScopeKind,
        name: impl Into<String>,
        node: SyntaxId,
    ) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            id,
            kind,
            name: name.into(),
            node,
            parent: Some(parent),
        });
        self.children.entry(parent).or_default().push(id);
        self.by_node.insert(node, id);
        id
    }

    pub fn get(&self, scope: ScopeId) -> Option<&Scope> {
        self.scopes.get(scope.0 as usize)
    }

    /// Get the parent of a scope
    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.get(scope).and_then(|s| s.parent)
    }

    /// Get the kind of a scope
    pub fn kind(&self, scope: ScopeId) -> Option<ScopeKind> {
        self.get(scope).map(|s| s.kind)
    }

    /// Scope opened by a module or function definition node
    pub fn scope_of_node(&self, node: SyntaxId) -> Option<ScopeId> {
        self.by_node.get(&node).copied()
    }

    /// Direct children of a scope
    pub fn children(&self, scope: ScopeId) -> &[ScopeId] {
        self.children.get(&scope).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// A scope followed by every scope nested inside it
    pub fn descendants(&self, scope: ScopeId) -> Vec<ScopeId> {
        let mut out = Vec::new();
        let mut stack = vec![scope];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// Get scope chain from a scope up to root
    pub fn scope_chain(&self, scope: ScopeId) -> Vec<ScopeId> {
        let mut chain = vec![scope];
        let mut current = scope;
        while let Some(parent) = self.parent(current) {
            chain.push(parent);
            current = parent;
        }
        chain
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scope> {
        self.scopes.iter()
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(index: u32) -> SyntaxId {
        SyntaxId::new(0, index)
    }

    #[test]
    fn test_scope_hierarchy() {
        let mut tree = ScopeTree::new(node(0));

        let outer = tree.add_scope(ScopeId::root(), ScopeKind::Function, "outer", node(3));
        let inner = tree.add_scope(outer, ScopeKind::Function, "inner", node(7));

        assert_eq!(tree.parent(inner), Some(outer));
        assert_eq!(tree.parent(outer), Some(ScopeId::root()));
        assert_eq!(tree.parent(ScopeId::root()), None);
        assert_eq!(tree.kind(ScopeId::root()), Some(ScopeKind::Module));
        assert_eq!(tree.scope_of_node(node(7)), Some(inner));
    }

    #[test]
    fn test_scope_chain() {
        let mut tree = ScopeTree::new(node(0));
        let s1 = tree.add_scope(ScopeId::root(), ScopeKind::Function, "a", node(1));
        let s2 = tree.add_scope(s1, ScopeKind::Function, "b", node(2));
        let s3 = tree.add_scope(s2, ScopeKind::Function, "c", node(3));

        let chain = tree.scope_chain(s3);
        assert_eq!(chain, vec![s3, s2, s1, ScopeId::root()]);
    }

    #[test]
    fn test_descendants() {
        let mut tree = ScopeTree::new(node(0));
        let a = tree.add_scope(ScopeId::root(), ScopeKind::Function, "a", node(1));
        let a1 = tree.add_scope(a, ScopeKind::Function, "a1", node(2));
        let b = tree.add_scope(ScopeId::root(), ScopeKind::Function, "b", node(3));

        assert_eq!(tree.descendants(ScopeId::root()), vec![ScopeId::root(), a, a1, b]);
        assert_eq!(tree.descendants(a), vec![a, a1]);
        assert_eq!(tree.descendants(b), vec![b]);
    }
}
