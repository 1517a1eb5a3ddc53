//! Code Graph - the composition root
//!
//! Owns the syntax tree together with the tables derived from it: the node
//! store (ids, parent edges) and the resolver output (scopes, tokens,
//! occurrences). Transforms edit the tree through the graph and then call
//! [`CodeGraph::refresh`], which re-derives every table and invalidates all
//! previously issued ids.

use crate::ast::{Ast, ExprContext, Node, NodeKind, NodeRef};
use crate::edge::SyntaxEdge;
use crate::node::{SyntaxId, SyntaxNode};
use crate::scope::{Occurrence, NameToken, Resolution, ScopeId, ScopeTree, resolve};
use crate::store::NodeStore;
use crate::{Result, adapter, printer};
use serde::Serialize;
use std::path::Path;

/// Mutable program graph over one syntax tree
#[derive(Debug)]
pub struct CodeGraph {
    ast: Ast,
    generation: u32,
    store: NodeStore,
    resolution: Resolution,
}

impl CodeGraph {
    /// Build the graph for a tree
    pub fn new(ast: Ast) -> Result<Self> {
        let mut graph = Self {
            ast,
            generation: 0,
            store: NodeStore::default(),
            resolution: Resolution::default(),
        };
        graph.rebuild(0)?;
        Ok(graph)
    }

    /// Parse Python source and build its graph
    pub fn from_source(source: &str) -> Result<Self> {
        Self::new(adapter::python::parse(source)?)
    }

    /// Read and parse a source file, choosing the front end by extension
    pub fn from_file(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        let registry = adapter::default_registry();
        let ast = registry.parse_file(path, &source)?;
        Self::new(ast)
    }

    /// Rebuild every derived table from the current tree.
    ///
    /// Must be called after any structural mutation. Ids issued before the
    /// call belong to the previous generation and are rejected afterwards.
    /// A failed rebuild leaves the previous tables and generation in place.
    pub fn refresh(&mut self) -> Result<()> {
        self.rebuild(self.generation + 1)
    }

    fn rebuild(&mut self, generation: u32) -> Result<()> {
        let store = NodeStore::build(&self.ast, generation)?;
        self.resolution = resolve(&self.ast, &store);
        self.store = store;
        self.generation = generation;
        tracing::debug!(
            generation = self.generation,
            nodes = self.store.len(),
            scopes = self.resolution.scopes().len(),
            tokens = self.resolution.tokens().len(),
            "rebuilt code graph"
        );
        Ok(())
    }

    /// The current tree (read-only snapshot)
    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    /// Tree access for transforms; callers must `refresh` afterwards
    pub(crate) fn ast_mut(&mut self) -> &mut Ast {
        &mut self.ast
    }

    /// Edit the tree and rebuild the graph
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut Ast) -> R) -> Result<R> {
        let out = f(&mut self.ast);
        self.refresh()?;
        Ok(out)
    }

    /// Give up the graph and keep the tree
    pub fn into_ast(self) -> Ast {
        self.ast
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Id of the module root
    pub fn root(&self) -> SyntaxId {
        SyntaxId::new(self.generation, 0)
    }

    /// Tree node behind an id
    pub fn ast_node(&self, id: SyntaxId) -> Result<&Node> {
        let node = self.store.get(id)?;
        Ok(&self.ast[node.node])
    }

    /// Arena reference behind an id
    pub fn node_ref(&self, id: SyntaxId) -> Result<NodeRef> {
        Ok(self.store.get(id)?.node)
    }

    /// Parent of a node; `None` for the root
    pub fn get_parent(&self, id: SyntaxId) -> Result<Option<SyntaxId>> {
        self.store.parent(id)
    }

    /// Inbound edge of a node; `None` for the root
    pub fn edge(&self, id: SyntaxId) -> Result<Option<&SyntaxEdge>> {
        self.store.edge(id)
    }

    /// Current id of a reachable tree node
    pub fn syntax_id(&self, node: NodeRef) -> Option<SyntaxId> {
        self.store.syntax_id(node)
    }

    /// Read-context marker for synthesized name references
    pub fn load_node(&self) -> ExprContext {
        ExprContext::Load
    }

    /// Write-context marker for synthesized name references
    pub fn store_node(&self) -> ExprContext {
        ExprContext::Store
    }

    pub fn nodes(&self) -> &[SyntaxNode] {
        self.store.nodes()
    }

    pub fn edges(&self) -> &[SyntaxEdge] {
        self.store.edges()
    }

    pub fn scopes(&self) -> &ScopeTree {
        self.resolution.scopes()
    }

    pub fn tokens(&self) -> &[NameToken] {
        self.resolution.tokens()
    }

    pub fn occurrences(&self) -> impl Iterator<Item = &Occurrence> {
        self.resolution.occurrences()
    }

    pub fn resolution(&self) -> &Resolution {
        &self.resolution
    }

    /// Token for (name, scope), without walking enclosing scopes
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<&NameToken> {
        self.resolution.lookup(scope, name)
    }

    /// Token a name or parameter node belongs to
    pub fn token_of(&self, id: SyntaxId) -> Option<&NameToken> {
        self.resolution.token_of(id)
    }

    /// Calls whose callee is the simple name `name`, in source order
    pub fn find_calls(&self, name: &str) -> Vec<SyntaxId> {
        self.nodes()
            .iter()
            .filter(|n| match &self.ast[n.node].kind {
                NodeKind::Call { func, .. } => {
                    matches!(&self.ast[*func].kind, NodeKind::Name { id, .. } if id == name)
                }
                _ => false,
            })
            .map(|n| n.id)
            .collect()
    }

    /// Function definitions named `name`, in source order
    pub fn find_function_defs(&self, name: &str) -> Vec<SyntaxId> {
        self.nodes()
            .iter()
            .filter(|n| {
                matches!(&self.ast[n.node].kind, NodeKind::FunctionDef { name: def, .. } if def == name)
            })
            .map(|n| n.id)
            .collect()
    }

    /// Render the current tree as Python source
    pub fn to_source(&self) -> String {
        printer::to_source(&self.ast)
    }

    /// Get statistics about the graph
    pub fn stats(&self) -> GraphStats {
        let functions = self
            .nodes()
            .iter()
            .filter(|n| matches!(self.ast[n.node].kind, NodeKind::FunctionDef { .. }))
            .count();

        GraphStats {
            generation: self.generation,
            nodes: self.store.len(),
            edges: self.store.edges().len(),
            functions,
            scopes: self.resolution.scopes().len(),
            tokens: self.resolution.tokens().len(),
            occurrences: self.resolution.occurrences().count(),
        }
    }
}

/// Statistics about a code graph
#[derive(Debug, Clone, Serialize)]
pub struct GraphStats {
    pub generation: u32,
    pub nodes: usize,
    pub edges: usize,
    pub functions: usize,
    pub scopes: usize,
    pub tokens: usize,
    pub occurrences: usize,
}

impl std::fmt::Display for GraphStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Code Graph Statistics:")?;
        writeln!(f, "  Generation: {}", self.generation)?;
        writeln!(f, "  Nodes: {} (edges: {})", self.nodes, self.edges)?;
        writeln!(f, "  Functions: {}", self.functions)?;
        writeln!(f, "  Scopes: {}", self.scopes)?;
        writeln!(f, "  Tokens: {} (occurrences: {})", self.tokens, self.occurrences)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::collections::HashSet;

    const SAMPLE: &str = "def f(x, y):\n    return x + y\nz = f(1, 2)\n";

    #[test]
    fn test_build_from_source() {
        let graph = CodeGraph::from_source(SAMPLE).unwrap();
        let stats = graph.stats();

        assert_eq!(stats.generation, 0);
        assert_eq!(stats.functions, 1);
        assert_eq!(stats.scopes, 2);
        assert_eq!(stats.edges, stats.nodes - 1);
        assert_eq!(graph.find_calls("f").len(), 1);
        assert_eq!(graph.find_function_defs("f").len(), 1);
    }

    #[test]
    fn test_refresh_invalidates_ids() {
        let mut graph = CodeGraph::from_source(SAMPLE).unwrap();
        let call = graph.find_calls("f")[0];
        assert!(graph.ast_node(call).is_ok());

        graph.refresh().unwrap();

        assert!(matches!(graph.ast_node(call), Err(Error::StaleNode { .. })));
        assert!(matches!(graph.get_parent(call), Err(Error::StaleNode { .. })));
        let fresh = graph.find_calls("f")[0];
        assert_eq!(fresh.generation, 1);
        assert_eq!(graph.ast_node(fresh).unwrap().kind.name(), "Call");
    }

    #[test]
    fn test_parent_uniqueness() {
        let graph = CodeGraph::from_source(SAMPLE).unwrap();

        for node in graph.nodes().iter().skip(1) {
            let parent = graph.get_parent(node.id).unwrap().unwrap();
            let edge = graph.edge(node.id).unwrap().unwrap();
            let holders: Vec<_> = graph
                .ast_node(parent)
                .unwrap()
                .kind
                .children()
                .into_iter()
                .filter(|slot| slot.node == node.node)
                .collect();
            assert_eq!(holders.len(), 1);
            assert_eq!(holders[0].field, edge.field);
            assert_eq!(holders[0].index, edge.index);
        }
        assert_eq!(graph.get_parent(graph.root()).unwrap(), None);
    }

    #[test]
    fn test_unknown_id() {
        let graph = CodeGraph::from_source(SAMPLE).unwrap();
        let missing = SyntaxId::new(graph.generation(), 10_000);
        assert!(matches!(graph.ast_node(missing), Err(Error::NodeNotFound(_))));
    }

    #[test]
    fn test_tokens_match_tree_after_edit() {
        let mut graph = CodeGraph::from_source(SAMPLE).unwrap();

        graph
            .edit(|ast| {
                let target = ast.name("w", ExprContext::Store);
                let value = ast.name("z", ExprContext::Load);
                let stmt = ast.add(NodeKind::Assign { targets: vec![target], value });
                ast.push_statement(stmt);
            })
            .unwrap();

        let pairs: HashSet<_> = graph
            .tokens()
            .iter()
            .map(|t| (t.name.clone(), t.scope))
            .collect();
        assert!(pairs.contains(&("w".to_string(), ScopeId::root())));
        assert!(graph.lookup(ScopeId::root(), "z").unwrap().has_read());
        assert_eq!(graph.generation(), 1);
        for occurrence in graph.occurrences() {
            assert!(graph.ast_node(occurrence.node).is_ok());
        }
    }

    #[test]
    fn test_failed_refresh_keeps_previous_generation() {
        let mut graph = CodeGraph::from_source(SAMPLE).unwrap();
        let call = graph.find_calls("f")[0];

        let result = graph.edit(|ast| {
            let first = ast.body()[0];
            ast.push_statement(first);
        });

        assert!(matches!(result, Err(Error::SharedNode(_))));
        assert_eq!(graph.generation(), 0);
        assert_eq!(graph.root().generation, 0);
        assert_eq!(graph.ast_node(call).unwrap().kind.name(), "Call");
        assert_eq!(graph.stats().generation, 0);
    }

    #[test]
    fn test_context_markers() {
        let graph = CodeGraph::from_source(SAMPLE).unwrap();
        assert_eq!(graph.load_node(), ExprContext::Load);
        assert_eq!(graph.store_node(), ExprContext::Store);
    }

    #[test]
    fn test_to_source_round_trips_sample() {
        let graph = CodeGraph::from_source(SAMPLE).unwrap();
        assert_eq!(graph.to_source(), SAMPLE);
    }
}
