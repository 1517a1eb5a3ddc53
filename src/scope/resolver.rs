//! Token Resolver - groups name references by lexical scope
//!
//! Resolution algorithm:
//! 1. Walk the tree once in pre-order, threading the current scope
//! 2. On a function definition or lambda, open a scope for its parameter
//!    names and body. Decorators, parameter defaults and annotations are
//!    evaluated when the function is defined, so they stay in the
//!    enclosing scope.
//! 3. For every parameter and name reference, look up or create the token
//!    for (name, current scope) and append the node to its occurrences
//!
//! There is no lookup through enclosing scopes: a name read inside a
//! function and bound at module level yields two distinct tokens.

use super::graph::{ScopeId, ScopeKind, ScopeTree};
use crate::ast::{Ast, ExprContext, NodeKind, NodeRef};
use crate::node::SyntaxId;
use crate::store::NodeStore;
use serde::Serialize;
use std::collections::HashMap;

/// Whether an occurrence reads or binds its name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    /// Load context: the value is read
    Read,
    /// Store/delete context, or a parameter declaration
    Write,
}

impl Access {
    pub fn as_str(&self) -> &'static str {
        match self {
            Access::Read => "read",
            Access::Write => "write",
        }
    }

    pub fn is_read(&self) -> bool {
        matches!(self, Access::Read)
    }
}

impl From<ExprContext> for Access {
    fn from(ctx: ExprContext) -> Self {
        match ctx {
            ExprContext::Load => Access::Read,
            ExprContext::Store | ExprContext::Del => Access::Write,
        }
    }
}

impl std::fmt::Display for Access {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identifier of a token within one graph generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TokenId(pub u32);

/// One reference to a token at a specific node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Occurrence {
    pub token: TokenId,
    pub node: SyntaxId,
    pub access: Access,
}

/// The resolved identity of a name within one scope
#[derive(Debug, Clone, Serialize)]
pub struct NameToken {
    pub id: TokenId,
    pub name: String,
    pub scope: ScopeId,
    /// Occurrences in pre-order
    pub occurrences: Vec<Occurrence>,
}

impl NameToken {
    /// Stable display key, `stx_{name}_{scope}`
    pub fn key(&self) -> String {
        format!("stx_{}_{}", self.name, self.scope.0)
    }

    pub fn reads(&self) -> impl Iterator<Item = &Occurrence> {
        self.occurrences.iter().filter(|o| o.access.is_read())
    }

    pub fn writes(&self) -> impl Iterator<Item = &Occurrence> {
        self.occurrences.iter().filter(|o| !o.access.is_read())
    }

    pub fn has_read(&self) -> bool {
        self.reads().next().is_some()
    }
}

/// Output of one resolver pass
#[derive(Debug, Default)]
pub struct Resolution {
    scopes: ScopeTree,
    /// scope → name → token
    lookup: HashMap<ScopeId, HashMap<String, TokenId>>,
    /// Flattened token table, indexed by `TokenId`
    tokens: Vec<NameToken>,
    by_node: HashMap<SyntaxId, TokenId>,
}

impl Resolution {
    pub fn scopes(&self) -> &ScopeTree {
        &self.scopes
    }

    pub fn tokens(&self) -> &[NameToken] {
        &self.tokens
    }

    pub fn token(&self, id: TokenId) -> Option<&NameToken> {
        self.tokens.get(id.0 as usize)
    }

    /// Token for (name, scope), without walking enclosing scopes
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<&NameToken> {
        self.lookup
            .get(&scope)
            .and_then(|names| names.get(name))
            .and_then(|id| self.token(*id))
    }

    /// All tokens of one scope
    pub fn tokens_in(&self, scope: ScopeId) -> Vec<&NameToken> {
        self.tokens.iter().filter(|t| t.scope == scope).collect()
    }

    /// Tokens spelling `name`, across all scopes
    pub fn tokens_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a NameToken> + 'a {
        self.tokens.iter().filter(move |t| t.name == name)
    }

    /// Token a name or parameter node was recorded against
    pub fn token_of(&self, node: SyntaxId) -> Option<&NameToken> {
        self.by_node.get(&node).and_then(|id| self.token(*id))
    }

    pub fn occurrences(&self) -> impl Iterator<Item = &Occurrence> {
        self.tokens.iter().flat_map(|t| t.occurrences.iter())
    }
}

/// Explicit traversal context threaded through the resolver
#[derive(Debug, Clone, Copy)]
struct Context {
    scope: ScopeId,
}

struct TokenResolver<'a> {
    ast: &'a Ast,
    store: &'a NodeStore,
    out: Resolution,
}

/// Build scopes and tokens for the tree indexed by `store`
pub fn resolve(ast: &Ast, store: &NodeStore) -> Resolution {
    let Some(root) = store.root() else {
        return Resolution::default();
    };

    let mut resolver = TokenResolver {
        ast,
        store,
        out: Resolution {
            scopes: ScopeTree::new(root.id),
            ..Resolution::default()
        },
    };
    resolver.out.lookup.insert(ScopeId::root(), HashMap::new());
    resolver.visit(root.node, Context { scope: ScopeId::root() });
    resolver.out
}

impl TokenResolver<'_> {
    fn visit(&mut self, node: NodeRef, cx: Context) {
        let Some(id) = self.store.syntax_id(node) else {
            return;
        };
        let ast = self.ast;
        let kind = &ast[node].kind;

        match kind {
            NodeKind::Name { id: name, ctx } => self.record(name, cx.scope, id, Access::from(*ctx)),
            NodeKind::Param { name, .. } => self.record(name, cx.scope, id, Access::Write),
            _ => {}
        }

        let inner = match kind {
            NodeKind::FunctionDef { name, .. } => {
                self.open(cx, ScopeKind::Function, name.clone(), id)
            }
            NodeKind::Lambda { .. } => self.open(cx, ScopeKind::Lambda, "<lambda>".to_string(), id),
            _ => {
                for slot in kind.children() {
                    self.visit(slot.node, cx);
                }
                return;
            }
        };

        for slot in kind.children() {
            match slot.field {
                "decorators" | "returns" => self.visit(slot.node, cx),
                "params" => self.visit_param(slot.node, inner, cx),
                _ => self.visit(slot.node, inner),
            }
        }
    }

    fn open(&mut self, cx: Context, kind: ScopeKind, name: String, node: SyntaxId) -> Context {
        let scope = self.out.scopes.add_scope(cx.scope, kind, name, node);
        self.out.lookup.insert(scope, HashMap::new());
        Context { scope }
    }

    /// The parameter name binds in the function's scope; its default and
    /// annotation resolve in the enclosing one
    fn visit_param(&mut self, node: NodeRef, inner: Context, outer: Context) {
        let Some(id) = self.store.syntax_id(node) else {
            return;
        };
        let ast = self.ast;
        let kind = &ast[node].kind;
        let NodeKind::Param { name, .. } = kind else {
            self.visit(node, inner);
            return;
        };
        self.record(name, inner.scope, id, Access::Write);
        for slot in kind.children() {
            self.visit(slot.node, outer);
        }
    }

    fn record(&mut self, name: &str, scope: ScopeId, node: SyntaxId, access: Access) {
        let names = self.out.lookup.entry(scope).or_default();
        let token = match names.get(name) {
            Some(token) => *token,
            None => {
                let token = TokenId(self.out.tokens.len() as u32);
                names.insert(name.to_string(), token);
                self.out.tokens.push(NameToken {
                    id: token,
                    name: name.to_string(),
                    scope,
                    occurrences: Vec::new(),
                });
                token
            }
        };
        self.out.tokens[token.0 as usize]
            .occurrences
            .push(Occurrence { token, node, access });
        self.out.by_node.insert(node, token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::python::parse;
    use std::collections::HashSet;

    fn resolve_source(source: &str) -> (Ast, NodeStore, Resolution) {
        let ast = parse(source).unwrap();
        let store = NodeStore::build(&ast, 0).unwrap();
        let resolution = resolve(&ast, &store);
        (ast, store, resolution)
    }

    fn accesses(token: &NameToken) -> Vec<Access> {
        token.occurrences.iter().map(|o| o.access).collect()
    }

    #[test]
    fn test_tokens_grouped_per_scope() {
        let source = "x = 1\ndef f(a):\n    x = a\n    return x\nprint(x)\n";
        let (_, _, resolution) = resolve_source(source);

        let root = ScopeId::root();
        let module_names: HashSet<_> = resolution
            .tokens_in(root)
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(module_names, HashSet::from(["x", "print"]));

        let f = resolution.scopes().children(root)[0];
        let f_names: HashSet<_> = resolution
            .tokens_in(f)
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(f_names, HashSet::from(["a", "x"]));

        let outer_x = resolution.lookup(root, "x").unwrap();
        assert_eq!(accesses(outer_x), vec![Access::Write, Access::Read]);
        let param = resolution.lookup(f, "a").unwrap();
        assert_eq!(accesses(param), vec![Access::Write, Access::Read]);
        assert_ne!(outer_x.id, resolution.lookup(f, "x").unwrap().id);
    }

    #[test]
    fn test_token_uniqueness() {
        let source = "a = b\nb = a\ndef g(a):\n    a = a + b\n    return a\nc = g(a)\n";
        let (_, _, resolution) = resolve_source(source);

        let mut seen = HashSet::new();
        for token in resolution.tokens() {
            assert!(seen.insert((token.name.clone(), token.scope)), "duplicate {}", token.key());
        }
    }

    #[test]
    fn test_occurrences_in_preorder() {
        let source = "y = 1\nz = y + y\nprint(y, z)\n";
        let (_, _, resolution) = resolve_source(source);

        for token in resolution.tokens() {
            let indices: Vec<_> = token.occurrences.iter().map(|o| o.node.index).collect();
            let mut sorted = indices.clone();
            sorted.sort();
            assert_eq!(indices, sorted, "{} out of order", token.key());
        }
        let y = resolution.lookup(ScopeId::root(), "y").unwrap();
        assert_eq!(y.occurrences.len(), 4);
        assert_eq!(y.reads().count(), 3);
    }

    #[test]
    fn test_decorators_resolve_in_enclosing_scope() {
        let source = "@cache\ndef f(n):\n    return n\n";
        let (_, store, resolution) = resolve_source(source);

        assert!(resolution.lookup(ScopeId::root(), "cache").is_some());
        let f = resolution.scopes().children(ScopeId::root())[0];
        assert!(resolution.lookup(f, "cache").is_none());
        assert!(resolution.lookup(f, "n").is_some());

        let def = store
            .nodes()
            .iter()
            .find(|n| resolution.scopes().scope_of_node(n.id) == Some(f))
            .unwrap();
        assert_eq!(resolution.scopes().get(f).unwrap().node, def.id);
    }

    #[test]
    fn test_token_of_node() {
        let (_, _, resolution) = resolve_source("v = 3\n");
        let token = resolution.lookup(ScopeId::root(), "v").unwrap();
        let occurrence = token.occurrences[0];
        assert_eq!(resolution.token_of(occurrence.node).unwrap().id, token.id);
        assert_eq!(token.key(), "stx_v_0");
    }

    #[test]
    fn test_defaults_and_annotations_resolve_in_enclosing_scope() {
        let source = "limit = 3\ndef f(n: Size = limit) -> Out:\n    return n\n";
        let (_, _, resolution) = resolve_source(source);

        let root = ScopeId::root();
        let f = resolution.scopes().children(root)[0];
        assert_eq!(accesses(resolution.lookup(root, "limit").unwrap()), vec![Access::Write, Access::Read]);
        assert!(resolution.lookup(root, "Size").is_some());
        assert!(resolution.lookup(root, "Out").is_some());
        assert!(resolution.lookup(f, "limit").is_none());
        assert!(resolution.lookup(root, "n").is_none());
        assert_eq!(accesses(resolution.lookup(f, "n").unwrap()), vec![Access::Write, Access::Read]);
    }

    #[test]
    fn test_lambda_opens_a_scope() {
        let (_, _, resolution) = resolve_source("k = 2\nscale = lambda v, w=k: v * w\n");

        let root = ScopeId::root();
        let lambda = resolution.scopes().children(root)[0];
        let scope = resolution.scopes().get(lambda).unwrap();
        assert_eq!(scope.kind, ScopeKind::Lambda);
        assert_eq!(scope.name, "<lambda>");
        assert!(resolution.lookup(lambda, "v").is_some());
        assert!(resolution.lookup(root, "v").is_none());
        assert!(resolution.lookup(root, "k").unwrap().has_read());
    }
}
