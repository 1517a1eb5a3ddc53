//! # Codemorph - structural refactoring over a mutable code graph
//!
//! Codemorph wraps a parsed Python program in a graph of syntax nodes,
//! parent edges, lexical scopes and name tokens, and rewrites the program
//! through that graph.
//!
//! Codemorph provides:
//! - An arena-backed syntax tree that transforms edit in place
//! - A node store with generation-checked ids and parent lookup
//! - Per-scope name tokens with ordered read/write occurrences
//! - Inlining (`expand_function`), outlining (`extract_function`) and
//!   dead-store elimination (`remove_redundant_variables`)
//! - A tree-sitter front end and a source printer at the boundary

pub mod ast;
pub mod node;
pub mod edge;
pub mod store;
pub mod scope;
pub mod graph;
pub mod transform;
pub mod adapter;
pub mod printer;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use ast::{Ast, ExprContext, Node, NodeKind, NodeRef};
pub use node::{SyntaxId, SyntaxNode};
pub use edge::SyntaxEdge;
pub use graph::{CodeGraph, GraphStats};
pub use scope::{Access, NameToken, Occurrence, ScopeId, TokenId};
pub use transform::{
    DeadStoreReport, ExtractOutcome, InlineOutcome, TransformWarning, expand_function,
    extract_function, remove_redundant_variables,
};

/// Result type alias for Codemorph operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Codemorph operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Node not found: {0}")]
    NodeNotFound(SyntaxId),

    #[error("Stale node id {id}: the graph has been rebuilt (generation {current})")]
    StaleNode { id: SyntaxId, current: u32 },

    #[error("Tree node {0} is reachable from more than one parent")]
    SharedNode(NodeRef),

    #[error("Node {id} is not a function call (found {kind})")]
    NotACall { id: SyntaxId, kind: &'static str },

    #[error("Unsupported call shape: {0}")]
    UnsupportedCallShape(String),

    #[error("No function definition found for {0}")]
    FunctionNotFound(String),

    #[error("Arity mismatch calling {name}: {params} parameters, {args} arguments")]
    ArityMismatch { name: String, params: usize, args: usize },

    #[error("Node {id} ({kind}) has no statement-list body")]
    NoStatementBody { id: SyntaxId, kind: &'static str },

    #[error("Invalid range: start {start} should be smaller than end {end}")]
    InvalidRange { start: usize, end: usize },

    #[error("Index {index} out of range for a body of {len} statements")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("End node must be an assignment or a call, found {0}")]
    UnsupportedEndStatement(&'static str),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
