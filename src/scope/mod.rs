//! Scopes and name tokens
//!
//! Codemorph groups every name reference of the tree by the lexical scope it
//! appears in. The module body and each function definition open a scope;
//! within a scope, all references spelling the same name share one token.

pub mod graph;
pub mod resolver;

pub use graph::{Scope, ScopeId, ScopeKind, ScopeTree};
pub use resolver::{Access, NameToken, Occurrence, Resolution, TokenId, resolve};
