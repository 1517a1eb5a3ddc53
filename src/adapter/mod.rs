//! Source front ends
//!
//! Each front end parses source text with a tree-sitter grammar and lowers
//! the concrete tree into the [`Ast`](crate::ast::Ast) arena. The graph and
//! the transforms never see tree-sitter types.

pub mod framework;
pub mod python;

pub use framework::{Frontend, FrontendRegistry, default_registry};
pub use python::PythonFrontend;
