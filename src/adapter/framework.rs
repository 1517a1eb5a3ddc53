//! Core front end framework
//!
//! Defines the trait every source front end implements and the registry
//! that picks one by file extension.

use crate::ast::Ast;
use crate::{Error, Result};
use std::path::Path;

/// Trait for source front ends
///
/// A front end is responsible for:
/// 1. Identifying files it can parse
/// 2. Parsing them with tree-sitter
/// 3. Lowering the concrete tree into the [`Ast`] arena
pub trait Frontend: Send + Sync {
    /// Get the language name (for display)
    fn language_name(&self) -> &str;

    /// Get file extensions this front end handles
    fn file_extensions(&self) -> &[&str];

    /// Check if this front end can handle a file
    fn can_handle(&self, path: &Path) -> bool {
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            self.file_extensions().contains(&ext)
        } else {
            false
        }
    }

    /// Parse source text into a syntax tree
    fn parse(&self, source: &str) -> Result<Ast>;
}

/// Registry of front ends
#[derive(Default)]
pub struct FrontendRegistry {
    frontends: Vec<Box<dyn Frontend>>,
}

impl FrontendRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a front end
    pub fn register(&mut self, frontend: impl Frontend + 'static) {
        self.frontends.push(Box::new(frontend));
    }

    /// Find a front end for a file
    pub fn find(&self, path: &Path) -> Option<&dyn Frontend> {
        self.frontends
            .iter()
            .find(|f| f.can_handle(path))
            .map(|f| f.as_ref())
    }

    /// Get all registered front ends
    pub fn frontends(&self) -> &[Box<dyn Frontend>] {
        &self.frontends
    }

    /// Parse a file using the appropriate front end
    pub fn parse_file(&self, path: &Path, source: &str) -> Result<Ast> {
        match self.find(path) {
            Some(frontend) => {
                tracing::debug!(path = %path.display(), language = frontend.language_name(), "parsing");
                frontend.parse(source)
            }
            None => Err(Error::Parse(format!(
                "no front end for {}",
                path.display()
            ))),
        }
    }
}

/// Create a default registry with all built-in front ends
pub fn default_registry() -> FrontendRegistry {
    let mut registry = FrontendRegistry::new();
    registry.register(super::python::PythonFrontend);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestFrontend;

    impl Frontend for TestFrontend {
        fn language_name(&self) -> &str {
            "test"
        }
        fn file_extensions(&self) -> &[&str] {
            &["test"]
        }
        fn parse(&self, _source: &str) -> Result<Ast> {
            Ok(Ast::new())
        }
    }

    #[test]
    fn test_registry() {
        let mut registry = FrontendRegistry::new();
        registry.register(TestFrontend);

        assert!(registry.find(Path::new("foo.test")).is_some());
        assert!(registry.find(Path::new("foo.other")).is_none());
        assert!(matches!(
            registry.parse_file(Path::new("foo.other"), ""),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn test_default_registry_handles_python() {
        let registry = default_registry();
        assert!(registry.find(Path::new("pkg/mod.py")).is_some());
        assert!(registry.find(Path::new("stubs/mod.pyi")).is_some());
        assert!(registry.find(Path::new("main.rs")).is_none());
    }
}
