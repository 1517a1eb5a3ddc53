//! Outlining: move a statement range into a new function
//!
//! Names whose first occurrence in the range is a read become parameters,
//! in order of first appearance. The range must end in either an
//! assignment to one name (which the new function returns) or a call
//! statement.

use crate::ast::{ExprContext, NodeKind, NodeRef, ParamKind};
use crate::config::ExtractConfig;
use crate::graph::CodeGraph;
use crate::node::SyntaxId;
use crate::{Error, Result};
use serde::Serialize;
use std::collections::HashSet;

/// Result of a successful outlining
#[derive(Debug, Clone, Serialize)]
pub struct ExtractOutcome {
    /// Name of the synthesized function
    pub function: String,
    /// Parameters in first-read order
    pub params: Vec<String>,
    /// Name assigned from the call, when the range ended in an assignment
    pub returns: Option<String>,
}

/// Outline `body[start..=end]` of `parent` with the default configuration
pub fn extract_function(
    graph: &mut CodeGraph,
    parent: SyntaxId,
    start: usize,
    end: usize,
) -> Result<ExtractOutcome> {
    extract_function_with(graph, parent, start, end, &ExtractConfig::default())
}

/// Outline `body[start..=end]` of `parent`. Both bounds are inclusive.
pub fn extract_function_with(
    graph: &mut CodeGraph,
    parent: SyntaxId,
    start: usize,
    end: usize,
    config: &ExtractConfig,
) -> Result<ExtractOutcome> {
    let parent_ref = graph.node_ref(parent)?;
    let kind = &graph.ast_node(parent)?.kind;
    let Some(body) = kind.stmt_list("body") else {
        return Err(Error::NoStatementBody {
            id: parent,
            kind: kind.name(),
        });
    };
    if start >= end {
        return Err(Error::InvalidRange { start, end });
    }
    if end >= body.len() {
        return Err(Error::IndexOutOfRange {
            index: end,
            len: body.len(),
        });
    }

    let ast = graph.ast();
    let returns = match &ast[body[end]].kind {
        NodeKind::Assign { targets, .. } => match targets.as_slice() {
            [target] => match &ast[*target].kind {
                NodeKind::Name { id, .. } => Some(id.clone()),
                _ => return Err(Error::UnsupportedEndStatement("assignment to a non-name target")),
            },
            _ => return Err(Error::UnsupportedEndStatement("chained assignment")),
        },
        NodeKind::Expr { value } if matches!(ast[*value].kind, NodeKind::Call { .. }) => None,
        other => return Err(Error::UnsupportedEndStatement(other.name())),
    };

    let mut seen = HashSet::new();
    let mut params = Vec::new();
    for node in body[start..=end].iter().flat_map(|stmt| ast.preorder(*stmt)) {
        if let NodeKind::Name { id, ctx } = &ast[node].kind {
            if seen.insert(id.clone()) && *ctx == ExprContext::Load {
                params.push(id.clone());
            }
        }
    }

    let function = config.function_name.clone();
    tracing::debug!(
        function = %function,
        start,
        end,
        params = ?params,
        "planned extraction"
    );

    let ast = graph.ast_mut();
    let mut moved: Vec<NodeRef> = ast
        .stmt_list_mut(parent_ref, "body")
        .map(|list| list.drain(start..=end).collect())
        .unwrap_or_default();

    if let Some(name) = &returns {
        let value = ast.name(name.clone(), ExprContext::Load);
        moved.push(ast.add(NodeKind::Return { value: Some(value) }));
    }

    let param_nodes = params
        .iter()
        .map(|name| {
            ast.add(NodeKind::Param {
                name: name.clone(),
                kind: ParamKind::Positional,
                annotation: None,
                default: None,
            })
        })
        .collect();
    let definition = ast.add(NodeKind::FunctionDef {
        name: function.clone(),
        params: param_nodes,
        body: moved,
        decorators: Vec::new(),
        returns: None,
    });

    let func = ast.name(function.clone(), ExprContext::Load);
    let args = params
        .iter()
        .map(|name| ast.name(name.clone(), ExprContext::Load))
        .collect();
    let call = ast.add(NodeKind::Call {
        func,
        args,
        keywords: Vec::new(),
    });
    let site = match &returns {
        Some(name) => {
            let target = ast.name(name.clone(), ExprContext::Store);
            ast.add(NodeKind::Assign {
                targets: vec![target],
                value: call,
            })
        }
        None => ast.add(NodeKind::Expr { value: call }),
    };

    if let Some(list) = ast.stmt_list_mut(parent_ref, "body") {
        list.splice(start..start, [definition, site]);
    }

    graph.refresh()?;

    tracing::info!(
        function = %function,
        params = params.len(),
        statements = end - start + 1,
        "extracted function"
    );

    Ok(ExtractOutcome {
        function,
        params,
        returns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn function_id(graph: &CodeGraph, name: &str) -> SyntaxId {
        graph.find_function_defs(name)[0]
    }

    #[test]
    fn test_extract_module_range() {
        let source = "a = 1\nb = 2\nt = a + 1\nc = t + b\nprint(c)\n";
        let mut graph = CodeGraph::from_source(source).unwrap();
        let root = graph.root();

        let outcome = extract_function(&mut graph, root, 2, 3).unwrap();

        assert_eq!(outcome.function, "extracted_function");
        assert_eq!(outcome.params, vec!["a", "b"]);
        assert_eq!(outcome.returns.as_deref(), Some("c"));
        assert_eq!(
            graph.to_source(),
            "a = 1\nb = 2\ndef extracted_function(a, b):\n    t = a + 1\n    c = t + b\n    return c\nc = extracted_function(a, b)\nprint(c)\n"
        );
    }

    #[test]
    fn test_extract_within_function() {
        let source = "def main(a, b):\n    s = a * 2\n    c = s + b\n    return c\n";
        let mut graph = CodeGraph::from_source(source).unwrap();
        let main = function_id(&graph, "main");

        let outcome = extract_function(&mut graph, main, 0, 1).unwrap();

        assert_eq!(outcome.params, vec!["a", "b"]);
        assert_eq!(
            graph.to_source(),
            "def main(a, b):\n    def extracted_function(a, b):\n        s = a * 2\n        c = s + b\n        return c\n    c = extracted_function(a, b)\n    return c\n"
        );
    }

    #[test]
    fn test_extract_ending_in_call() {
        let source = "x = 1\nlog(x)\nshow(x)\n";
        let mut graph = CodeGraph::from_source(source).unwrap();
        let root = graph.root();
        let config = ExtractConfig {
            function_name: "report".to_string(),
        };

        let outcome = extract_function_with(&mut graph, root, 1, 2, &config).unwrap();

        assert_eq!(outcome.returns, None);
        assert_eq!(outcome.params, vec!["log", "x", "show"]);
        assert_eq!(
            graph.to_source(),
            "x = 1\ndef report(log, x, show):\n    log(x)\n    show(x)\nreport(log, x, show)\n"
        );
    }

    #[test]
    fn test_extract_preconditions() {
        let source = "a = 1\nb = a\nreturn_value = b\nfor i in a:\n    pass\n";
        let mut graph = CodeGraph::from_source(source).unwrap();
        let root = graph.root();

        assert!(matches!(
            extract_function(&mut graph, root, 1, 1),
            Err(Error::InvalidRange { start: 1, end: 1 })
        ));
        assert!(matches!(
            extract_function(&mut graph, root, 0, 9),
            Err(Error::IndexOutOfRange { index: 9, len: 4 })
        ));
        assert!(matches!(
            extract_function(&mut graph, root, 1, 3),
            Err(Error::UnsupportedEndStatement("For"))
        ));

        let assign = graph.ast().body()[0];
        let assign = graph.syntax_id(assign).unwrap();
        assert!(matches!(
            extract_function(&mut graph, assign, 0, 1),
            Err(Error::NoStatementBody { kind: "Assign", .. })
        ));

        assert_eq!(graph.generation(), 0);
        assert_eq!(graph.to_source(), source);
    }
}
