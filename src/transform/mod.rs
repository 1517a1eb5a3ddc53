//! Program transforms
//!
//! Each transform follows the same shape: read the current graph and build
//! a plan, failing before any mutation if a precondition does not hold;
//! then apply the plan to the tree and `refresh` the graph. Ids passed in
//! are consumed: after a transform returns they belong to an old generation.

pub mod dead_store;
pub mod extract;
pub mod inline;
mod rename;

pub use dead_store::{DeadStoreReport, remove_redundant_variables, remove_redundant_variables_with};
pub use extract::{ExtractOutcome, extract_function, extract_function_with};
pub use inline::{InlineOutcome, expand_function, expand_function_with};

use crate::ast::NodeRef;
use crate::graph::CodeGraph;
use crate::node::SyntaxId;
use crate::Result;
use serde::Serialize;

/// Non-fatal findings reported alongside a transform's result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformWarning {
    /// Several definitions precede the call; the last one was used
    AmbiguousDefinition {
        name: String,
        candidates: usize,
        chosen: SyntaxId,
    },
}

impl std::fmt::Display for TransformWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransformWarning::AmbiguousDefinition {
                name,
                candidates,
                chosen,
            } => write!(
                f,
                "{} definitions of '{}' precede the call; using the one at {}",
                candidates, name, chosen
            ),
        }
    }
}

/// Where a statement sits: its parent, the statement-list field and index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StatementSlot {
    pub parent: NodeRef,
    pub field: &'static str,
    pub index: usize,
}

/// Locate `stmt` in its parent's statement list, if it is held by one
pub(crate) fn statement_slot(graph: &CodeGraph, stmt: SyntaxId) -> Result<Option<StatementSlot>> {
    let Some(edge) = graph.edge(stmt)? else {
        return Ok(None);
    };
    let Some(index) = edge.index else {
        return Ok(None);
    };
    if graph.ast_node(edge.parent)?.kind.stmt_list(edge.field).is_none() {
        return Ok(None);
    }
    Ok(Some(StatementSlot {
        parent: graph.node_ref(edge.parent)?,
        field: edge.field,
        index,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_slot() {
        let graph = CodeGraph::from_source("x = 1\nif x:\n    y = f(x)\n").unwrap();

        let call = graph.find_calls("f")[0];
        assert_eq!(statement_slot(&graph, call).unwrap(), None);

        let assign = graph.get_parent(call).unwrap().unwrap();
        let slot = statement_slot(&graph, assign).unwrap().unwrap();
        assert_eq!(slot.field, "body");
        assert_eq!(slot.index, 0);
        assert_eq!(graph.ast()[slot.parent].kind.name(), "If");
    }
}
