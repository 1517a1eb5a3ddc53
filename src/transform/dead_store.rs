//! Dead-store elimination
//!
//! Removes assignments `name = value` whose target is never read. A pass
//! first collects every redundant assignment from the token table, then
//! deletes them from their statement lists and refreshes the graph.

use crate::ast::{ExprContext, NodeKind, NodeRef};
use crate::config::{DeadStoreConfig, Liveness};
use crate::graph::CodeGraph;
use crate::scope::NameToken;
use crate::Result;
use serde::Serialize;
use std::collections::BTreeMap;

/// Summary of a dead-store run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeadStoreReport {
    /// Names whose assignments were removed, sorted and unique
    pub removed: Vec<String>,
    /// Number of assignment statements deleted
    pub statements: usize,
    /// Passes run, including the final one that found nothing when
    /// iterating to a fixed point
    pub passes: usize,
}

impl DeadStoreReport {
    pub fn is_empty(&self) -> bool {
        self.statements == 0
    }
}

/// Remove redundant assignments with the default configuration
pub fn remove_redundant_variables(graph: &mut CodeGraph) -> Result<DeadStoreReport> {
    remove_redundant_variables_with(graph, &DeadStoreConfig::default())
}

/// Remove redundant assignments. The graph is refreshed after every pass.
pub fn remove_redundant_variables_with(
    graph: &mut CodeGraph,
    config: &DeadStoreConfig,
) -> Result<DeadStoreReport> {
    let mut report = DeadStoreReport::default();
    loop {
        let removed = sweep(graph, config.liveness)?;
        report.passes += 1;
        report.statements += removed.len();
        let done = removed.is_empty() || !config.fixed_point;
        report.removed.extend(removed);
        if done {
            break;
        }
    }
    report.removed.sort();
    report.removed.dedup();

    tracing::info!(
        statements = report.statements,
        passes = report.passes,
        "removed redundant assignments"
    );
    Ok(report)
}

/// A token is used when it is read or deleted; `del x` needs `x` bound
fn is_used(graph: &CodeGraph, token: &NameToken) -> bool {
    token.has_read()
        || token.writes().any(|write| {
            graph.ast_node(write.node).is_ok_and(|node| {
                matches!(node.kind, NodeKind::Name { ctx: ExprContext::Del, .. })
            })
        })
}

fn is_live(graph: &CodeGraph, token: &NameToken, liveness: Liveness) -> bool {
    match liveness {
        Liveness::Global => graph
            .resolution()
            .tokens_named(&token.name)
            .any(|t| is_used(graph, t)),
        Liveness::Scoped => graph
            .scopes()
            .descendants(token.scope)
            .into_iter()
            .any(|scope| graph.lookup(scope, &token.name).is_some_and(|t| is_used(graph, t))),
    }
}

/// One collect-then-delete pass; returns the name of every deleted assignment
fn sweep(graph: &mut CodeGraph, liveness: Liveness) -> Result<Vec<String>> {
    // (parent, field) -> [(index, name)]
    let mut doomed: BTreeMap<(NodeRef, &'static str), Vec<(usize, String)>> = BTreeMap::new();

    for token in graph.tokens() {
        if is_live(graph, token, liveness) {
            continue;
        }
        for write in token.writes() {
            let Some(edge) = graph.edge(write.node)? else {
                continue;
            };
            if edge.field != "targets" {
                continue;
            }
            let NodeKind::Assign { targets, .. } = &graph.ast_node(edge.parent)?.kind else {
                continue;
            };
            if targets.len() != 1 {
                continue;
            }
            let Some(slot) = super::statement_slot(graph, edge.parent)? else {
                continue;
            };
            tracing::debug!(name = %token.name, scope = %token.scope, "redundant assignment");
            doomed
                .entry((slot.parent, slot.field))
                .or_default()
                .push((slot.index, token.name.clone()));
        }
    }

    let ast = graph.ast_mut();
    let mut removed = Vec::new();
    for ((parent, field), mut entries) in doomed {
        entries.sort_by(|a, b| b.0.cmp(&a.0));
        let needs_pass = ast[parent].kind.requires_statements(field);
        let Some(list) = ast.stmt_list_mut(parent, field) else {
            continue;
        };
        for (index, name) in entries {
            list.remove(index);
            removed.push(name);
        }
        if needs_pass && list.is_empty() {
            let pass = ast.add(NodeKind::Pass);
            if let Some(list) = ast.stmt_list_mut(parent, field) {
                list.push(pass);
            }
        }
    }

    graph.refresh()?;
    Ok(removed)
}
