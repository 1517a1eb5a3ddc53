//! Inlining: replace `target = f(args...)` with the body of `f`
//!
//! The selected definition's body is deep-copied and alpha-renamed, the
//! arguments are bound to the renamed parameters by one tuple assignment,
//! and the call is replaced by the expression the copied body returns.

use super::rename::{apply_suffix, pick_suffix, rename_set};
use super::{StatementSlot, TransformWarning, statement_slot};
use crate::ast::{Ast, ExprContext, NodeKind, NodeRef, ParamKind};
use crate::config::InlineConfig;
use crate::graph::CodeGraph;
use crate::node::SyntaxId;
use crate::{Error, Result};
use serde::Serialize;
use std::collections::BTreeSet;

/// Result of a successful inlining
#[derive(Debug, Clone, Serialize)]
pub struct InlineOutcome {
    /// Name of the inlined function
    pub callee: String,
    /// Suffix appended to renamed names
    pub suffix: String,
    /// Statements inserted before the call site (binding plus spliced body)
    pub inserted: usize,
    pub warnings: Vec<TransformWarning>,
}

/// Inline the call `call` with the default configuration
pub fn expand_function(graph: &mut CodeGraph, call: SyntaxId) -> Result<InlineOutcome> {
    expand_function_with(graph, call, &InlineConfig::default())
}

/// Inline the call `call`.
///
/// `call` must be the value of a plain assignment statement and name its
/// callee directly. The last definition of that name preceding the call is
/// used. On error the tree is left untouched.
pub fn expand_function_with(
    graph: &mut CodeGraph,
    call: SyntaxId,
    config: &InlineConfig,
) -> Result<InlineOutcome> {
    let plan = InlinePlan::new(graph, call, config)?;
    plan.apply(graph)
}

/// Everything the mutation needs, gathered while the graph is still intact
#[derive(Debug)]
struct InlinePlan {
    callee: String,
    args: Vec<NodeRef>,
    assign: NodeRef,
    slot: StatementSlot,
    params: Vec<String>,
    body: Vec<NodeRef>,
    names: BTreeSet<String>,
    suffix: String,
    warnings: Vec<TransformWarning>,
}

fn unsupported(reason: impl Into<String>) -> Error {
    Error::UnsupportedCallShape(reason.into())
}

/// Whether `node` contains a `return` outside nested definitions
fn contains_return(ast: &Ast, node: NodeRef) -> bool {
    match &ast[node].kind {
        NodeKind::Return { .. } => true,
        NodeKind::FunctionDef { .. } | NodeKind::ClassDef { .. } => false,
        kind => kind
            .children()
            .iter()
            .any(|slot| contains_return(ast, slot.node)),
    }
}

impl InlinePlan {
    fn new(graph: &CodeGraph, call: SyntaxId, config: &InlineConfig) -> Result<Self> {
        let ast = graph.ast();
        let NodeKind::Call {
            func,
            args,
            keywords,
        } = &graph.ast_node(call)?.kind
        else {
            return Err(Error::NotACall {
                id: call,
                kind: graph.ast_node(call)?.kind.name(),
            });
        };

        let NodeKind::Name { id: callee, .. } = &ast[*func].kind else {
            return Err(unsupported("callee is not a simple name"));
        };
        if !keywords.is_empty() {
            return Err(unsupported(format!("call to {} passes keyword arguments", callee)));
        }
        if args
            .iter()
            .any(|arg| matches!(ast[*arg].kind, NodeKind::Starred { .. }))
        {
            return Err(unsupported(format!("call to {} passes starred arguments", callee)));
        }

        // The call must be the whole right-hand side of `target = f(...)`
        let edge = graph
            .edge(call)?
            .ok_or_else(|| unsupported("call is not the value of an assignment"))?;
        let assign_id = edge.parent;
        if edge.field != "value"
            || !matches!(graph.ast_node(assign_id)?.kind, NodeKind::Assign { .. })
        {
            return Err(unsupported("call is not the value of an assignment"));
        }
        let slot = statement_slot(graph, assign_id)?
            .ok_or_else(|| unsupported("assignment is not held by a statement list"))?;

        let candidates: Vec<SyntaxId> = graph
            .find_function_defs(callee)
            .into_iter()
            .filter(|def| def.precedes(&call))
            .collect();
        let Some(chosen) = candidates.last().copied() else {
            return Err(Error::FunctionNotFound(callee.clone()));
        };

        let mut warnings = Vec::new();
        if candidates.len() > 1 {
            let warning = TransformWarning::AmbiguousDefinition {
                name: callee.clone(),
                candidates: candidates.len(),
                chosen,
            };
            tracing::warn!("{}", warning);
            warnings.push(warning);
        }

        let definition = graph.node_ref(chosen)?;
        let NodeKind::FunctionDef { params, body, .. } = &ast[definition].kind else {
            return Err(Error::FunctionNotFound(callee.clone()));
        };

        let params = params
            .iter()
            .map(|param| match &ast[*param].kind {
                NodeKind::Param {
                    name,
                    kind: ParamKind::Positional,
                    ..
                } => Ok(name.clone()),
                _ => Err(unsupported(format!(
                    "{} takes variadic or keyword-only parameters",
                    callee
                ))),
            })
            .collect::<Result<Vec<_>>>()?;

        match body.split_last() {
            Some((last, rest))
                if matches!(ast[*last].kind, NodeKind::Return { value: Some(_) })
                    && !rest.iter().any(|stmt| contains_return(ast, *stmt)) => {}
            _ => {
                return Err(unsupported(format!(
                    "body of {} must end in its only `return <expr>`",
                    callee
                )));
            }
        }

        if params.len() != args.len() {
            return Err(Error::ArityMismatch {
                name: callee.clone(),
                params: params.len(),
                args: args.len(),
            });
        }

        let names = rename_set(ast, definition, config.rename);
        let suffix = pick_suffix(&config.suffix, &names, &ast.identifiers());

        tracing::debug!(
            callee = %callee,
            definition = %chosen,
            suffix = %suffix,
            renamed = names.len(),
            "planned inlining"
        );

        Ok(Self {
            callee: callee.clone(),
            args: args.clone(),
            assign: graph.node_ref(assign_id)?,
            slot,
            params,
            body: body.clone(),
            names,
            suffix,
            warnings,
        })
    }

    fn apply(self, graph: &mut CodeGraph) -> Result<InlineOutcome> {
        let ast = graph.ast_mut();

        // (p1_new, p2_new, ...) = (arg1, arg2, ...), moving the arguments
        let targets = self
            .params
            .iter()
            .map(|param| ast.name(format!("{}{}", param, self.suffix), ExprContext::Store))
            .collect();
        let target = ast.add(NodeKind::Tuple {
            elts: targets,
            ctx: ExprContext::Store,
        });
        let value = ast.add(NodeKind::Tuple {
            elts: self.args,
            ctx: ExprContext::Load,
        });
        let binding = ast.add(NodeKind::Assign {
            targets: vec![target],
            value,
        });

        let mut copies: Vec<NodeRef> = self.body.iter().map(|stmt| ast.deep_copy(*stmt)).collect();
        for copy in &copies {
            apply_suffix(ast, *copy, &self.names, &self.suffix);
        }
        let returned = match copies.pop().map(|last| &ast[last].kind) {
            Some(NodeKind::Return { value: Some(value) }) => *value,
            _ => return Err(unsupported("inlined body lost its return")),
        };

        if let NodeKind::Assign { value, .. } = ast.kind_mut(self.assign) {
            *value = returned;
        }

        let inserted = copies.len() + 1;
        let list = ast
            .stmt_list_mut(self.slot.parent, self.slot.field)
            .ok_or_else(|| unsupported("assignment is not held by a statement list"))?;
        let index = self.slot.index;
        list.splice(index..index, std::iter::once(binding).chain(copies));

        graph.refresh()?;

        tracing::info!(
            callee = %self.callee,
            suffix = %self.suffix,
            inserted,
            "inlined call"
        );

        Ok(InlineOutcome {
            callee: self.callee,
            suffix: self.suffix,
            inserted,
            warnings: self.warnings,
        })
    }
}
