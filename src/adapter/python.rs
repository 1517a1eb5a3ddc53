//! Python front end
//!
//! Parses Python source with tree-sitter and lowers the concrete syntax
//! tree into the [`Ast`] arena. Comments are dropped. Constructs without a
//! dedicated node kind are kept as [`NodeKind::Other`] with their
//! subexpressions lowered; only compound statements outside the supported
//! set are reported as parse errors.

use super::framework::Frontend;
use crate::ast::{Ast, CompKind, Constant, ExprContext, NodeKind, NodeRef, ParamKind};
use crate::{Error, Result};
use tree_sitter::{Node, Parser};

/// Python front end
pub struct PythonFrontend;

impl Frontend for PythonFrontend {
    fn language_name(&self) -> &str {
        "Python"
    }

    fn file_extensions(&self) -> &[&str] {
        &["py", "pyi"]
    }

    fn parse(&self, source: &str) -> Result<Ast> {
        parse(source)
    }
}

/// Parse Python source into a syntax tree
pub fn parse(source: &str) -> Result<Ast> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| Error::Parse(format!("Failed to load Python grammar: {}", e)))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| Error::Parse("Failed to parse source".to_string()))?;
    let root = tree.root_node();

    if root.has_error() {
        let line = first_error(root).map(row).unwrap_or(1);
        return Err(Error::Parse(format!("syntax error at line {}", line)));
    }

    let mut lowering = Lowering {
        source,
        ast: Ast::new(),
    };
    let body = lowering.statements(root)?;
    let module = lowering.ast.root();
    if let Some(list) = lowering.ast.stmt_list_mut(module, "body") {
        *list = body;
    }
    Ok(lowering.ast)
}

fn row(node: Node<'_>) -> u32 {
    node.start_position().row as u32 + 1
}

fn first_error<'t>(node: Node<'t>) -> Option<Node<'t>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'t>> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}

fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| !child.is_extra())
        .collect()
}

fn first_named<'t>(node: Node<'t>) -> Result<Node<'t>> {
    named_children(node)
        .into_iter()
        .next()
        .ok_or_else(|| unsupported(node))
}

fn field<'t>(node: Node<'t>, name: &str) -> Result<Node<'t>> {
    node.child_by_field_name(name).ok_or_else(|| {
        Error::Parse(format!(
            "missing '{}' in {} at line {}",
            name,
            node.kind(),
            row(node)
        ))
    })
}

fn unsupported(node: Node<'_>) -> Error {
    Error::Parse(format!(
        "unsupported syntax '{}' at line {}",
        node.kind(),
        row(node)
    ))
}

/// Interpolated expressions of a (possibly concatenated) string literal in
/// source order, including those nested in format specifiers (`{x:{w}}`)
fn interpolations<'t>(node: Node<'t>, out: &mut Vec<Node<'t>>) {
    for child in named_children(node) {
        match child.kind() {
            "interpolation" | "format_expression" => {
                if let Some(expression) = child.child_by_field_name("expression") {
                    out.push(expression);
                }
                if let Some(spec) = child.child_by_field_name("format_specifier") {
                    interpolations(spec, out);
                }
            }
            _ => interpolations(child, out),
        }
    }
}

/// Whether a statement owns an indented block
fn is_compound(node: Node<'_>) -> bool {
    named_children(node)
        .iter()
        .any(|child| child.kind() == "block" || child.kind().ends_with("_clause"))
}

fn is_async(node: Node<'_>) -> bool {
    node.child(0).is_some_and(|c| c.kind() == "async")
}

struct Lowering<'s> {
    source: &'s str,
    ast: Ast,
}

impl<'s> Lowering<'s> {
    fn text(&self, node: Node<'_>) -> Result<&'s str> {
        node.utf8_text(self.source.as_bytes())
            .map_err(|e| Error::Parse(e.to_string()))
    }

    fn add(&mut self, kind: NodeKind, node: Node<'_>) -> NodeRef {
        self.ast.add_at(kind, Some(row(node)))
    }

    fn raw(&mut self, node: Node<'_>) -> Result<NodeRef> {
        let text = self.text(node)?.to_string();
        Ok(self.add(NodeKind::Raw { text }, node))
    }

    fn statements(&mut self, node: Node<'_>) -> Result<Vec<NodeRef>> {
        named_children(node)
            .into_iter()
            .map(|child| self.statement(child))
            .collect()
    }

    fn block(&mut self, node: Option<Node<'_>>) -> Result<Vec<NodeRef>> {
        match node {
            Some(block) => self.statements(block),
            None => Ok(Vec::new()),
        }
    }

    fn else_block(&mut self, node: Option<Node<'_>>) -> Result<Vec<NodeRef>> {
        match node {
            Some(clause) => self.block(clause.child_by_field_name("body")),
            None => Ok(Vec::new()),
        }
    }

    fn statement(&mut self, node: Node<'_>) -> Result<NodeRef> {
        match node.kind() {
            "expression_statement" => {
                let children = named_children(node);
                match children.as_slice() {
                    [single] if single.kind() == "assignment" => self.assignment(*single, node),
                    [single] if single.kind() == "augmented_assignment" => {
                        self.aug_assignment(*single, node)
                    }
                    [single] => {
                        let value = self.expr(*single, ExprContext::Load)?;
                        Ok(self.add(NodeKind::Expr { value }, node))
                    }
                    many => {
                        let elts = many
                            .iter()
                            .map(|child| self.expr(*child, ExprContext::Load))
                            .collect::<Result<Vec<_>>>()?;
                        let value = self.add(
                            NodeKind::Tuple {
                                elts,
                                ctx: ExprContext::Load,
                            },
                            node,
                        );
                        Ok(self.add(NodeKind::Expr { value }, node))
                    }
                }
            }
            "return_statement" => {
                let value = match named_children(node).first() {
                    Some(value) => Some(self.expr(*value, ExprContext::Load)?),
                    None => None,
                };
                Ok(self.add(NodeKind::Return { value }, node))
            }
            "pass_statement" => Ok(self.add(NodeKind::Pass, node)),
            "break_statement" => Ok(self.add(NodeKind::Break, node)),
            "continue_statement" => Ok(self.add(NodeKind::Continue, node)),
            "if_statement" => self.if_statement(node),
            "while_statement" => {
                let test = self.expr(field(node, "condition")?, ExprContext::Load)?;
                let body = self.block(node.child_by_field_name("body"))?;
                let orelse = self.else_block(node.child_by_field_name("alternative"))?;
                Ok(self.add(NodeKind::While { test, body, orelse }, node))
            }
            "for_statement" => {
                if is_async(node) {
                    return Err(unsupported(node));
                }
                let target = self.expr(field(node, "left")?, ExprContext::Store)?;
                let iter = self.expr(field(node, "right")?, ExprContext::Load)?;
                let body = self.block(node.child_by_field_name("body"))?;
                let orelse = self.else_block(node.child_by_field_name("alternative"))?;
                Ok(self.add(
                    NodeKind::For {
                        target,
                        iter,
                        body,
                        orelse,
                    },
                    node,
                ))
            }
            "function_definition" => self.function(node, Vec::new()),
            "class_definition" => self.class(node, Vec::new()),
            "decorated_definition" => {
                let decorators = named_children(node)
                    .into_iter()
                    .filter(|child| child.kind() == "decorator")
                    .map(|decorator| {
                        let inner = first_named(decorator)?;
                        self.expr(inner, ExprContext::Load)
                    })
                    .collect::<Result<Vec<_>>>()?;
                let definition = field(node, "definition")?;
                match definition.kind() {
                    "function_definition" => self.function(definition, decorators),
                    "class_definition" => self.class(definition, decorators),
                    _ => Err(unsupported(definition)),
                }
            }
            "raise_statement" => {
                let cause_node = node.child_by_field_name("cause");
                let exc = match named_children(node)
                    .into_iter()
                    .find(|child| Some(*child) != cause_node)
                {
                    Some(exc) => Some(self.expr(exc, ExprContext::Load)?),
                    None => None,
                };
                let cause = match cause_node {
                    Some(cause) => Some(self.expr(cause, ExprContext::Load)?),
                    None => None,
                };
                Ok(self.add(NodeKind::Raise { exc, cause }, node))
            }
            "assert_statement" => {
                let children = named_children(node);
                let Some((test, rest)) = children.split_first() else {
                    return Err(unsupported(node));
                };
                let test = self.expr(*test, ExprContext::Load)?;
                let msg = match rest.first() {
                    Some(msg) => Some(self.expr(*msg, ExprContext::Load)?),
                    None => None,
                };
                Ok(self.add(NodeKind::Assert { test, msg }, node))
            }
            "delete_statement" => {
                let operand = first_named(node)?;
                let targets = if operand.kind() == "expression_list" {
                    self.exprs(operand, ExprContext::Del)?
                } else {
                    vec![self.expr(operand, ExprContext::Del)?]
                };
                Ok(self.add(NodeKind::Delete { targets }, node))
            }
            "try_statement" => self.try_statement(node),
            "with_statement" => self.with_statement(node),
            "import_statement"
            | "import_from_statement"
            | "future_import_statement"
            | "global_statement"
            | "nonlocal_statement" => self.raw(node),
            _ if is_compound(node) => Err(unsupported(node)),
            _ => {
                let kind = self.other(node)?;
                Ok(self.add(kind, node))
            }
        }
    }

    fn try_statement(&mut self, node: Node<'_>) -> Result<NodeRef> {
        let body = self.block(node.child_by_field_name("body"))?;
        let mut handlers = Vec::new();
        let mut orelse = Vec::new();
        let mut finalbody = Vec::new();
        let mut star = false;

        for clause in named_children(node) {
            match clause.kind() {
                "except_clause" | "except_group_clause" => {
                    star |= clause.kind() == "except_group_clause";
                    handlers.push(self.except_handler(clause)?);
                }
                "else_clause" => orelse = self.block(clause.child_by_field_name("body"))?,
                "finally_clause" => {
                    let block = named_children(clause)
                        .into_iter()
                        .find(|child| child.kind() == "block");
                    finalbody = self.block(block)?;
                }
                _ => {}
            }
        }
        Ok(self.add(
            NodeKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
                star,
            },
            node,
        ))
    }

    fn except_handler(&mut self, clause: Node<'_>) -> Result<NodeRef> {
        let children = named_children(clause);
        let block = children.iter().copied().find(|child| child.kind() == "block");
        let mut header = children.into_iter().filter(|child| child.kind() != "block");

        let (typ, name) = match (header.next(), header.next()) {
            (Some(value), _) if value.kind() == "as_pattern" => {
                let typ = self.expr(first_named(value)?, ExprContext::Load)?;
                let name = self.target(field(value, "alias")?)?;
                (Some(typ), Some(name))
            }
            (Some(value), Some(alias)) => (
                Some(self.expr(value, ExprContext::Load)?),
                Some(self.target(alias)?),
            ),
            (Some(value), None) => (Some(self.expr(value, ExprContext::Load)?), None),
            (None, _) => (None, None),
        };
        let body = self.block(block)?;
        Ok(self.add(NodeKind::ExceptHandler { typ, name, body }, clause))
    }

    fn with_statement(&mut self, node: Node<'_>) -> Result<NodeRef> {
        if is_async(node) {
            return Err(unsupported(node));
        }
        let clause = named_children(node)
            .into_iter()
            .find(|child| child.kind() == "with_clause")
            .ok_or_else(|| unsupported(node))?;

        let mut items = Vec::new();
        for item in named_children(clause) {
            let value = field(item, "value")?;
            let (context_expr, optional_vars) = if value.kind() == "as_pattern" {
                let context_expr = self.expr(first_named(value)?, ExprContext::Load)?;
                (context_expr, Some(self.target(field(value, "alias")?)?))
            } else {
                (self.expr(value, ExprContext::Load)?, None)
            };
            items.push(self.add(
                NodeKind::WithItem {
                    context_expr,
                    optional_vars,
                },
                item,
            ));
        }
        let body = self.block(node.child_by_field_name("body"))?;
        Ok(self.add(NodeKind::With { items, body }, node))
    }

    /// Lower a binding target, unwrapping the `as_pattern_target` wrapper
    fn target(&mut self, node: Node<'_>) -> Result<NodeRef> {
        let inner = if node.kind() == "as_pattern_target" {
            first_named(node)?
        } else {
            node
        };
        self.expr(inner, ExprContext::Store)
    }

    fn assignment(&mut self, node: Node<'_>, stmt: Node<'_>) -> Result<NodeRef> {
        // Annotated assignments (`x: int = 1`) carry a `type` field
        if let Some(annotation) = node.child_by_field_name("type") {
            let target = self.expr(field(node, "left")?, ExprContext::Store)?;
            let annotation = self.annotation(annotation)?;
            let value = match node.child_by_field_name("right") {
                Some(value) => Some(self.expr(value, ExprContext::Load)?),
                None => None,
            };
            return Ok(self.add(
                NodeKind::AnnAssign {
                    target,
                    annotation,
                    value,
                },
                stmt,
            ));
        }
        let mut targets = vec![self.expr(field(node, "left")?, ExprContext::Store)?];
        let mut right = field(node, "right")?;
        while right.kind() == "assignment" {
            if right.child_by_field_name("type").is_some() {
                return Err(unsupported(right));
            }
            targets.push(self.expr(field(right, "left")?, ExprContext::Store)?);
            right = field(right, "right")?;
        }
        let value = self.expr(right, ExprContext::Load)?;
        Ok(self.add(NodeKind::Assign { targets, value }, stmt))
    }

    fn aug_assignment(&mut self, node: Node<'_>, stmt: Node<'_>) -> Result<NodeRef> {
        let target = self.expr(field(node, "left")?, ExprContext::Store)?;
        let op = field(node, "operator")?.kind().to_string();
        let value = self.expr(field(node, "right")?, ExprContext::Load)?;
        Ok(self.add(NodeKind::AugAssign { target, op, value }, stmt))
    }

    fn if_statement(&mut self, node: Node<'_>) -> Result<NodeRef> {
        let test = self.expr(field(node, "condition")?, ExprContext::Load)?;
        let body = self.block(node.child_by_field_name("consequence"))?;

        let mut cursor = node.walk();
        let alternatives: Vec<Node<'_>> = node
            .children_by_field_name("alternative", &mut cursor)
            .collect();

        // Fold `elif` chains into nested `If` nodes, innermost first
        let mut orelse = Vec::new();
        for clause in alternatives.into_iter().rev() {
            match clause.kind() {
                "else_clause" => orelse = self.block(clause.child_by_field_name("body"))?,
                "elif_clause" => {
                    let test = self.expr(field(clause, "condition")?, ExprContext::Load)?;
                    let body = self.block(clause.child_by_field_name("consequence"))?;
                    let nested = self.add(
                        NodeKind::If {
                            test,
                            body,
                            orelse: std::mem::take(&mut orelse),
                        },
                        clause,
                    );
                    orelse = vec![nested];
                }
                _ => return Err(unsupported(clause)),
            }
        }
        Ok(self.add(NodeKind::If { test, body, orelse }, node))
    }

    fn function(&mut self, node: Node<'_>, decorators: Vec<NodeRef>) -> Result<NodeRef> {
        if is_async(node) {
            return Err(unsupported(node));
        }
        let name = self.text(field(node, "name")?)?.to_string();
        let params = self.parameters(node.child_by_field_name("parameters"))?;
        let returns = match node.child_by_field_name("return_type") {
            Some(annotation) => Some(self.annotation(annotation)?),
            None => None,
        };
        let body = self.block(node.child_by_field_name("body"))?;
        Ok(self.add(
            NodeKind::FunctionDef {
                name,
                params,
                body,
                decorators,
                returns,
            },
            node,
        ))
    }

    fn parameters(&mut self, node: Option<Node<'_>>) -> Result<Vec<NodeRef>> {
        match node {
            Some(list) => named_children(list)
                .into_iter()
                .map(|param| self.parameter(param))
                .collect(),
            None => Ok(Vec::new()),
        }
    }

    /// Lower one parameter. Bare `*` and `/` separators are kept as
    /// [`NodeKind::Other`].
    fn parameter(&mut self, node: Node<'_>) -> Result<NodeRef> {
        let (name_node, kind, annotation, default) = match node.kind() {
            "identifier" => (node, ParamKind::Positional, None, None),
            "list_splat_pattern" => (first_named(node)?, ParamKind::VarArgs, None, None),
            "dictionary_splat_pattern" => (first_named(node)?, ParamKind::KwArgs, None, None),
            "typed_parameter" => {
                let inner = first_named(node)?;
                let (name_node, kind) = match inner.kind() {
                    "identifier" => (inner, ParamKind::Positional),
                    "list_splat_pattern" => (first_named(inner)?, ParamKind::VarArgs),
                    "dictionary_splat_pattern" => (first_named(inner)?, ParamKind::KwArgs),
                    _ => return Err(unsupported(inner)),
                };
                (name_node, kind, node.child_by_field_name("type"), None)
            }
            "keyword_separator" | "positional_separator" => {
                let kind = self.other(node)?;
                return Ok(self.add(kind, node));
            }
            "default_parameter" => (
                field(node, "name")?,
                ParamKind::Positional,
                None,
                Some(field(node, "value")?),
            ),
            "typed_default_parameter" => (
                field(node, "name")?,
                ParamKind::Positional,
                node.child_by_field_name("type"),
                Some(field(node, "value")?),
            ),
            _ => return Err(unsupported(node)),
        };
        if name_node.kind() != "identifier" {
            return Err(unsupported(name_node));
        }

        let name = self.text(name_node)?.to_string();
        let annotation = match annotation {
            Some(annotation) => Some(self.annotation(annotation)?),
            None => None,
        };
        let default = match default {
            Some(default) => Some(self.expr(default, ExprContext::Load)?),
            None => None,
        };
        Ok(self.add(
            NodeKind::Param {
                name,
                kind,
                annotation,
                default,
            },
            node,
        ))
    }

    /// Lower the expression inside a `type` node
    fn annotation(&mut self, node: Node<'_>) -> Result<NodeRef> {
        let inner = named_children(node).into_iter().next().unwrap_or(node);
        self.expr(inner, ExprContext::Load)
    }

    fn class(&mut self, node: Node<'_>, decorators: Vec<NodeRef>) -> Result<NodeRef> {
        let name = self.text(field(node, "name")?)?.to_string();
        let bases = match node.child_by_field_name("superclasses") {
            Some(list) => {
                let (mut args, keywords) = self.arguments(list)?;
                args.extend(keywords);
                args
            }
            None => Vec::new(),
        };
        let body = self.block(node.child_by_field_name("body"))?;
        Ok(self.add(
            NodeKind::ClassDef {
                name,
                bases,
                body,
                decorators,
            },
            node,
        ))
    }

    fn exprs(&mut self, node: Node<'_>, ctx: ExprContext) -> Result<Vec<NodeRef>> {
        named_children(node)
            .into_iter()
            .map(|child| self.expr(child, ctx))
            .collect()
    }

    fn expr(&mut self, node: Node<'_>, ctx: ExprContext) -> Result<NodeRef> {
        let kind = match node.kind() {
            "identifier" => NodeKind::Name {
                id: self.text(node)?.to_string(),
                ctx,
            },
            "integer" | "float" => {
                NodeKind::Constant(Constant::Number(self.text(node)?.to_string()))
            }
            "string" | "concatenated_string" => self.string(node)?,
            "true" => NodeKind::Constant(Constant::Bool(true)),
            "false" => NodeKind::Constant(Constant::Bool(false)),
            "none" => NodeKind::Constant(Constant::None),
            "ellipsis" => NodeKind::Constant(Constant::Ellipsis),
            "parenthesized_expression" => return self.expr(first_named(node)?, ctx),
            "tuple" | "expression_list" | "pattern_list" | "tuple_pattern" => NodeKind::Tuple {
                elts: self.exprs(node, ctx)?,
                ctx,
            },
            "list" | "list_pattern" => NodeKind::List {
                elts: self.exprs(node, ctx)?,
                ctx,
            },
            "list_splat" | "list_splat_pattern" => NodeKind::Starred {
                value: self.expr(first_named(node)?, ctx)?,
                ctx,
            },
            "dictionary"
                if named_children(node)
                    .iter()
                    .any(|child| child.kind() != "pair") =>
            {
                self.other(node)?
            }
            "dictionary" => {
                let mut keys = Vec::new();
                let mut values = Vec::new();
                for pair in named_children(node) {
                    keys.push(self.expr(field(pair, "key")?, ExprContext::Load)?);
                    values.push(self.expr(field(pair, "value")?, ExprContext::Load)?);
                }
                NodeKind::Dict { keys, values }
            }
            "binary_operator" | "boolean_operator" => {
                let left = self.expr(field(node, "left")?, ExprContext::Load)?;
                let op = field(node, "operator")?.kind().to_string();
                let right = self.expr(field(node, "right")?, ExprContext::Load)?;
                NodeKind::BinOp { left, op, right }
            }
            "unary_operator" => {
                let op = field(node, "operator")?.kind().to_string();
                let operand = self.expr(field(node, "argument")?, ExprContext::Load)?;
                NodeKind::UnaryOp { op, operand }
            }
            "not_operator" => NodeKind::UnaryOp {
                op: "not".to_string(),
                operand: self.expr(field(node, "argument")?, ExprContext::Load)?,
            },
            "comparison_operator" => self.comparison(node)?,
            "conditional_expression" => match named_children(node).as_slice() {
                [body, test, orelse] => NodeKind::IfExp {
                    body: self.expr(*body, ExprContext::Load)?,
                    test: self.expr(*test, ExprContext::Load)?,
                    orelse: self.expr(*orelse, ExprContext::Load)?,
                },
                _ => return Err(unsupported(node)),
            },
            "call" => {
                let func = self.expr(field(node, "function")?, ExprContext::Load)?;
                let arguments = field(node, "arguments")?;
                // `f(x for x in xs)` has a bare generator in place of an argument list
                let (args, keywords) = if arguments.kind() == "generator_expression" {
                    (vec![self.expr(arguments, ExprContext::Load)?], Vec::new())
                } else {
                    self.arguments(arguments)?
                };
                NodeKind::Call {
                    func,
                    args,
                    keywords,
                }
            }
            "attribute" => NodeKind::Attribute {
                value: self.expr(field(node, "object")?, ExprContext::Load)?,
                attr: self.text(field(node, "attribute")?)?.to_string(),
                ctx,
            },
            "subscript" => {
                let value = self.expr(field(node, "value")?, ExprContext::Load)?;
                let mut cursor = node.walk();
                let subscripts: Vec<Node<'_>> = node
                    .children_by_field_name("subscript", &mut cursor)
                    .collect();
                let slice = match subscripts.as_slice() {
                    [single] => self.expr(*single, ExprContext::Load)?,
                    many => {
                        let elts = many
                            .iter()
                            .map(|s| self.expr(*s, ExprContext::Load))
                            .collect::<Result<Vec<_>>>()?;
                        self.add(
                            NodeKind::Tuple {
                                elts,
                                ctx: ExprContext::Load,
                            },
                            node,
                        )
                    }
                };
                NodeKind::Subscript { value, slice, ctx }
            }
            "slice" => self.slice_expr(node)?,
            "set" => NodeKind::Set {
                elts: self.exprs(node, ExprContext::Load)?,
            },
            "lambda" => {
                let params = self.parameters(node.child_by_field_name("parameters"))?;
                let body = self.expr(field(node, "body")?, ExprContext::Load)?;
                NodeKind::Lambda { params, body }
            }
            "list_comprehension" => self.comprehension(node, CompKind::List)?,
            "set_comprehension" => self.comprehension(node, CompKind::Set)?,
            "dictionary_comprehension" => self.comprehension(node, CompKind::Dict)?,
            "generator_expression" => self.comprehension(node, CompKind::Generator)?,
            "named_expression" => NodeKind::NamedExpr {
                target: self.expr(field(node, "name")?, ExprContext::Store)?,
                value: self.expr(field(node, "value")?, ExprContext::Load)?,
            },
            _ => self.other(node)?,
        };
        Ok(self.add(kind, node))
    }

    /// `lower:upper:step`, any part optional
    fn slice_expr(&mut self, node: Node<'_>) -> Result<NodeKind> {
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node
            .children(&mut cursor)
            .filter(|child| !child.is_extra())
            .collect();

        let mut parts: [Option<NodeRef>; 3] = [None, None, None];
        let mut position = 0;
        for child in children {
            if child.kind() == ":" {
                position += 1;
            } else if child.is_named() && position < parts.len() {
                parts[position] = Some(self.expr(child, ExprContext::Load)?);
            }
        }
        let [lower, upper, step] = parts;
        Ok(NodeKind::Slice { lower, upper, step })
    }

    fn comprehension(&mut self, node: Node<'_>, kind: CompKind) -> Result<NodeKind> {
        let body = field(node, "body")?;
        let mut generators = Vec::new();
        for clause in named_children(node) {
            match clause.kind() {
                "for_in_clause" => {
                    let target = self.expr(field(clause, "left")?, ExprContext::Store)?;
                    let mut cursor = clause.walk();
                    let right: Vec<Node<'_>> = clause
                        .children_by_field_name("right", &mut cursor)
                        .collect();
                    let iter = match right.as_slice() {
                        [single] => self.expr(*single, ExprContext::Load)?,
                        many => {
                            let elts = many
                                .iter()
                                .map(|r| self.expr(*r, ExprContext::Load))
                                .collect::<Result<Vec<_>>>()?;
                            self.add(
                                NodeKind::Tuple {
                                    elts,
                                    ctx: ExprContext::Load,
                                },
                                clause,
                            )
                        }
                    };
                    generators.push(self.add(
                        NodeKind::CompFor {
                            target,
                            iter,
                            ifs: Vec::new(),
                            is_async: is_async(clause),
                        },
                        clause,
                    ));
                }
                "if_clause" => {
                    let test = self.expr(first_named(clause)?, ExprContext::Load)?;
                    let Some(last) = generators.last().copied() else {
                        return Err(unsupported(clause));
                    };
                    if let NodeKind::CompFor { ifs, .. } = self.ast.kind_mut(last) {
                        ifs.push(test);
                    }
                }
                _ => {}
            }
        }

        let (elt, value) = if kind == CompKind::Dict {
            let key = self.expr(field(body, "key")?, ExprContext::Load)?;
            let value = self.expr(field(body, "value")?, ExprContext::Load)?;
            (key, Some(value))
        } else {
            (self.expr(body, ExprContext::Load)?, None)
        };
        Ok(NodeKind::Comprehension {
            kind,
            elt,
            value,
            generators,
        })
    }

    /// Keep `node` as source text, lowering every subexpression it holds
    /// so the names it reads stay visible to the resolver
    fn other(&mut self, node: Node<'_>) -> Result<NodeKind> {
        let mut pieces = Vec::new();
        let mut values = Vec::new();
        let mut cursor = node.start_byte();
        self.holes(node, &mut cursor, &mut pieces, &mut values)?;
        pieces.push(self.slice(cursor, node.end_byte())?);
        Ok(NodeKind::Other {
            kind: node.kind().to_string(),
            pieces,
            values,
        })
    }

    fn holes(
        &mut self,
        node: Node<'_>,
        cursor: &mut usize,
        pieces: &mut Vec<String>,
        values: &mut Vec<NodeRef>,
    ) -> Result<()> {
        let mut walker = node.walk();
        if !walker.goto_first_child() {
            return Ok(());
        }
        loop {
            let child = walker.node();
            // Keyword names (`f(key=...)`) are labels, not references
            let label = walker.field_name() == Some("name") && node.kind() == "keyword_argument";
            if child.is_named() && !child.is_extra() && !label {
                if child.kind() == "identifier" || child.named_child_count() > 0 {
                    pieces.push(self.slice(*cursor, child.start_byte())?);
                    values.push(self.expr(child, ExprContext::Load)?);
                    *cursor = child.end_byte();
                }
            }
            if !walker.goto_next_sibling() {
                break;
            }
        }
        Ok(())
    }

    fn string(&mut self, node: Node<'_>) -> Result<NodeKind> {
        let mut parts = Vec::new();
        interpolations(node, &mut parts);
        if parts.is_empty() {
            return Ok(NodeKind::Constant(Constant::Str(self.text(node)?.to_string())));
        }

        let mut pieces = Vec::with_capacity(parts.len() + 1);
        let mut values = Vec::with_capacity(parts.len());
        let mut cursor = node.start_byte();
        for expression in parts {
            pieces.push(self.slice(cursor, expression.start_byte())?);
            values.push(self.expr(expression, ExprContext::Load)?);
            cursor = expression.end_byte();
        }
        pieces.push(self.slice(cursor, node.end_byte())?);
        Ok(NodeKind::FormattedStr { pieces, values })
    }

    fn slice(&self, start: usize, end: usize) -> Result<String> {
        self.source
            .get(start..end)
            .map(str::to_string)
            .ok_or_else(|| Error::Parse(format!("invalid byte range {}..{}", start, end)))
    }

    fn arguments(&mut self, node: Node<'_>) -> Result<(Vec<NodeRef>, Vec<NodeRef>)> {
        let mut args = Vec::new();
        let mut keywords = Vec::new();
        for child in named_children(node) {
            match child.kind() {
                "keyword_argument" => {
                    let arg = self.text(field(child, "name")?)?.to_string();
                    let value = self.expr(field(child, "value")?, ExprContext::Load)?;
                    keywords.push(self.add(
                        NodeKind::Keyword {
                            arg: Some(arg),
                            value,
                        },
                        child,
                    ));
                }
                "dictionary_splat" => {
                    let value = self.expr(first_named(child)?, ExprContext::Load)?;
                    keywords.push(self.add(NodeKind::Keyword { arg: None, value }, child));
                }
                _ => args.push(self.expr(child, ExprContext::Load)?),
            }
        }
        Ok((args, keywords))
    }

    fn comparison(&mut self, node: Node<'_>) -> Result<NodeKind> {
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node
            .children(&mut cursor)
            .filter(|child| !child.is_extra())
            .collect();

        let mut operands = Vec::new();
        let mut ops = Vec::new();
        for child in children {
            if child.is_named() {
                operands.push(self.expr(child, ExprContext::Load)?);
            } else {
                ops.push(child.kind().to_string());
            }
        }
        match operands.split_first() {
            Some((left, comparators)) if comparators.len() == ops.len() => Ok(NodeKind::Compare {
                left: *left,
                ops,
                comparators: comparators.to_vec(),
            }),
            _ => Err(unsupported(node)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(ast: &Ast) -> Vec<&'static str> {
        ast.body().iter().map(|n| ast[*n].kind.name()).collect()
    }

    #[test]
    fn test_parse_module_statements() {
        let source = "import os\nx = 1\nx += 2\nprint(x)\ndef f(a, b=2, *rest, **opts):\n    return a\nclass C(Base):\n    pass\n";
        let ast = parse(source).unwrap();

        assert_eq!(
            kinds(&ast),
            vec!["Raw", "Assign", "AugAssign", "Expr", "FunctionDef", "ClassDef"]
        );
        assert_eq!(ast[ast.body()[1]].line, Some(2));
    }

    #[test]
    fn test_parse_function_parameters() {
        let ast = parse("def f(a, b: int = 2, *rest, **opts) -> int:\n    return a\n").unwrap();
        let NodeKind::FunctionDef { name, params, returns, .. } = &ast[ast.body()[0]].kind else {
            panic!("expected a function");
        };
        assert_eq!(name, "f");
        assert!(returns.is_some());

        let shapes: Vec<_> = params
            .iter()
            .map(|p| match &ast[*p].kind {
                NodeKind::Param { name, kind, default, .. } => {
                    (name.as_str(), *kind, default.is_some())
                }
                other => panic!("unexpected {}", other.name()),
            })
            .collect();
        assert_eq!(
            shapes,
            vec![
                ("a", ParamKind::Positional, false),
                ("b", ParamKind::Positional, true),
                ("rest", ParamKind::VarArgs, false),
                ("opts", ParamKind::KwArgs, false),
            ]
        );
    }

    #[test]
    fn test_assignment_contexts() {
        let ast = parse("a, b = c\n").unwrap();
        let NodeKind::Assign { targets, value } = &ast[ast.body()[0]].kind else {
            panic!("expected an assignment");
        };
        let NodeKind::Tuple { elts, ctx } = &ast[targets[0]].kind else {
            panic!("expected a tuple target");
        };
        assert_eq!(*ctx, ExprContext::Store);
        assert!(elts.iter().all(|e| matches!(
            ast[*e].kind,
            NodeKind::Name { ctx: ExprContext::Store, .. }
        )));
        assert!(matches!(
            ast[*value].kind,
            NodeKind::Name { ctx: ExprContext::Load, .. }
        ));
    }

    #[test]
    fn test_chained_assignment() {
        let ast = parse("a = b = 1\n").unwrap();
        let NodeKind::Assign { targets, .. } = &ast[ast.body()[0]].kind else {
            panic!("expected an assignment");
        };
        assert_eq!(targets.len(), 2);
    }

    #[test]
    fn test_call_arguments() {
        let ast = parse("f(1, *xs, key=2, **kw)\n").unwrap();
        let NodeKind::Expr { value } = &ast[ast.body()[0]].kind else {
            panic!("expected an expression statement");
        };
        let NodeKind::Call { args, keywords, .. } = &ast[*value].kind else {
            panic!("expected a call");
        };
        assert_eq!(args.len(), 2);
        assert_eq!(ast[args[1]].kind.name(), "Starred");
        assert_eq!(keywords.len(), 2);
        assert!(matches!(&ast[keywords[0]].kind, NodeKind::Keyword { arg: Some(a), .. } if a == "key"));
        assert!(matches!(&ast[keywords[1]].kind, NodeKind::Keyword { arg: None, .. }));
    }

    #[test]
    fn test_elif_folds_into_nested_if() {
        let ast = parse("if a:\n    x = 1\nelif b:\n    x = 2\nelse:\n    x = 3\n").unwrap();
        let NodeKind::If { orelse, .. } = &ast[ast.body()[0]].kind else {
            panic!("expected an if");
        };
        assert_eq!(orelse.len(), 1);
        let NodeKind::If { orelse: inner, .. } = &ast[orelse[0]].kind else {
            panic!("expected a nested if");
        };
        assert_eq!(inner.len(), 1);
    }

    #[test]
    fn test_decorators_and_comments() {
        let ast = parse("# header\n@cache\ndef f(n):\n    # body\n    return n\n").unwrap();
        assert_eq!(kinds(&ast), vec!["FunctionDef"]);
        let NodeKind::FunctionDef { decorators, body, .. } = &ast[ast.body()[0]].kind else {
            panic!("expected a function");
        };
        assert_eq!(decorators.len(), 1);
        assert_eq!(body.len(), 1);
    }

    #[test]
    fn test_fstring_interpolations_are_expressions() {
        let ast = parse("msg = f\"hi {name}!\"\n").unwrap();
        let NodeKind::Assign { value, .. } = &ast[ast.body()[0]].kind else {
            panic!("expected an assignment");
        };
        let NodeKind::FormattedStr { pieces, values } = &ast[*value].kind else {
            panic!("expected an f-string");
        };
        assert_eq!(pieces, &vec!["f\"hi {".to_string(), "}!\"".to_string()]);
        assert!(matches!(&ast[values[0]].kind, NodeKind::Name { id, .. } if id == "name"));
    }

    #[test]
    fn test_syntax_error_reports_line() {
        let err = parse("x = 1\ny = (\n").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_format_spec_interpolations_are_expressions() {
        let ast = parse("s = f\"{x:{w}.{p}}\"\n").unwrap();
        let NodeKind::Assign { value, .. } = &ast[ast.body()[0]].kind else {
            panic!("expected an assignment");
        };
        let NodeKind::FormattedStr { pieces, values } = &ast[*value].kind else {
            panic!("expected an f-string");
        };
        let names: Vec<_> = values
            .iter()
            .map(|v| match &ast[*v].kind {
                NodeKind::Name { id, .. } => id.as_str(),
                other => panic!("unexpected {}", other.name()),
            })
            .collect();
        assert_eq!(names, vec!["x", "w", "p"]);
        assert_eq!(pieces.len(), 4);
        assert_eq!(pieces[1], ":{");
    }

    #[test]
    fn test_parse_exception_and_context_statements() {
        let source = "try:\n    raise ValueError(1)\nexcept (KeyError, ValueError) as err:\n    del err\nelse:\n    assert ok, \"msg\"\nfinally:\n    pass\nwith open(p) as fh, lock:\n    pass\n";
        let ast = parse(source).unwrap();
        assert_eq!(kinds(&ast), vec!["Try", "With"]);

        let NodeKind::Try { body, handlers, orelse, finalbody, star } = &ast[ast.body()[0]].kind
        else {
            panic!("expected a try");
        };
        assert!(!star);
        assert_eq!(ast[body[0]].kind.name(), "Raise");
        assert_eq!(ast[orelse[0]].kind.name(), "Assert");
        assert_eq!(finalbody.len(), 1);
        let NodeKind::ExceptHandler { typ, name, body } = &ast[handlers[0]].kind else {
            panic!("expected a handler");
        };
        assert_eq!(ast[typ.unwrap()].kind.name(), "Tuple");
        assert!(matches!(
            &ast[name.unwrap()].kind,
            NodeKind::Name { id, ctx: ExprContext::Store } if id == "err"
        ));
        let NodeKind::Delete { targets } = &ast[body[0]].kind else {
            panic!("expected a del");
        };
        assert!(matches!(ast[targets[0]].kind, NodeKind::Name { ctx: ExprContext::Del, .. }));

        let NodeKind::With { items, .. } = &ast[ast.body()[1]].kind else {
            panic!("expected a with");
        };
        assert_eq!(items.len(), 2);
        let NodeKind::WithItem { optional_vars, .. } = &ast[items[0]].kind else {
            panic!("expected a with item");
        };
        assert!(matches!(
            &ast[optional_vars.unwrap()].kind,
            NodeKind::Name { id, ctx: ExprContext::Store } if id == "fh"
        ));
    }

    #[test]
    fn test_parse_extended_expressions() {
        let source = "y = x[1:]\ns = {1, 2}\nc = [v for v in xs if v]\nf = lambda a, b=2: a\nd = {k: v for k, v in p}\ng = (n for n in r)\nm = (w := 3)\nn: int = 4\n";
        let ast = parse(source).unwrap();
        let values: Vec<_> = ast
            .body()
            .iter()
            .map(|stmt| match &ast[*stmt].kind {
                NodeKind::Assign { value, .. } => ast[*value].kind.name(),
                other => other.name(),
            })
            .collect();
        assert_eq!(
            values,
            vec!["Subscript", "Set", "ListComp", "Lambda", "DictComp", "GeneratorExp", "NamedExpr", "AnnAssign"]
        );

        let NodeKind::Assign { value, .. } = &ast[ast.body()[0]].kind else {
            panic!("expected an assignment");
        };
        let NodeKind::Subscript { slice, .. } = &ast[*value].kind else {
            panic!("expected a subscript");
        };
        assert!(matches!(
            ast[*slice].kind,
            NodeKind::Slice { lower: Some(_), upper: None, step: None }
        ));

        let NodeKind::Assign { value, .. } = &ast[ast.body()[2]].kind else {
            panic!("expected an assignment");
        };
        let NodeKind::Comprehension { generators, .. } = &ast[*value].kind else {
            panic!("expected a comprehension");
        };
        let NodeKind::CompFor { target, ifs, .. } = &ast[generators[0]].kind else {
            panic!("expected a for clause");
        };
        assert!(matches!(ast[*target].kind, NodeKind::Name { ctx: ExprContext::Store, .. }));
        assert_eq!(ifs.len(), 1);
    }

    #[test]
    fn test_other_constructs_keep_subexpressions() {
        let ast = parse("x = await fetch(url)\n").unwrap();
        let NodeKind::Assign { value, .. } = &ast[ast.body()[0]].kind else {
            panic!("expected an assignment");
        };
        let NodeKind::Other { kind, pieces, values } = &ast[*value].kind else {
            panic!("expected an opaque node");
        };
        assert_eq!(kind, "await");
        assert_eq!(pieces, &vec!["await ".to_string(), String::new()]);
        assert_eq!(ast[values[0]].kind.name(), "Call");
    }

    #[test]
    fn test_keyword_only_marker() {
        let ast = parse("def f(a, *, b):\n    return a\n").unwrap();
        let NodeKind::FunctionDef { params, .. } = &ast[ast.body()[0]].kind else {
            panic!("expected a function");
        };
        assert_eq!(params.len(), 3);
        assert_eq!(ast[params[1]].kind.name(), "Other");
    }

    #[test]
    fn test_unsupported_compound_statement() {
        let err = parse("match x:\n    case 1:\n        pass\n").unwrap_err();
        match err {
            Error::Parse(message) => assert!(message.contains("match_statement")),
            other => panic!("unexpected {}", other),
        }
    }
}
