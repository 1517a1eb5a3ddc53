//! Syntax tree arena
//!
//! The program tree lives in a flat arena of [`Node`]s addressed by
//! [`NodeRef`]. The arena is the only long-lived owner of node data:
//! transforms edit it in place and every derived table (node store, scopes,
//! tokens) is re-derived from it on `CodeGraph::refresh`.
//!
//! Nodes that a transform detaches stay in the arena but are no longer
//! reachable from the root, so no traversal ever sees them again.

use serde::Serialize;
use std::collections::HashSet;

/// Index of a node in the [`Ast`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeRef(pub u32);

impl NodeRef {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Read/write context of a name reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExprContext {
    /// The value is read
    Load,
    /// The name is bound or assigned
    Store,
    /// The name is deleted
    Del,
}

/// How a parameter receives its argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Positional,
    /// `*args`
    VarArgs,
    /// `**kwargs`
    KwArgs,
}

/// Literal values, kept as their source spelling where that matters
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Constant {
    Number(String),
    Str(String),
    Bool(bool),
    None,
    Ellipsis,
}

/// Which display a comprehension builds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompKind {
    List,
    Set,
    Dict,
    Generator,
}

/// Node kinds understood by the graph.
///
/// Only definitions, parameters, assignments, calls, names and statement
/// lists carry meaning for the transforms; every other kind is traversed
/// structurally.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum NodeKind {
    Module {
        body: Vec<NodeRef>,
    },
    FunctionDef {
        name: String,
        params: Vec<NodeRef>,
        body: Vec<NodeRef>,
        decorators: Vec<NodeRef>,
        returns: Option<NodeRef>,
    },
    ClassDef {
        name: String,
        bases: Vec<NodeRef>,
        body: Vec<NodeRef>,
        decorators: Vec<NodeRef>,
    },
    Param {
        name: String,
        kind: ParamKind,
        annotation: Option<NodeRef>,
        default: Option<NodeRef>,
    },
    Assign {
        targets: Vec<NodeRef>,
        value: NodeRef,
    },
    AugAssign {
        target: NodeRef,
        op: String,
        value: NodeRef,
    },
    /// `target: annotation [= value]`
    AnnAssign {
        target: NodeRef,
        annotation: NodeRef,
        value: Option<NodeRef>,
    },
    Return {
        value: Option<NodeRef>,
    },
    Expr {
        value: NodeRef,
    },
    If {
        test: NodeRef,
        body: Vec<NodeRef>,
        orelse: Vec<NodeRef>,
    },
    While {
        test: NodeRef,
        body: Vec<NodeRef>,
        orelse: Vec<NodeRef>,
    },
    For {
        target: NodeRef,
        iter: NodeRef,
        body: Vec<NodeRef>,
        orelse: Vec<NodeRef>,
    },
    Raise {
        exc: Option<NodeRef>,
        cause: Option<NodeRef>,
    },
    Assert {
        test: NodeRef,
        msg: Option<NodeRef>,
    },
    Delete {
        targets: Vec<NodeRef>,
    },
    /// `try` statement; `star` marks `except*` handlers
    Try {
        body: Vec<NodeRef>,
        handlers: Vec<NodeRef>,
        orelse: Vec<NodeRef>,
        finalbody: Vec<NodeRef>,
        star: bool,
    },
    /// `except [type [as name]]:`; `name` is a store-context `Name`
    ExceptHandler {
        typ: Option<NodeRef>,
        name: Option<NodeRef>,
        body: Vec<NodeRef>,
    },
    With {
        items: Vec<NodeRef>,
        body: Vec<NodeRef>,
    },
    WithItem {
        context_expr: NodeRef,
        optional_vars: Option<NodeRef>,
    },
    Pass,
    Break,
    Continue,
    /// Source kept verbatim: imports and `global`/`nonlocal` declarations
    Raw {
        text: String,
    },
    Call {
        func: NodeRef,
        args: Vec<NodeRef>,
        keywords: Vec<NodeRef>,
    },
    /// `name=value`, or `**value` when `arg` is `None`
    Keyword {
        arg: Option<String>,
        value: NodeRef,
    },
    Starred {
        value: NodeRef,
        ctx: ExprContext,
    },
    Name {
        id: String,
        ctx: ExprContext,
    },
    Tuple {
        elts: Vec<NodeRef>,
        ctx: ExprContext,
    },
    List {
        elts: Vec<NodeRef>,
        ctx: ExprContext,
    },
    Dict {
        keys: Vec<NodeRef>,
        values: Vec<NodeRef>,
    },
    /// Arithmetic, bitwise and boolean (`and`/`or`) operators
    BinOp {
        left: NodeRef,
        op: String,
        right: NodeRef,
    },
    UnaryOp {
        op: String,
        operand: NodeRef,
    },
    Compare {
        left: NodeRef,
        ops: Vec<String>,
        comparators: Vec<NodeRef>,
    },
    IfExp {
        test: NodeRef,
        body: NodeRef,
        orelse: NodeRef,
    },
    Attribute {
        value: NodeRef,
        attr: String,
        ctx: ExprContext,
    },
    Subscript {
        value: NodeRef,
        slice: NodeRef,
        ctx: ExprContext,
    },
    Slice {
        lower: Option<NodeRef>,
        upper: Option<NodeRef>,
        step: Option<NodeRef>,
    },
    Lambda {
        params: Vec<NodeRef>,
        body: NodeRef,
    },
    Set {
        elts: Vec<NodeRef>,
    },
    /// List, set, dict or generator comprehension. `value` is set for dict
    /// comprehensions only, where `elt` is the key.
    Comprehension {
        kind: CompKind,
        elt: NodeRef,
        value: Option<NodeRef>,
        generators: Vec<NodeRef>,
    },
    /// One `for target in iter if ...` clause of a comprehension
    CompFor {
        target: NodeRef,
        iter: NodeRef,
        ifs: Vec<NodeRef>,
        is_async: bool,
    },
    /// `target := value`
    NamedExpr {
        target: NodeRef,
        value: NodeRef,
    },
    Constant(Constant),
    /// Any other construct, kept as source text with its subexpressions
    /// lowered: `pieces` surround `values` like in [`NodeKind::FormattedStr`]
    Other {
        kind: String,
        pieces: Vec<String>,
        values: Vec<NodeRef>,
    },
    /// f-string: `pieces` is the literal source around each interpolated
    /// expression, so `pieces.len() == values.len() + 1`
    FormattedStr {
        pieces: Vec<String>,
        values: Vec<NodeRef>,
    },
}

/// Position of a child inside its parent: field name plus list index when
/// the field is an ordered sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildSlot {
    pub field: &'static str,
    pub index: Option<usize>,
    pub node: NodeRef,
}

fn push_one(out: &mut Vec<ChildSlot>, field: &'static str, node: NodeRef) {
    out.push(ChildSlot { field, index: None, node });
}

fn push_opt(out: &mut Vec<ChildSlot>, field: &'static str, node: &Option<NodeRef>) {
    if let Some(node) = node {
        push_one(out, field, *node);
    }
}

fn push_list(out: &mut Vec<ChildSlot>, field: &'static str, nodes: &[NodeRef]) {
    out.extend(nodes.iter().enumerate().map(|(i, node)| ChildSlot {
        field,
        index: Some(i),
        node: *node,
    }));
}

impl NodeKind {
    /// Kind name, matching the usual Python AST class names
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Module { .. } => "Module",
            NodeKind::FunctionDef { .. } => "FunctionDef",
            NodeKind::ClassDef { .. } => "ClassDef",
            NodeKind::Param { .. } => "arg",
            NodeKind::Assign { .. } => "Assign",
            NodeKind::AugAssign { .. } => "AugAssign",
            NodeKind::AnnAssign { .. } => "AnnAssign",
            NodeKind::Return { .. } => "Return",
            NodeKind::Expr { .. } => "Expr",
            NodeKind::If { .. } => "If",
            NodeKind::While { .. } => "While",
            NodeKind::For { .. } => "For",
            NodeKind::Raise { .. } => "Raise",
            NodeKind::Assert { .. } => "Assert",
            NodeKind::Delete { .. } => "Delete",
            NodeKind::Try { star: false, .. } => "Try",
            NodeKind::Try { star: true, .. } => "TryStar",
            NodeKind::ExceptHandler { .. } => "ExceptHandler",
            NodeKind::With { .. } => "With",
            NodeKind::WithItem { .. } => "withitem",
            NodeKind::Pass => "Pass",
            NodeKind::Break => "Break",
            NodeKind::Continue => "Continue",
            NodeKind::Raw { .. } => "Raw",
            NodeKind::Call { .. } => "Call",
            NodeKind::Keyword { .. } => "keyword",
            NodeKind::Starred { .. } => "Starred",
            NodeKind::Name { .. } => "Name",
            NodeKind::Tuple { .. } => "Tuple",
            NodeKind::List { .. } => "List",
            NodeKind::Dict { .. } => "Dict",
            NodeKind::BinOp { .. } => "BinOp",
            NodeKind::UnaryOp { .. } => "UnaryOp",
            NodeKind::Compare { .. } => "Compare",
            NodeKind::IfExp { .. } => "IfExp",
            NodeKind::Attribute { .. } => "Attribute",
            NodeKind::Subscript { .. } => "Subscript",
            NodeKind::Slice { .. } => "Slice",
            NodeKind::Lambda { .. } => "Lambda",
            NodeKind::Set { .. } => "Set",
            NodeKind::Comprehension { kind, .. } => match kind {
                CompKind::List => "ListComp",
                CompKind::Set => "SetComp",
                CompKind::Dict => "DictComp",
                CompKind::Generator => "GeneratorExp",
            },
            NodeKind::CompFor { .. } => "comprehension",
            NodeKind::NamedExpr { .. } => "NamedExpr",
            NodeKind::Constant(_) => "Constant",
            NodeKind::Other { .. } => "Other",
            NodeKind::FormattedStr { .. } => "JoinedStr",
        }
    }

    /// Children in field order, the order every traversal follows
    pub fn children(&self) -> Vec<ChildSlot> {
        let mut out = Vec::new();
        match self {
            NodeKind::Module { body } => push_list(&mut out, "body", body),
            NodeKind::FunctionDef { params, body, decorators, returns, .. } => {
                push_list(&mut out, "params", params);
                push_list(&mut out, "body", body);
                push_list(&mut out, "decorators", decorators);
                push_opt(&mut out, "returns", returns);
            }
            NodeKind::ClassDef { bases, body, decorators, .. } => {
                push_list(&mut out, "bases", bases);
                push_list(&mut out, "body", body);
                push_list(&mut out, "decorators", decorators);
            }
            NodeKind::Param { annotation, default, .. } => {
                push_opt(&mut out, "annotation", annotation);
                push_opt(&mut out, "default", default);
            }
            NodeKind::Assign { targets, value } => {
                push_list(&mut out, "targets", targets);
                push_one(&mut out, "value", *value);
            }
            NodeKind::AugAssign { target, value, .. } => {
                push_one(&mut out, "target", *target);
                push_one(&mut out, "value", *value);
            }
            NodeKind::AnnAssign { target, annotation, value } => {
                push_one(&mut out, "target", *target);
                push_one(&mut out, "annotation", *annotation);
                push_opt(&mut out, "value", value);
            }
            NodeKind::Return { value } => push_opt(&mut out, "value", value),
            NodeKind::Expr { value } => push_one(&mut out, "value", *value),
            NodeKind::If { test, body, orelse } | NodeKind::While { test, body, orelse } => {
                push_one(&mut out, "test", *test);
                push_list(&mut out, "body", body);
                push_list(&mut out, "orelse", orelse);
            }
            NodeKind::For { target, iter, body, orelse } => {
                push_one(&mut out, "target", *target);
                push_one(&mut out, "iter", *iter);
                push_list(&mut out, "body", body);
                push_list(&mut out, "orelse", orelse);
            }
            NodeKind::Call { func, args, keywords } => {
                push_one(&mut out, "func", *func);
                push_list(&mut out, "args", args);
                push_list(&mut out, "keywords", keywords);
            }
            NodeKind::Keyword { value, .. } | NodeKind::Starred { value, .. } => {
                push_one(&mut out, "value", *value)
            }
            NodeKind::Tuple { elts, .. } | NodeKind::List { elts, .. } => {
                push_list(&mut out, "elts", elts)
            }
            NodeKind::Dict { keys, values } => {
                push_list(&mut out, "keys", keys);
                push_list(&mut out, "values", values);
            }
            NodeKind::BinOp { left, right, .. } => {
                push_one(&mut out, "left", *left);
                push_one(&mut out, "right", *right);
            }
            NodeKind::UnaryOp { operand, .. } => push_one(&mut out, "operand", *operand),
            NodeKind::Compare { left, comparators, .. } => {
                push_one(&mut out, "left", *left);
                push_list(&mut out, "comparators", comparators);
            }
            NodeKind::IfExp { test, body, orelse } => {
                push_one(&mut out, "test", *test);
                push_one(&mut out, "body", *body);
                push_one(&mut out, "orelse", *orelse);
            }
            NodeKind::Attribute { value, .. } => push_one(&mut out, "value", *value),
            NodeKind::Subscript { value, slice, .. } => {
                push_one(&mut out, "value", *value);
                push_one(&mut out, "slice", *slice);
            }
            NodeKind::FormattedStr { values, .. } | NodeKind::Other { values, .. } => {
                push_list(&mut out, "values", values)
            }
            NodeKind::Raise { exc, cause } => {
                push_opt(&mut out, "exc", exc);
                push_opt(&mut out, "cause", cause);
            }
            NodeKind::Assert { test, msg } => {
                push_one(&mut out, "test", *test);
                push_opt(&mut out, "msg", msg);
            }
            NodeKind::Delete { targets } => push_list(&mut out, "targets", targets),
            NodeKind::Try { body, handlers, orelse, finalbody, .. } => {
                push_list(&mut out, "body", body);
                push_list(&mut out, "handlers", handlers);
                push_list(&mut out, "orelse", orelse);
                push_list(&mut out, "finalbody", finalbody);
            }
            NodeKind::ExceptHandler { typ, name, body } => {
                push_opt(&mut out, "type", typ);
                push_opt(&mut out, "name", name);
                push_list(&mut out, "body", body);
            }
            NodeKind::With { items, body } => {
                push_list(&mut out, "items", items);
                push_list(&mut out, "body", body);
            }
            NodeKind::WithItem { context_expr, optional_vars } => {
                push_one(&mut out, "context_expr", *context_expr);
                push_opt(&mut out, "optional_vars", optional_vars);
            }
            NodeKind::Slice { lower, upper, step } => {
                push_opt(&mut out, "lower", lower);
                push_opt(&mut out, "upper", upper);
                push_opt(&mut out, "step", step);
            }
            NodeKind::Lambda { params, body } => {
                push_list(&mut out, "params", params);
                push_one(&mut out, "body", *body);
            }
            NodeKind::Set { elts } => push_list(&mut out, "elts", elts),
            // Generators first: they are evaluated before the element
            NodeKind::Comprehension { elt, value, generators, .. } => {
                push_list(&mut out, "generators", generators);
                push_one(&mut out, "elt", *elt);
                push_opt(&mut out, "value", value);
            }
            NodeKind::CompFor { target, iter, ifs, .. } => {
                push_one(&mut out, "iter", *iter);
                push_one(&mut out, "target", *target);
                push_list(&mut out, "ifs", ifs);
            }
            NodeKind::NamedExpr { target, value } => {
                push_one(&mut out, "value", *value);
                push_one(&mut out, "target", *target);
            }
            NodeKind::Pass
            | NodeKind::Break
            | NodeKind::Continue
            | NodeKind::Raw { .. }
            | NodeKind::Name { .. }
            | NodeKind::Constant(_) => {}
        }
        out
    }

    /// Mutable references to every child slot, in the same order as [`children`](Self::children)
    fn children_mut(&mut self) -> Vec<&mut NodeRef> {
        let mut out: Vec<&mut NodeRef> = Vec::new();
        match self {
            NodeKind::Module { body } => out.extend(body.iter_mut()),
            NodeKind::FunctionDef { params, body, decorators, returns, .. } => {
                out.extend(params.iter_mut());
                out.extend(body.iter_mut());
                out.extend(decorators.iter_mut());
                out.extend(returns.iter_mut());
            }
            NodeKind::ClassDef { bases, body, decorators, .. } => {
                out.extend(bases.iter_mut());
                out.extend(body.iter_mut());
                out.extend(decorators.iter_mut());
            }
            NodeKind::Param { annotation, default, .. } => {
                out.extend(annotation.iter_mut());
                out.extend(default.iter_mut());
            }
            NodeKind::Assign { targets, value } => {
                out.extend(targets.iter_mut());
                out.push(value);
            }
            NodeKind::AugAssign { target, value, .. } => {
                out.push(target);
                out.push(value);
            }
            NodeKind::AnnAssign { target, annotation, value } => {
                out.push(target);
                out.push(annotation);
                out.extend(value.iter_mut());
            }
            NodeKind::Return { value } => out.extend(value.iter_mut()),
            NodeKind::Expr { value } => out.push(value),
            NodeKind::If { test, body, orelse } | NodeKind::While { test, body, orelse } => {
                out.push(test);
                out.extend(body.iter_mut());
                out.extend(orelse.iter_mut());
            }
            NodeKind::For { target, iter, body, orelse } => {
                out.push(target);
                out.push(iter);
                out.extend(body.iter_mut());
                out.extend(orelse.iter_mut());
            }
            NodeKind::Call { func, args, keywords } => {
                out.push(func);
                out.extend(args.iter_mut());
                out.extend(keywords.iter_mut());
            }
            NodeKind::Keyword { value, .. } | NodeKind::Starred { value, .. } => out.push(value),
            NodeKind::Tuple { elts, .. } | NodeKind::List { elts, .. } => {
                out.extend(elts.iter_mut())
            }
            NodeKind::Dict { keys, values } => {
                out.extend(keys.iter_mut());
                out.extend(values.iter_mut());
            }
            NodeKind::BinOp { left, right, .. } => {
                out.push(left);
                out.push(right);
            }
            NodeKind::UnaryOp { operand, .. } => out.push(operand),
            NodeKind::Compare { left, comparators, .. } => {
                out.push(left);
                out.extend(comparators.iter_mut());
            }
            NodeKind::IfExp { test, body, orelse } => {
                out.push(test);
                out.push(body);
                out.push(orelse);
            }
            NodeKind::Attribute { value, .. } => out.push(value),
            NodeKind::Subscript { value, slice, .. } => {
                out.push(value);
                out.push(slice);
            }
            NodeKind::FormattedStr { values, .. } | NodeKind::Other { values, .. } => {
                out.extend(values.iter_mut())
            }
            NodeKind::Raise { exc, cause } => {
                out.extend(exc.iter_mut());
                out.extend(cause.iter_mut());
            }
            NodeKind::Assert { test, msg } => {
                out.push(test);
                out.extend(msg.iter_mut());
            }
            NodeKind::Delete { targets } => out.extend(targets.iter_mut()),
            NodeKind::Try { body, handlers, orelse, finalbody, .. } => {
                out.extend(body.iter_mut());
                out.extend(handlers.iter_mut());
                out.extend(orelse.iter_mut());
                out.extend(finalbody.iter_mut());
            }
            NodeKind::ExceptHandler { typ, name, body } => {
                out.extend(typ.iter_mut());
                out.extend(name.iter_mut());
                out.extend(body.iter_mut());
            }
            NodeKind::With { items, body } => {
                out.extend(items.iter_mut());
                out.extend(body.iter_mut());
            }
            NodeKind::WithItem { context_expr, optional_vars } => {
                out.push(context_expr);
                out.extend(optional_vars.iter_mut());
            }
            NodeKind::Slice { lower, upper, step } => {
                out.extend(lower.iter_mut());
                out.extend(upper.iter_mut());
                out.extend(step.iter_mut());
            }
            NodeKind::Lambda { params, body } => {
                out.extend(params.iter_mut());
                out.push(body);
            }
            NodeKind::Set { elts } => out.extend(elts.iter_mut()),
            NodeKind::Comprehension { elt, value, generators, .. } => {
                out.extend(generators.iter_mut());
                out.push(elt);
                out.extend(value.iter_mut());
            }
            NodeKind::CompFor { target, iter, ifs, .. } => {
                out.push(iter);
                out.push(target);
                out.extend(ifs.iter_mut());
            }
            NodeKind::NamedExpr { target, value } => {
                out.push(value);
                out.push(target);
            }
            NodeKind::Pass
            | NodeKind::Break
            | NodeKind::Continue
            | NodeKind::Raw { .. }
            | NodeKind::Name { .. }
            | NodeKind::Constant(_) => {}
        }
        out
    }

    /// The statement list stored under `field`, if this node has one there
    pub fn stmt_list(&self, field: &str) -> Option<&Vec<NodeRef>> {
        match (self, field) {
            (NodeKind::Module { body }, "body")
            | (NodeKind::FunctionDef { body, .. }, "body")
            | (NodeKind::ClassDef { body, .. }, "body")
            | (NodeKind::If { body, .. }, "body")
            | (NodeKind::While { body, .. }, "body")
            | (NodeKind::For { body, .. }, "body")
            | (NodeKind::Try { body, .. }, "body")
            | (NodeKind::ExceptHandler { body, .. }, "body")
            | (NodeKind::With { body, .. }, "body") => Some(body),
            (NodeKind::If { orelse, .. }, "orelse")
            | (NodeKind::While { orelse, .. }, "orelse")
            | (NodeKind::For { orelse, .. }, "orelse")
            | (NodeKind::Try { orelse, .. }, "orelse") => Some(orelse),
            (NodeKind::Try { finalbody, .. }, "finalbody") => Some(finalbody),
            _ => None,
        }
    }

    pub fn stmt_list_mut(&mut self, field: &str) -> Option<&mut Vec<NodeRef>> {
        match (self, field) {
            (NodeKind::Module { body }, "body")
            | (NodeKind::FunctionDef { body, .. }, "body")
            | (NodeKind::ClassDef { body, .. }, "body")
            | (NodeKind::If { body, .. }, "body")
            | (NodeKind::While { body, .. }, "body")
            | (NodeKind::For { body, .. }, "body")
            | (NodeKind::Try { body, .. }, "body")
            | (NodeKind::ExceptHandler { body, .. }, "body")
            | (NodeKind::With { body, .. }, "body") => Some(body),
            (NodeKind::If { orelse, .. }, "orelse")
            | (NodeKind::While { orelse, .. }, "orelse")
            | (NodeKind::For { orelse, .. }, "orelse")
            | (NodeKind::Try { orelse, .. }, "orelse") => Some(orelse),
            (NodeKind::Try { finalbody, .. }, "finalbody") => Some(finalbody),
            _ => None,
        }
    }

    /// Whether the statement list under `field` must hold at least one
    /// statement to be valid Python (`else` branches and the module may be
    /// empty, `finally` only when the `try` has handlers)
    pub fn requires_statements(&self, field: &str) -> bool {
        match (self, field) {
            (NodeKind::Module { .. }, _) => false,
            (NodeKind::Try { handlers, .. }, "finalbody") => handlers.is_empty(),
            (_, field) => field == "body",
        }
    }
}

/// One node of the tree. `line` is the 1-based source line for parsed
/// nodes and `None` for nodes synthesized by a transform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub kind: NodeKind,
    pub line: Option<u32>,
}

/// Arena-backed syntax tree rooted at a `Module` node
#[derive(Debug, Clone)]
pub struct Ast {
    nodes: Vec<Node>,
    root: NodeRef,
}

impl Default for Ast {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Index<NodeRef> for Ast {
    type Output = Node;

    fn index(&self, node: NodeRef) -> &Node {
        &self.nodes[node.index()]
    }
}

impl Ast {
    /// Create a tree holding an empty module
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Module { body: Vec::new() },
                line: None,
            }],
            root: NodeRef(0),
        }
    }

    pub fn root(&self) -> NodeRef {
        self.root
    }

    /// Number of arena slots, reachable or not
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, node: NodeRef) -> Option<&Node> {
        self.nodes.get(node.index())
    }

    pub fn kind_mut(&mut self, node: NodeRef) -> &mut NodeKind {
        &mut self.nodes[node.index()].kind
    }

    /// Allocate a synthesized node
    pub fn add(&mut self, kind: NodeKind) -> NodeRef {
        self.add_at(kind, None)
    }

    /// Allocate a node with its source line
    pub fn add_at(&mut self, kind: NodeKind, line: Option<u32>) -> NodeRef {
        let node = NodeRef(self.nodes.len() as u32);
        self.nodes.push(Node { kind, line });
        node
    }

    /// Allocate a name reference
    pub fn name(&mut self, id: impl Into<String>, ctx: ExprContext) -> NodeRef {
        self.add(NodeKind::Name { id: id.into(), ctx })
    }

    /// Append a statement to the module body
    pub fn push_statement(&mut self, stmt: NodeRef) {
        let root = self.root;
        if let Some(body) = self.kind_mut(root).stmt_list_mut("body") {
            body.push(stmt);
        }
    }

    /// The module's top-level statements
    pub fn body(&self) -> &[NodeRef] {
        self[self.root]
            .kind
            .stmt_list("body")
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn stmt_list_mut(&mut self, parent: NodeRef, field: &str) -> Option<&mut Vec<NodeRef>> {
        self.kind_mut(parent).stmt_list_mut(field)
    }

    /// Recursively copy a subtree into fresh arena slots
    pub fn deep_copy(&mut self, node: NodeRef) -> NodeRef {
        let source = &self.nodes[node.index()];
        let line = source.line;
        let mut kind = source.kind.clone();
        for child in kind.children_mut() {
            *child = self.deep_copy(*child);
        }
        self.add_at(kind, line)
    }

    /// Depth-first pre-order walk of the subtree under `start`
    pub fn preorder(&self, start: NodeRef) -> Vec<NodeRef> {
        let mut order = Vec::new();
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            order.push(node);
            let children = self[node].kind.children();
            stack.extend(children.iter().rev().map(|slot| slot.node));
        }
        order
    }

    /// Every identifier spelled anywhere in the reachable tree: name
    /// references, parameters and definition names
    pub fn identifiers(&self) -> HashSet<String> {
        self.preorder(self.root)
            .into_iter()
            .filter_map(|node| match &self[node].kind {
                NodeKind::Name { id, .. } => Some(id.clone()),
                NodeKind::Param { name, .. }
                | NodeKind::FunctionDef { name, .. }
                | NodeKind::ClassDef { name, .. } => Some(name.clone()),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_assign(ast: &mut Ast) -> NodeRef {
        // z = f(1, 2)
        let one = ast.add(NodeKind::Constant(Constant::Number("1".into())));
        let two = ast.add(NodeKind::Constant(Constant::Number("2".into())));
        let func = ast.name("f", ExprContext::Load);
        let call = ast.add(NodeKind::Call { func, args: vec![one, two], keywords: vec![] });
        let target = ast.name("z", ExprContext::Store);
        ast.add(NodeKind::Assign { targets: vec![target], value: call })
    }

    #[test]
    fn test_children_follow_field_order() {
        let mut ast = Ast::new();
        let assign = sample_assign(&mut ast);

        let slots = ast[assign].kind.children();
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].field, "targets");
        assert_eq!(slots[0].index, Some(0));
        assert_eq!(slots[1].field, "value");
        assert_eq!(slots[1].index, None);
    }

    #[test]
    fn test_preorder_visits_parent_before_children() {
        let mut ast = Ast::new();
        let assign = sample_assign(&mut ast);
        ast.push_statement(assign);

        let kinds: Vec<_> = ast
            .preorder(ast.root())
            .into_iter()
            .map(|n| ast[n].kind.name())
            .collect();
        assert_eq!(
            kinds,
            vec!["Module", "Assign", "Name", "Call", "Name", "Constant", "Constant"]
        );
    }

    #[test]
    fn test_deep_copy_allocates_fresh_nodes() {
        let mut ast = Ast::new();
        let assign = sample_assign(&mut ast);
        let before = ast.len();

        let copy = ast.deep_copy(assign);

        assert_ne!(copy, assign);
        assert_eq!(ast.len(), before * 2 - 1);
        assert_eq!(ast[copy].kind.name(), "Assign");
        let original: HashSet<_> = ast.preorder(assign).into_iter().collect();
        assert!(ast.preorder(copy).iter().all(|n| !original.contains(n)));
    }

    #[test]
    fn test_statement_lists() {
        let mut ast = Ast::new();
        let test = ast.name("c", ExprContext::Load);
        let pass = ast.add(NodeKind::Pass);
        let stmt = ast.add(NodeKind::If { test, body: vec![pass], orelse: vec![] });

        assert_eq!(ast[stmt].kind.stmt_list("body").map(|b| b.len()), Some(1));
        assert!(ast[stmt].kind.stmt_list("test").is_none());
        assert!(ast[stmt].kind.requires_statements("body"));
        assert!(!ast[stmt].kind.requires_statements("orelse"));
        assert!(!ast[ast.root()].kind.requires_statements("body"));
    }

    #[test]
    fn test_identifiers() {
        let mut ast = Ast::new();
        let assign = sample_assign(&mut ast);
        ast.push_statement(assign);

        let ids = ast.identifiers();
        assert!(ids.contains("f"));
        assert!(ids.contains("z"));
        assert_eq!(ids.len(), 2);
    }
}
