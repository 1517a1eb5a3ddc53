//! Source printer
//!
//! Renders the reachable tree back to Python source: four-space
//! indentation, no blank lines, and parentheses only where operator
//! precedence needs them. Tuples are always parenthesized.

use crate::ast::{Ast, CompKind, Constant, NodeKind, NodeRef, ParamKind};

/// Render the tree as Python source
pub fn to_source(ast: &Ast) -> String {
    let mut printer = Printer {
        ast,
        out: String::new(),
    };
    printer.block(ast.body(), 0);
    printer.out
}

/// Render a single expression
pub fn expr_to_source(ast: &Ast, node: NodeRef) -> String {
    let printer = Printer {
        ast,
        out: String::new(),
    };
    printer.expr(node).0
}

mod prec {
    /// Bare `yield`, which needs parentheses everywhere but a statement or
    /// the right-hand side of an assignment
    pub const YIELD: u8 = 0;
    pub const TEST: u8 = 1;
    pub const OR: u8 = 2;
    pub const AND: u8 = 3;
    pub const NOT: u8 = 4;
    pub const CMP: u8 = 5;
    pub const BOR: u8 = 6;
    pub const BXOR: u8 = 7;
    pub const BAND: u8 = 8;
    pub const SHIFT: u8 = 9;
    pub const ARITH: u8 = 10;
    pub const TERM: u8 = 11;
    pub const FACTOR: u8 = 12;
    pub const POWER: u8 = 13;
    pub const AWAIT: u8 = 14;
    pub const PRIMARY: u8 = 15;
    pub const ATOM: u8 = 16;
}

fn binop_prec(op: &str) -> u8 {
    match op {
        "or" => prec::OR,
        "and" => prec::AND,
        "|" => prec::BOR,
        "^" => prec::BXOR,
        "&" => prec::BAND,
        "<<" | ">>" => prec::SHIFT,
        "+" | "-" => prec::ARITH,
        "**" => prec::POWER,
        _ => prec::TERM,
    }
}

fn other_prec(kind: &str) -> u8 {
    match kind {
        "yield" => prec::YIELD,
        "await" => prec::AWAIT,
        "dictionary" | "string" | "concatenated_string" => prec::ATOM,
        _ => prec::TEST,
    }
}

struct Printer<'a> {
    ast: &'a Ast,
    out: String,
}

impl Printer<'_> {
    fn line(&mut self, indent: usize, text: &str) {
        for _ in 0..indent {
            self.out.push_str("    ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn block(&mut self, stmts: &[NodeRef], indent: usize) {
        for stmt in stmts {
            self.stmt(*stmt, indent);
        }
    }

    /// Body of a compound statement; an empty one prints `pass`
    fn suite(&mut self, stmts: &[NodeRef], indent: usize) {
        if stmts.is_empty() {
            self.line(indent, "pass");
        } else {
            self.block(stmts, indent);
        }
    }

    fn stmt(&mut self, node: NodeRef, indent: usize) {
        let ast = self.ast;
        match &ast[node].kind {
            NodeKind::FunctionDef {
                name,
                params,
                body,
                decorators,
                returns,
            } => {
                for decorator in decorators {
                    let text = format!("@{}", self.expr(*decorator).0);
                    self.line(indent, &text);
                }
                let params: Vec<String> = params.iter().map(|p| self.param(*p)).collect();
                let mut header = format!("def {}({})", name, params.join(", "));
                if let Some(returns) = returns {
                    header.push_str(" -> ");
                    header.push_str(&self.expr(*returns).0);
                }
                header.push(':');
                self.line(indent, &header);
                self.suite(body, indent + 1);
            }
            NodeKind::ClassDef {
                name,
                bases,
                body,
                decorators,
            } => {
                for decorator in decorators {
                    let text = format!("@{}", self.expr(*decorator).0);
                    self.line(indent, &text);
                }
                let header = if bases.is_empty() {
                    format!("class {}:", name)
                } else {
                    format!("class {}({}):", name, self.list(bases))
                };
                self.line(indent, &header);
                self.suite(body, indent + 1);
            }
            NodeKind::Assign { targets, value } => {
                let mut parts: Vec<String> = targets.iter().map(|t| self.expr(*t).0).collect();
                parts.push(self.expr(*value).0);
                let text = parts.join(" = ");
                self.line(indent, &text);
            }
            NodeKind::AugAssign { target, op, value } => {
                let text = format!("{} {} {}", self.expr(*target).0, op, self.expr(*value).0);
                self.line(indent, &text);
            }
            NodeKind::AnnAssign {
                target,
                annotation,
                value,
            } => {
                let mut text = format!("{}: {}", self.expr(*target).0, self.expr(*annotation).0);
                if let Some(value) = value {
                    text.push_str(" = ");
                    text.push_str(&self.expr(*value).0);
                }
                self.line(indent, &text);
            }
            NodeKind::Raise { exc, cause } => {
                let mut text = "raise".to_string();
                if let Some(exc) = exc {
                    text.push(' ');
                    text.push_str(&self.expr(*exc).0);
                }
                if let Some(cause) = cause {
                    text.push_str(" from ");
                    text.push_str(&self.wrap(*cause, prec::TEST));
                }
                self.line(indent, &text);
            }
            NodeKind::Assert { test, msg } => {
                let mut text = format!("assert {}", self.wrap(*test, prec::TEST));
                if let Some(msg) = msg {
                    text.push_str(", ");
                    text.push_str(&self.wrap(*msg, prec::TEST));
                }
                self.line(indent, &text);
            }
            NodeKind::Delete { targets } => {
                let text = format!("del {}", self.list(targets));
                self.line(indent, &text);
            }
            NodeKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
                star,
            } => {
                self.line(indent, "try:");
                self.suite(body, indent + 1);
                for handler in handlers {
                    self.handler(*handler, *star, indent);
                }
                self.else_clause(orelse, indent);
                if !finalbody.is_empty() || handlers.is_empty() {
                    self.line(indent, "finally:");
                    self.suite(finalbody, indent + 1);
                }
            }
            NodeKind::ExceptHandler { .. } => self.handler(node, false, indent),
            NodeKind::With { items, body } => {
                let text = format!("with {}:", self.list(items));
                self.line(indent, &text);
                self.suite(body, indent + 1);
            }
            NodeKind::Return { value } => {
                let text = match value {
                    Some(value) => format!("return {}", self.expr(*value).0),
                    None => "return".to_string(),
                };
                self.line(indent, &text);
            }
            NodeKind::Expr { value } => {
                let text = self.expr(*value).0;
                self.line(indent, &text);
            }
            NodeKind::If { test, body, orelse } => {
                let text = format!("if {}:", self.expr(*test).0);
                self.line(indent, &text);
                self.suite(body, indent + 1);
                self.orelse(orelse, indent);
            }
            NodeKind::While { test, body, orelse } => {
                let text = format!("while {}:", self.expr(*test).0);
                self.line(indent, &text);
                self.suite(body, indent + 1);
                self.else_clause(orelse, indent);
            }
            NodeKind::For {
                target,
                iter,
                body,
                orelse,
            } => {
                let text = format!("for {} in {}:", self.expr(*target).0, self.expr(*iter).0);
                self.line(indent, &text);
                self.suite(body, indent + 1);
                self.else_clause(orelse, indent);
            }
            NodeKind::Pass => self.line(indent, "pass"),
            NodeKind::Break => self.line(indent, "break"),
            NodeKind::Continue => self.line(indent, "continue"),
            NodeKind::Raw { text } => self.line(indent, text),
            _ => {
                let text = self.expr(node).0;
                self.line(indent, &text);
            }
        }
    }

    /// `else` branch of an `if`, folding a lone nested `if` into `elif`
    fn orelse(&mut self, orelse: &[NodeRef], indent: usize) {
        let ast = self.ast;
        if let [single] = orelse {
            if let NodeKind::If { test, body, orelse } = &ast[*single].kind {
                let text = format!("elif {}:", self.expr(*test).0);
                self.line(indent, &text);
                self.suite(body, indent + 1);
                self.orelse(orelse, indent);
                return;
            }
        }
        self.else_clause(orelse, indent);
    }

    fn handler(&mut self, node: NodeRef, star: bool, indent: usize) {
        let NodeKind::ExceptHandler { typ, name, body } = &self.ast[node].kind else {
            return;
        };
        let mut text = if star { "except*" } else { "except" }.to_string();
        if let Some(typ) = typ {
            text.push(' ');
            text.push_str(&self.wrap(*typ, prec::TEST));
        }
        if let Some(name) = name {
            text.push_str(" as ");
            text.push_str(&self.expr(*name).0);
        }
        text.push(':');
        self.line(indent, &text);
        self.suite(body, indent + 1);
    }

    fn else_clause(&mut self, orelse: &[NodeRef], indent: usize) {
        if !orelse.is_empty() {
            self.line(indent, "else:");
            self.block(orelse, indent + 1);
        }
    }

    fn param(&self, node: NodeRef) -> String {
        let NodeKind::Param {
            name,
            kind,
            annotation,
            default,
        } = &self.ast[node].kind
        else {
            return self.expr(node).0;
        };
        let mut text = match kind {
            ParamKind::Positional => name.clone(),
            ParamKind::VarArgs => format!("*{}", name),
            ParamKind::KwArgs => format!("**{}", name),
        };
        if let Some(annotation) = annotation {
            text.push_str(": ");
            text.push_str(&self.expr(*annotation).0);
        }
        if let Some(default) = default {
            text.push_str(if annotation.is_some() { " = " } else { "=" });
            text.push_str(&self.wrap(*default, prec::TEST));
        }
        text
    }

    fn list(&self, nodes: &[NodeRef]) -> String {
        nodes
            .iter()
            .map(|n| self.wrap(*n, prec::TEST))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Render `node`, parenthesized when it binds looser than `min`
    fn wrap(&self, node: NodeRef, min: u8) -> String {
        let (text, level) = self.expr(node);
        if level < min {
            format!("({})", text)
        } else {
            text
        }
    }

    fn expr(&self, node: NodeRef) -> (String, u8) {
        match &self.ast[node].kind {
            NodeKind::Name { id, .. } => (id.clone(), prec::ATOM),
            NodeKind::Constant(constant) => {
                let text = match constant {
                    Constant::Number(text) | Constant::Str(text) => text.clone(),
                    Constant::Bool(true) => "True".to_string(),
                    Constant::Bool(false) => "False".to_string(),
                    Constant::None => "None".to_string(),
                    Constant::Ellipsis => "...".to_string(),
                };
                (text, prec::ATOM)
            }
            NodeKind::FormattedStr { pieces, values } => {
                let mut text = String::new();
                for (i, piece) in pieces.iter().enumerate() {
                    text.push_str(piece);
                    if let Some(value) = values.get(i) {
                        text.push_str(&self.wrap(*value, prec::TEST));
                    }
                }
                (text, prec::ATOM)
            }
            NodeKind::Other { kind, pieces, values } => {
                let mut text = String::new();
                for (i, piece) in pieces.iter().enumerate() {
                    text.push_str(piece);
                    if let Some(value) = values.get(i) {
                        text.push_str(&self.expr(*value).0);
                    }
                }
                (text, other_prec(kind))
            }
            NodeKind::Raw { text } => (text.clone(), prec::ATOM),
            NodeKind::Tuple { elts, .. } => {
                let text = match elts.as_slice() {
                    [single] => format!("({},)", self.wrap(*single, prec::TEST)),
                    _ => format!("({})", self.list(elts)),
                };
                (text, prec::ATOM)
            }
            NodeKind::List { elts, .. } => (format!("[{}]", self.list(elts)), prec::ATOM),
            NodeKind::Dict { keys, values } => {
                let entries: Vec<String> = keys
                    .iter()
                    .zip(values)
                    .map(|(k, v)| {
                        format!("{}: {}", self.wrap(*k, prec::TEST), self.wrap(*v, prec::TEST))
                    })
                    .collect();
                (format!("{{{}}}", entries.join(", ")), prec::ATOM)
            }
            NodeKind::Starred { value, .. } => {
                (format!("*{}", self.wrap(*value, prec::BOR)), prec::ATOM)
            }
            NodeKind::Keyword { arg, value } => {
                let text = match arg {
                    Some(arg) => format!("{}={}", arg, self.wrap(*value, prec::TEST)),
                    None => format!("**{}", self.wrap(*value, prec::BOR)),
                };
                (text, prec::ATOM)
            }
            NodeKind::Call {
                func,
                args,
                keywords,
            } => {
                let callee = self.wrap(*func, prec::PRIMARY);
                if let ([single], []) = (args.as_slice(), keywords.as_slice()) {
                    if let NodeKind::Comprehension {
                        kind: CompKind::Generator,
                        ..
                    } = &self.ast[*single].kind
                    {
                        let text = format!("{}{}", callee, self.expr(*single).0);
                        return (text, prec::PRIMARY);
                    }
                }
                let mut parts: Vec<String> = args.iter().map(|a| self.wrap(*a, prec::TEST)).collect();
                parts.extend(keywords.iter().map(|k| self.expr(*k).0));
                (format!("{}({})", callee, parts.join(", ")), prec::PRIMARY)
            }
            NodeKind::Attribute { value, attr, .. } => (
                format!("{}.{}", self.wrap(*value, prec::PRIMARY), attr),
                prec::PRIMARY,
            ),
            NodeKind::Subscript { value, slice, .. } => {
                // `x[a, b:c]` indexes with a tuple that cannot be parenthesized
                let index = match &self.ast[*slice].kind {
                    NodeKind::Tuple { elts, .. } if elts.len() > 1 => self.list(elts),
                    _ => self.wrap(*slice, prec::TEST),
                };
                (
                    format!("{}[{}]", self.wrap(*value, prec::PRIMARY), index),
                    prec::PRIMARY,
                )
            }
            NodeKind::Slice { lower, upper, step } => {
                let part = |node: &Option<NodeRef>| {
                    node.map(|n| self.wrap(n, prec::TEST)).unwrap_or_default()
                };
                let mut text = format!("{}:{}", part(lower), part(upper));
                if step.is_some() {
                    text.push(':');
                    text.push_str(&part(step));
                }
                (text, prec::ATOM)
            }
            NodeKind::Set { elts } => (format!("{{{}}}", self.list(elts)), prec::ATOM),
            NodeKind::Lambda { params, body } => {
                let params: Vec<String> = params.iter().map(|p| self.param(*p)).collect();
                let head = if params.is_empty() {
                    "lambda".to_string()
                } else {
                    format!("lambda {}", params.join(", "))
                };
                (
                    format!("{}: {}", head, self.wrap(*body, prec::TEST)),
                    prec::TEST,
                )
            }
            NodeKind::Comprehension {
                kind,
                elt,
                value,
                generators,
            } => {
                let clauses: String = generators
                    .iter()
                    .map(|g| format!(" {}", self.expr(*g).0))
                    .collect();
                let elt = self.wrap(*elt, prec::TEST);
                let text = match (kind, value) {
                    (CompKind::Dict, Some(value)) => {
                        format!("{{{}: {}{}}}", elt, self.wrap(*value, prec::TEST), clauses)
                    }
                    (CompKind::List, _) => format!("[{}{}]", elt, clauses),
                    (CompKind::Generator, _) => format!("({}{})", elt, clauses),
                    (CompKind::Set | CompKind::Dict, _) => format!("{{{}{}}}", elt, clauses),
                };
                (text, prec::ATOM)
            }
            NodeKind::CompFor {
                target,
                iter,
                ifs,
                is_async,
            } => {
                let mut text = format!(
                    "{}for {} in {}",
                    if *is_async { "async " } else { "" },
                    self.expr(*target).0,
                    self.wrap(*iter, prec::OR)
                );
                for test in ifs {
                    text.push_str(" if ");
                    text.push_str(&self.wrap(*test, prec::OR));
                }
                (text, prec::ATOM)
            }
            NodeKind::NamedExpr { target, value } => (
                format!("({} := {})", self.expr(*target).0, self.wrap(*value, prec::TEST)),
                prec::ATOM,
            ),
            NodeKind::WithItem {
                context_expr,
                optional_vars,
            } => {
                let mut text = self.wrap(*context_expr, prec::TEST);
                if let Some(vars) = optional_vars {
                    text.push_str(" as ");
                    text.push_str(&self.expr(*vars).0);
                }
                (text, prec::TEST)
            }
            NodeKind::BinOp { left, op, right } => {
                let level = binop_prec(op);
                // `**` is right-associative, everything else left-associative
                let (left_min, right_min) = if op == "**" {
                    (level + 1, level)
                } else {
                    (level, level + 1)
                };
                let text = format!(
                    "{} {} {}",
                    self.wrap(*left, left_min),
                    op,
                    self.wrap(*right, right_min)
                );
                (text, level)
            }
            NodeKind::UnaryOp { op, operand } => {
                if op == "not" {
                    (format!("not {}", self.wrap(*operand, prec::NOT)), prec::NOT)
                } else {
                    (
                        format!("{}{}", op, self.wrap(*operand, prec::FACTOR)),
                        prec::FACTOR,
                    )
                }
            }
            NodeKind::Compare {
                left,
                ops,
                comparators,
            } => {
                let mut text = self.wrap(*left, prec::CMP + 1);
                for (op, comparator) in ops.iter().zip(comparators) {
                    text.push(' ');
                    text.push_str(op);
                    text.push(' ');
                    text.push_str(&self.wrap(*comparator, prec::CMP + 1));
                }
                (text, prec::CMP)
            }
            NodeKind::IfExp { test, body, orelse } => (
                format!(
                    "{} if {} else {}",
                    self.wrap(*body, prec::TEST + 1),
                    self.wrap(*test, prec::TEST + 1),
                    self.wrap(*orelse, prec::TEST)
                ),
                prec::TEST,
            ),
            NodeKind::Param { name, .. } => (name.clone(), prec::ATOM),
            NodeKind::Module { .. }
            | NodeKind::FunctionDef { .. }
            | NodeKind::ClassDef { .. }
            | NodeKind::Assign { .. }
            | NodeKind::AugAssign { .. }
            | NodeKind::AnnAssign { .. }
            | NodeKind::Raise { .. }
            | NodeKind::Assert { .. }
            | NodeKind::Delete { .. }
            | NodeKind::Try { .. }
            | NodeKind::ExceptHandler { .. }
            | NodeKind::With { .. }
            | NodeKind::Return { .. }
            | NodeKind::Expr { .. }
            | NodeKind::If { .. }
            | NodeKind::While { .. }
            | NodeKind::For { .. }
            | NodeKind::Pass
            | NodeKind::Break
            | NodeKind::Continue => {
                let mut nested = Printer {
                    ast: self.ast,
                    out: String::new(),
                };
                nested.stmt(node, 0);
                (nested.out.trim_end().to_string(), prec::ATOM)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::python::parse;

    fn round_trip(source: &str) -> String {
        to_source(&parse(source).unwrap())
    }

    #[test]
    fn test_round_trip_is_stable() {
        let sources = [
            "x = 1\ny = x + 2\nprint(x, y)\n",
            "def f(a, b=2, *rest, **opts):\n    return a * (b + 1)\n",
            "@cache\ndef g(n: int) -> int:\n    if n < 2:\n        return n\n    elif n == 2:\n        return 1\n    else:\n        return g(n - 1) + g(n - 2)\n",
            "for i in range(10):\n    if not i:\n        continue\n    total += i\nelse:\n    pass\n",
            "while x and not y:\n    break\n",
            "class C(Base, metaclass=Meta):\n    attr = {\"k\": [1, 2]}\n",
            "import os\nfrom sys import argv\nv = os.path.join(argv[1], \"x\")\n",
            "a = b = c\n(p, q) = (q, p)\nr = -x ** 2\nt = (1,)\n",
            "z = a if c else b\nmsg = f\"{z} and {a + 1}\"\n",
        ];
        for source in sources {
            assert_eq!(round_trip(source), source);
        }
    }

    #[test]
    fn test_round_trip_extended_constructs() {
        let sources = [
            "try:\n    x = risky()\nexcept (KeyError, ValueError) as err:\n    raise RuntimeError(err) from err\nexcept Exception:\n    pass\nelse:\n    del x\nfinally:\n    done()\n",
            "with open(p) as fh, lock:\n    data: list[int] = fh.read()\n",
            "y = xs[1:2, ::3]\nz = {a: b for (a, b) in pairs if a}\nw = sorted(n for n in ns)\n",
            "if (m := find(y)):\n    assert m, \"missing\"\n",
            "f = lambda: 0\ng = lambda a, b=1: a + b\ns = {1, 2}\n",
            "def gen(a, *, b):\n    x = yield a\n    total = await fetch(x)\n    return f\"{total:{b}}\"\n",
        ];
        for source in sources {
            assert_eq!(round_trip(source), source);
        }
    }

    #[test]
    fn test_try_without_handlers_keeps_finally() {
        let mut ast = Ast::new();
        let stmt = ast.add(NodeKind::Try {
            body: vec![],
            handlers: vec![],
            orelse: vec![],
            finalbody: vec![],
            star: false,
        });
        ast.push_statement(stmt);
        assert_eq!(to_source(&ast), "try:\n    pass\nfinally:\n    pass\n");
    }

    #[test]
    fn test_bare_tuples_get_parentheses() {
        assert_eq!(round_trip("a, b = 1, 2\n"), "(a, b) = (1, 2)\n");
    }

    #[test]
    fn test_parentheses_follow_precedence() {
        assert_eq!(round_trip("x = (a + b) * c\n"), "x = (a + b) * c\n");
        assert_eq!(round_trip("x = a + (b * c)\n"), "x = a + b * c\n");
        assert_eq!(round_trip("x = a - (b - c)\n"), "x = a - (b - c)\n");
        assert_eq!(round_trip("x = (a or b) and c\n"), "x = (a or b) and c\n");
        assert_eq!(round_trip("x = (f)(y).z\n"), "x = f(y).z\n");
    }

    #[test]
    fn test_empty_body_prints_pass() {
        let mut ast = Ast::new();
        let def = ast.add(NodeKind::FunctionDef {
            name: "f".to_string(),
            params: vec![],
            body: vec![],
            decorators: vec![],
            returns: None,
        });
        ast.push_statement(def);
        assert_eq!(to_source(&ast), "def f():\n    pass\n");
    }

    #[test]
    fn test_comments_are_dropped() {
        assert_eq!(round_trip("# note\nx = 1  # trailing\n"), "x = 1\n");
    }
}
