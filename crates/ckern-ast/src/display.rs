//! C source printer.
//!
//! Renders a tree back to C, mainly so that intermediate stages of the
//! pipeline can be inspected and diffed. Parentheses are inserted from
//! operator precedence, so the printed text re-parses to the same tree.
//! Statement bodies are always braced.

use std::fmt::{self, Write as _};

use crate::node::{
    Compound, Decl, Expr, ExprKind, ExternalDecl, FileAst, ForInit, FuncDef, Stmt,
    StmtKind, TypeNode, UnaryOp,
};

const INDENT: &str = "    ";

struct Printer {
    out: String,
    depth: usize,
}

impl Printer {
    fn new() -> Self {
        Self {
            out: String::new(),
            depth: 0,
        }
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn file(&mut self, file: &FileAst) {
        for (i, ext) in file.ext.iter().enumerate() {
            if i > 0 && matches!(ext, ExternalDecl::FuncDef(_)) {
                self.out.push('\n');
            }
            self.external(ext);
        }
    }

    fn external(&mut self, ext: &ExternalDecl) {
        match ext {
            ExternalDecl::Decl(d) => self.line(&format!("{};", decl_text(d))),
            ExternalDecl::FuncDef(f) => self.func_def(f),
        }
    }

    fn func_def(&mut self, def: &FuncDef) {
        self.line(&format!("{} {{", decl_text(&def.decl)));
        self.block_items(&def.body);
        self.line("}");
    }

    fn block_items(&mut self, compound: &Compound) {
        self.depth += 1;
        for stmt in &compound.items {
            self.stmt(stmt);
        }
        self.depth -= 1;
    }

    /// Print `head {` + body + `}`; a compound body is not nested twice.
    fn braced(&mut self, head: &str, body: &Stmt, tail: &str) {
        self.line(&format!("{head} {{"));
        self.body(body);
        self.line(&format!("}}{tail}"));
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Decl(d) => self.line(&format!("{};", decl_text(d))),
            StmtKind::Compound(c) => {
                self.line("{");
                self.block_items(c);
                self.line("}");
            }
            StmtKind::Expr(e) => self.line(&format!("{e};")),
            StmtKind::If {
                cond,
                then,
                otherwise,
            } => {
                self.line(&format!("if ({cond}) {{"));
                self.body(then);
                let mut next = otherwise.as_deref();
                while let Some(branch) = next {
                    match &branch.kind {
                        StmtKind::If {
                            cond,
                            then,
                            otherwise,
                        } => {
                            self.line(&format!("}} else if ({cond}) {{"));
                            self.body(then);
                            next = otherwise.as_deref();
                        }
                        _ => {
                            self.line("} else {");
                            self.body(branch);
                            next = None;
                        }
                    }
                }
                self.line("}");
            }
            StmtKind::For {
                init,
                cond,
                next,
                body,
            } => {
                let init = match init {
                    Some(ForInit::Decls(decls)) => decl_list_text(decls),
                    Some(ForInit::Expr(e)) => e.to_string(),
                    None => String::new(),
                };
                let cond = cond.as_ref().map(Expr::to_string).unwrap_or_default();
                let next = next.as_ref().map(Expr::to_string).unwrap_or_default();
                self.braced(&format!("for ({init}; {cond}; {next})"), body, "");
            }
            StmtKind::While { cond, body } => self.braced(&format!("while ({cond})"), body, ""),
            StmtKind::DoWhile { cond, body } => {
                self.braced("do", body, &format!(" while ({cond});"))
            }
            StmtKind::Return(Some(e)) => self.line(&format!("return {e};")),
            StmtKind::Return(None) => self.line("return;"),
            StmtKind::Break => self.line("break;"),
            StmtKind::Continue => self.line("continue;"),
            StmtKind::Goto(label) => self.line(&format!("goto {label};")),
            StmtKind::Label { name, stmt } => {
                self.depth = self.depth.saturating_sub(1);
                self.line(&format!("{name}:"));
                self.depth += 1;
                self.stmt(stmt);
            }
            StmtKind::Empty => self.line(";"),
        }
    }

    fn body(&mut self, body: &Stmt) {
        match &body.kind {
            StmtKind::Compound(c) => self.block_items(c),
            _ => {
                self.depth += 1;
                self.stmt(body);
                self.depth -= 1;
            }
        }
    }
}

/// `storage quals type declarator [= init]`.
fn decl_text(decl: &Decl) -> String {
    let mut text = String::new();
    for s in &decl.storage {
        text.push_str(s.as_str());
        text.push(' ');
    }
    for q in &decl.quals {
        text.push_str(q);
        text.push(' ');
    }
    text.push_str(decl.scalar_type().c_name());
    let declarator = declarator_text(decl.name.as_deref().unwrap_or(""), &decl.ty);
    if !declarator.is_empty() {
        text.push(' ');
        text.push_str(&declarator);
    }
    if let Some(init) = &decl.init {
        let _ = write!(text, " = {init}");
    }
    text
}

fn declarator_text(name: &str, ty: &TypeNode) -> String {
    match ty {
        TypeNode::TypeDecl(_) => name.to_string(),
        TypeNode::ArrayDecl(arr) => {
            let dim = arr.dim.as_ref().map(|d| d.to_string()).unwrap_or_default();
            format!("{}[{dim}]", declarator_text(name, &arr.ty))
        }
        TypeNode::FuncDecl(f) => {
            let params = if f.params.is_empty() {
                "void".to_string()
            } else {
                f.params.iter().map(decl_text).collect::<Vec<_>>().join(", ")
            };
            format!("{}({params})", declarator_text(name, &f.ty))
        }
    }
}

/// Declarations sharing one specifier, as in a `for` initializer.
fn decl_list_text(decls: &[Decl]) -> String {
    let mut parts = Vec::with_capacity(decls.len());
    for (i, d) in decls.iter().enumerate() {
        if i == 0 {
            parts.push(decl_text(d));
        } else {
            let mut part = declarator_text(d.name.as_deref().unwrap_or(""), &d.ty);
            if let Some(init) = &d.init {
                let _ = write!(part, " = {init}");
            }
            parts.push(part);
        }
    }
    parts.join(", ")
}

/// Write `expr`, parenthesized when it binds looser than `min`.
fn operand(f: &mut fmt::Formatter<'_>, expr: &Expr, min: u8) -> fmt::Result {
    if expr.precedence() < min {
        write!(f, "({expr})")
    } else {
        write!(f, "{expr}")
    }
}

/// `-(-x)` and `+(++x)` must not collapse into a different token.
fn fuses(op: UnaryOp, inner: &Expr) -> bool {
    match &inner.kind {
        ExprKind::Unary { op: inner_op, .. } if !inner_op.is_postfix() => {
            op.symbol().chars().last() == inner_op.symbol().chars().next()
        }
        _ => false,
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Id(name) => f.write_str(name),
            ExprKind::Constant(c) => f.write_str(&c.value),
            ExprKind::Binary { op, left, right } => {
                let p = op.precedence();
                operand(f, left, p)?;
                write!(f, " {op} ")?;
                operand(f, right, p + 1)
            }
            ExprKind::Unary { op, operand: inner } if op.is_postfix() => {
                operand(f, inner, 15)?;
                f.write_str(op.symbol())
            }
            ExprKind::Unary { op, operand: inner } => {
                f.write_str(op.symbol())?;
                if fuses(*op, inner) {
                    write!(f, "({inner})")
                } else {
                    operand(f, inner, 14)
                }
            }
            ExprKind::Assign { op, target, value } => {
                operand(f, target, 14)?;
                write!(f, " {} ", op.symbol())?;
                operand(f, value, 2)
            }
            ExprKind::Ternary {
                cond,
                then,
                otherwise,
            } => {
                operand(f, cond, 4)?;
                f.write_str(" ? ")?;
                operand(f, then, 2)?;
                f.write_str(" : ")?;
                operand(f, otherwise, 3)
            }
            ExprKind::Call { name, args } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    operand(f, arg, 2)?;
                }
                f.write_str(")")
            }
            ExprKind::Cast { to, expr } => {
                write!(f, "({}) ", to.c_name())?;
                operand(f, expr, 14)
            }
            ExprKind::Index { array, index } => {
                operand(f, array, 15)?;
                write!(f, "[{index}]")
            }
            ExprKind::InitList(items) => {
                f.write_str("{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    operand(f, item, 2)?;
                }
                f.write_str("}")
            }
            ExprKind::Comma(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    operand(f, item, 2)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Decl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&decl_text(self))
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut p = Printer::new();
        p.stmt(self);
        f.write_str(&p.out)
    }
}

impl fmt::Display for FuncDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut p = Printer::new();
        p.func_def(self);
        f.write_str(&p.out)
    }
}

impl fmt::Display for ExternalDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut p = Printer::new();
        p.external(self);
        f.write_str(&p.out)
    }
}

impl fmt::Display for FileAst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut p = Printer::new();
        p.file(self);
        f.write_str(&p.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{AssignOp, BinaryOp, Compound};
    use crate::types::ScalarType;

    #[test]
    fn precedence_parentheses() {
        // (a + b) * c
        let e = Expr::binary(
            BinaryOp::Mul,
            Expr::binary(BinaryOp::Add, Expr::id("a"), Expr::id("b")),
            Expr::id("c"),
        );
        assert_eq!(e.to_string(), "(a + b) * c");

        // a - (b - c)
        let e = Expr::binary(
            BinaryOp::Sub,
            Expr::id("a"),
            Expr::binary(BinaryOp::Sub, Expr::id("b"), Expr::id("c")),
        );
        assert_eq!(e.to_string(), "a - (b - c)");

        // a * b + c needs none
        let e = Expr::binary(
            BinaryOp::Add,
            Expr::binary(BinaryOp::Mul, Expr::id("a"), Expr::id("b")),
            Expr::id("c"),
        );
        assert_eq!(e.to_string(), "a * b + c");
    }

    #[test]
    fn nested_negation_stays_separate() {
        let e = Expr::unary(UnaryOp::Neg, Expr::unary(UnaryOp::Neg, Expr::id("x")));
        assert_eq!(e.to_string(), "-(-x)");
        let e = Expr::unary(UnaryOp::Neg, Expr::unary(UnaryOp::Not, Expr::id("x")));
        assert_eq!(e.to_string(), "-!x");
    }

    #[test]
    fn calls_casts_and_assignments() {
        let e = Expr::assign(
            AssignOp::Add,
            Expr::index(Expr::id("P"), Expr::int(0)),
            Expr::call(
                "sin",
                vec![Expr::new(ExprKind::Cast {
                    to: ScalarType::Float,
                    expr: Box::new(Expr::binary(BinaryOp::Add, Expr::id("n"), Expr::int(1))),
                })],
            ),
        );
        assert_eq!(e.to_string(), "P[0] += sin((float) (n + 1))");
    }

    #[test]
    fn prints_function() {
        let def = FuncDef {
            decl: Decl::prototype(
                "sq",
                ScalarType::Float,
                vec![Decl::scalar("x", ScalarType::Float, None)],
            ),
            body: Compound::new(vec![
                Stmt::if_then(
                    Expr::binary(BinaryOp::Lt, Expr::id("x"), Expr::float("0.0")),
                    Stmt::ret(Some(Expr::float("0.0"))),
                    Some(Stmt::ret(Some(Expr::id("x")))),
                ),
            ]),
            coord: None,
        };
        let expected = "\
float sq(float x) {
    if (x < 0.0) {
        return 0.0;
    } else {
        return x;
    }
}
";
        assert_eq!(def.to_string(), expected);
    }

    #[test]
    fn prints_static_array() {
        let mut d = Decl::array(
            "P",
            ScalarType::Float,
            None,
            Some(Expr::new(ExprKind::InitList(vec![
                Expr::float("1.0"),
                Expr::float("2.0"),
            ]))),
        );
        d.storage.push(crate::node::Storage::Static);
        d.quals.push("const".into());
        assert_eq!(d.to_string(), "static const float P[] = {1.0, 2.0}");
    }

    #[test]
    fn prototype_without_params_prints_void() {
        let d = Decl::prototype("f", ScalarType::Int, Vec::new());
        assert_eq!(d.to_string(), "int f(void)");
    }
}
