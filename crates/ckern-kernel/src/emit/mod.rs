//! Code generation from normalized trees.
//!
//! Both dialects share C's statement and expression grammar, so a single
//! [`Writer`] walks the tree and defers the handful of dialect-specific
//! spellings (signatures, local declarations, literals, equality) to a
//! [`Dialect`]. The input must already be normalized: casts, `goto`, and
//! labels are rejected here rather than translated.

pub mod glsl;
pub mod js;

use ckern_ast::{
    BinaryOp, Compound, ConstKind, Constant, Decl, Expr, ExprKind, ForInit, FuncDef, ScalarType,
    Stmt, StmtKind,
};

use crate::error::{KernelError, Result};
use crate::kernel::FunctionCode;
use crate::target::TargetFamily;

pub use glsl::Glsl;
pub use js::Js;

const INDENT: &str = "    ";

/// Dialect-specific spellings.
pub trait Dialect {
    fn family(&self) -> TargetFamily;

    /// Function signature without a trailing `{` or `;`.
    fn signature(&self, def: &FuncDef) -> Result<String>;

    /// Forward declaration, if the dialect needs one.
    fn prototype(&self, def: &FuncDef) -> Result<Option<String>>;

    /// Scalar local declaration without the trailing `;`.
    fn scalar_local(&self, ty: ScalarType, name: &str, init: Option<String>) -> String;

    /// Array local declaration without the trailing `;`. Elements are
    /// assigned one by one afterwards.
    fn array_local(&self, ty: ScalarType, name: &str, len: usize) -> String;

    fn float_literal(&self, text: &str) -> String;

    fn binary_op(&self, op: BinaryOp) -> &'static str {
        op.symbol()
    }

    fn allows_while(&self) -> bool;
}

/// Emit `def` in the dialect of `family`.
pub fn emit_function(def: &FuncDef, family: TargetFamily) -> Result<FunctionCode> {
    match family {
        TargetFamily::Shader => emit_with(&Glsl, def),
        TargetFamily::Scalar => emit_with(&Js, def),
    }
}

/// Emit `def` with an explicit dialect.
pub fn emit_with<D: Dialect>(dialect: &D, def: &FuncDef) -> Result<FunctionCode> {
    let mut w = Writer::new(dialect, def.name());
    let signature = dialect.signature(def)?;
    w.line(&format!("{signature} {{"));
    w.depth += 1;
    w.items(&def.body)?;
    w.depth -= 1;
    w.line("}");
    Ok(FunctionCode {
        prototype: dialect.prototype(def)?,
        body: w.out,
    })
}

/// Literal without any C suffix.
pub(crate) fn strip_suffix(text: &str) -> &str {
    text.trim_end_matches(['f', 'F', 'l', 'L'])
}

/// Walks one function body.
pub struct Writer<'d, D: Dialect> {
    dialect: &'d D,
    function: String,
    out: String,
    depth: usize,
}

impl<'d, D: Dialect> Writer<'d, D> {
    pub fn new(dialect: &'d D, function: &str) -> Self {
        Self {
            dialect,
            function: function.to_string(),
            out: String::new(),
            depth: 0,
        }
    }

    fn error(&self, detail: impl Into<String>) -> KernelError {
        KernelError::Emit {
            name: self.function.clone(),
            detail: detail.into(),
        }
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn items(&mut self, compound: &Compound) -> Result<()> {
        for stmt in &compound.items {
            self.stmt(stmt)?;
        }
        Ok(())
    }

    /// Body of a control statement; the braces are written by the caller.
    fn body(&mut self, stmt: &Stmt) -> Result<()> {
        self.depth += 1;
        let result = match &stmt.kind {
            StmtKind::Compound(c) => self.items(c),
            _ => self.stmt(stmt),
        };
        self.depth -= 1;
        result
    }

    fn stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match &stmt.kind {
            StmtKind::Decl(d) => self.local(d)?,
            StmtKind::Compound(c) => {
                self.line("{");
                self.depth += 1;
                self.items(c)?;
                self.depth -= 1;
                self.line("}");
            }
            StmtKind::Expr(e) => {
                let text = self.expr(e)?;
                self.line(&format!("{text};"));
            }
            StmtKind::If {
                cond,
                then,
                otherwise,
            } => {
                let cond = self.expr(cond)?;
                self.line(&format!("if ({cond}) {{"));
                self.body(then)?;
                let mut rest = otherwise.as_deref();
                while let Some(next) = rest {
                    match &next.kind {
                        StmtKind::If {
                            cond,
                            then,
                            otherwise,
                        } => {
                            let cond = self.expr(cond)?;
                            self.line(&format!("}} else if ({cond}) {{"));
                            self.body(then)?;
                            rest = otherwise.as_deref();
                        }
                        _ => {
                            self.line("} else {");
                            self.body(next)?;
                            rest = None;
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
                    None => String::new(),
                    Some(ForInit::Expr(e)) => self.expr(e)?,
                    Some(ForInit::Decls(decls)) => self.for_decls(decls)?,
                };
                let cond = cond.as_ref().map(|c| self.expr(c)).transpose()?;
                let next = next.as_ref().map(|n| self.expr(n)).transpose()?;
                self.line(&format!(
                    "for ({init}; {}; {}) {{",
                    cond.unwrap_or_default(),
                    next.unwrap_or_default()
                ));
                self.body(body)?;
                self.line("}");
            }
            StmtKind::While { cond, body } => {
                if !self.dialect.allows_while() {
                    return Err(self.error("while loop in shader code"));
                }
                let cond = self.expr(cond)?;
                self.line(&format!("while ({cond}) {{"));
                self.body(body)?;
                self.line("}");
            }
            StmtKind::DoWhile { cond, body } => {
                if !self.dialect.allows_while() {
                    return Err(self.error("do-while loop in shader code"));
                }
                self.line("do {");
                self.body(body)?;
                let cond = self.expr(cond)?;
                self.line(&format!("}} while ({cond});"));
            }
            StmtKind::Return(None) => self.line("return;"),
            StmtKind::Return(Some(e)) => {
                let text = self.expr(e)?;
                self.line(&format!("return {text};"));
            }
            StmtKind::Break => self.line("break;"),
            StmtKind::Continue => self.line("continue;"),
            StmtKind::Goto(label) => return Err(self.error(format!("goto {label}"))),
            StmtKind::Label { name, .. } => return Err(self.error(format!("label {name}"))),
            StmtKind::Empty => {}
        }
        Ok(())
    }

    fn local(&mut self, decl: &Decl) -> Result<()> {
        let name = decl
            .name
            .as_deref()
            .ok_or_else(|| self.error("unnamed local declaration"))?;
        let ty = decl.scalar_type();
        if !decl.is_array() {
            let init = decl.init.as_ref().map(|e| self.expr(e)).transpose()?;
            let text = self.dialect.scalar_local(ty, name, init);
            self.line(&format!("{text};"));
            return Ok(());
        }

        let len = decl
            .array_len()
            .ok_or_else(|| self.error(format!("local array '{name}' has no fixed size")))?;
        let text = self.dialect.array_local(ty, name, len);
        self.line(&format!("{text};"));
        match decl.init.as_ref().map(|e| &e.kind) {
            None => Ok(()),
            Some(ExprKind::InitList(items)) => {
                for (i, item) in items.iter().enumerate() {
                    let value = self.expr(item)?;
                    self.line(&format!("{name}[{i}] = {value};"));
                }
                Ok(())
            }
            Some(_) => Err(self.error(format!("array '{name}' initialized from an expression"))),
        }
    }

    fn for_decls(&self, decls: &[Decl]) -> Result<String> {
        let mut parts = Vec::with_capacity(decls.len());
        for (i, d) in decls.iter().enumerate() {
            let name = d
                .name
                .as_deref()
                .ok_or_else(|| self.error("unnamed loop variable"))?;
            if d.is_array() {
                return Err(self.error(format!("array '{name}' declared in a for initializer")));
            }
            let init = d.init.as_ref().map(|e| self.expr(e)).transpose()?;
            parts.push(if i == 0 {
                self.dialect.scalar_local(d.scalar_type(), name, init)
            } else {
                match init {
                    Some(init) => format!("{name} = {init}"),
                    None => name.to_string(),
                }
            });
        }
        Ok(parts.join(", "))
    }

    fn operand(&self, e: &Expr, min: u8) -> Result<String> {
        let text = self.expr(e)?;
        Ok(if e.precedence() < min {
            format!("({text})")
        } else {
            text
        })
    }

    pub fn expr(&self, e: &Expr) -> Result<String> {
        Ok(match &e.kind {
            ExprKind::Id(name) => name.clone(),
            ExprKind::Constant(c) => self.constant(c)?,
            ExprKind::Binary { op, left, right } => {
                let p = op.precedence();
                format!(
                    "{} {} {}",
                    self.operand(left, p)?,
                    self.dialect.binary_op(*op),
                    self.operand(right, p + 1)?
                )
            }
            ExprKind::Unary { op, operand } if op.is_postfix() => {
                format!("{}{}", self.operand(operand, 15)?, op.symbol())
            }
            ExprKind::Unary { op, operand } => {
                let inner = match &operand.kind {
                    // `-(-x)` must not become `--x`.
                    ExprKind::Unary { op: inner, .. }
                        if !inner.is_postfix()
                            && op.symbol().ends_with(&inner.symbol()[..1]) =>
                    {
                        format!("({})", self.expr(operand)?)
                    }
                    _ => self.operand(operand, 14)?,
                };
                format!("{}{inner}", op.symbol())
            }
            ExprKind::Assign { op, target, value } => format!(
                "{} {} {}",
                self.operand(target, 14)?,
                op.symbol(),
                self.operand(value, 2)?
            ),
            ExprKind::Ternary {
                cond,
                then,
                otherwise,
            } => format!(
                "{} ? {} : {}",
                self.operand(cond, 4)?,
                self.operand(then, 2)?,
                self.operand(otherwise, 3)?
            ),
            ExprKind::Call { name, args } => {
                let args = args
                    .iter()
                    .map(|a| self.operand(a, 2))
                    .collect::<Result<Vec<_>>>()?;
                format!("{name}({})", args.join(", "))
            }
            ExprKind::Index { array, index } => {
                format!("{}[{}]", self.operand(array, 15)?, self.expr(index)?)
            }
            ExprKind::Comma(items) => items
                .iter()
                .map(|i| self.operand(i, 2))
                .collect::<Result<Vec<_>>>()?
                .join(", "),
            ExprKind::Cast { to, .. } => {
                return Err(self.error(format!("cast to {to} left in normalized code")))
            }
            ExprKind::InitList(_) => {
                return Err(self.error("initializer list outside a declaration"))
            }
        })
    }

    fn constant(&self, c: &Constant) -> Result<String> {
        match c.kind {
            ConstKind::Int | ConstKind::Char => c
                .as_i64()
                .map(|v| v.to_string())
                .ok_or_else(|| self.error(format!("malformed literal {}", c.value))),
            ConstKind::Float => Ok(self.dialect.float_literal(&c.value)),
            ConstKind::Str => Err(self.error("string literal")),
        }
    }
}
