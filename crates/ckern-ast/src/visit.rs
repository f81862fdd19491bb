//! Tree traversal.
//!
//! [`VisitMut`] and [`Visit`] follow the usual visitor layout: every
//! `visit_*` method defaults to the matching `walk_*` function, which
//! recurses into the children. A pass overrides the methods for the node
//! kinds it cares about and calls the `walk_*` function itself when it
//! wants to keep descending. Replacement happens in place through the
//! `&mut` reference, so a visitor can swap a node for a different kind
//! without rebuilding its parent.
//!
//! Function parameter lists are not visited; passes read them through
//! [`FuncDef::params`](crate::FuncDef::params).
//!
//! For the common case of a bottom-up rewrite with a single closure,
//! [`rewrite_exprs`] and [`rewrite_compounds`] wrap the traits.

use std::convert::Infallible;
use std::marker::PhantomData;

use crate::node::{
    Compound, Decl, Expr, ExprKind, ExternalDecl, FileAst, ForInit, FuncDef, Stmt, StmtKind,
    TypeNode,
};

/// Mutable visitor. Errors abort the walk.
pub trait VisitMut {
    type Error;

    fn visit_file(&mut self, file: &mut FileAst) -> Result<(), Self::Error> {
        walk_file_mut(self, file)
    }

    fn visit_external(&mut self, ext: &mut ExternalDecl) -> Result<(), Self::Error> {
        walk_external_mut(self, ext)
    }

    fn visit_func_def(&mut self, def: &mut FuncDef) -> Result<(), Self::Error> {
        walk_func_def_mut(self, def)
    }

    fn visit_decl(&mut self, decl: &mut Decl) -> Result<(), Self::Error> {
        walk_decl_mut(self, decl)
    }

    fn visit_compound(&mut self, compound: &mut Compound) -> Result<(), Self::Error> {
        walk_compound_mut(self, compound)
    }

    fn visit_stmt(&mut self, stmt: &mut Stmt) -> Result<(), Self::Error> {
        walk_stmt_mut(self, stmt)
    }

    fn visit_expr(&mut self, expr: &mut Expr) -> Result<(), Self::Error> {
        walk_expr_mut(self, expr)
    }
}

pub fn walk_file_mut<V: VisitMut + ?Sized>(v: &mut V, file: &mut FileAst) -> Result<(), V::Error> {
    for ext in &mut file.ext {
        v.visit_external(ext)?;
    }
    Ok(())
}

pub fn walk_external_mut<V: VisitMut + ?Sized>(
    v: &mut V,
    ext: &mut ExternalDecl,
) -> Result<(), V::Error> {
    match ext {
        ExternalDecl::Decl(decl) => v.visit_decl(decl),
        ExternalDecl::FuncDef(def) => v.visit_func_def(def),
    }
}

pub fn walk_func_def_mut<V: VisitMut + ?Sized>(
    v: &mut V,
    def: &mut FuncDef,
) -> Result<(), V::Error> {
    v.visit_compound(&mut def.body)
}

pub fn walk_decl_mut<V: VisitMut + ?Sized>(v: &mut V, decl: &mut Decl) -> Result<(), V::Error> {
    if let TypeNode::ArrayDecl(arr) = &mut decl.ty {
        if let Some(dim) = &mut arr.dim {
            v.visit_expr(dim)?;
        }
    }
    if let Some(init) = &mut decl.init {
        v.visit_expr(init)?;
    }
    Ok(())
}

pub fn walk_compound_mut<V: VisitMut + ?Sized>(
    v: &mut V,
    compound: &mut Compound,
) -> Result<(), V::Error> {
    for stmt in &mut compound.items {
        v.visit_stmt(stmt)?;
    }
    Ok(())
}

pub fn walk_stmt_mut<V: VisitMut + ?Sized>(v: &mut V, stmt: &mut Stmt) -> Result<(), V::Error> {
    match &mut stmt.kind {
        StmtKind::Decl(decl) => v.visit_decl(decl),
        StmtKind::Compound(c) => v.visit_compound(c),
        StmtKind::Expr(e) => v.visit_expr(e),
        StmtKind::If {
            cond,
            then,
            otherwise,
        } => {
            v.visit_expr(cond)?;
            v.visit_stmt(then)?;
            if let Some(otherwise) = otherwise {
                v.visit_stmt(otherwise)?;
            }
            Ok(())
        }
        StmtKind::For {
            init,
            cond,
            next,
            body,
        } => {
            match init {
                Some(ForInit::Decls(decls)) => {
                    for decl in decls {
                        v.visit_decl(decl)?;
                    }
                }
                Some(ForInit::Expr(e)) => v.visit_expr(e)?,
                None => {}
            }
            if let Some(cond) = cond {
                v.visit_expr(cond)?;
            }
            if let Some(next) = next {
                v.visit_expr(next)?;
            }
            v.visit_stmt(body)
        }
        StmtKind::While { cond, body } | StmtKind::DoWhile { cond, body } => {
            v.visit_expr(cond)?;
            v.visit_stmt(body)
        }
        StmtKind::Return(Some(e)) => v.visit_expr(e),
        StmtKind::Label { stmt, .. } => v.visit_stmt(stmt),
        StmtKind::Return(None)
        | StmtKind::Break
        | StmtKind::Continue
        | StmtKind::Goto(_)
        | StmtKind::Empty => Ok(()),
    }
}

pub fn walk_expr_mut<V: VisitMut + ?Sized>(v: &mut V, expr: &mut Expr) -> Result<(), V::Error> {
    match &mut expr.kind {
        ExprKind::Id(_) | ExprKind::Constant(_) => Ok(()),
        ExprKind::Binary { left, right, .. } => {
            v.visit_expr(left)?;
            v.visit_expr(right)
        }
        ExprKind::Unary { operand, .. } => v.visit_expr(operand),
        ExprKind::Assign { target, value, .. } => {
            v.visit_expr(target)?;
            v.visit_expr(value)
        }
        ExprKind::Ternary {
            cond,
            then,
            otherwise,
        } => {
            v.visit_expr(cond)?;
            v.visit_expr(then)?;
            v.visit_expr(otherwise)
        }
        ExprKind::Cast { expr, .. } => v.visit_expr(expr),
        ExprKind::Index { array, index } => {
            v.visit_expr(array)?;
            v.visit_expr(index)
        }
        ExprKind::Call { args: items, .. }
        | ExprKind::InitList(items)
        | ExprKind::Comma(items) => {
            for item in items {
                v.visit_expr(item)?;
            }
            Ok(())
        }
    }
}

/// Read-only visitor.
pub trait Visit {
    type Error;

    fn visit_file(&mut self, file: &FileAst) -> Result<(), Self::Error> {
        walk_file(self, file)
    }

    fn visit_external(&mut self, ext: &ExternalDecl) -> Result<(), Self::Error> {
        walk_external(self, ext)
    }

    fn visit_func_def(&mut self, def: &FuncDef) -> Result<(), Self::Error> {
        walk_func_def(self, def)
    }

    fn visit_decl(&mut self, decl: &Decl) -> Result<(), Self::Error> {
        walk_decl(self, decl)
    }

    fn visit_compound(&mut self, compound: &Compound) -> Result<(), Self::Error> {
        walk_compound(self, compound)
    }

    fn visit_stmt(&mut self, stmt: &Stmt) -> Result<(), Self::Error> {
        walk_stmt(self, stmt)
    }

    fn visit_expr(&mut self, expr: &Expr) -> Result<(), Self::Error> {
        walk_expr(self, expr)
    }
}

pub fn walk_file<V: Visit + ?Sized>(v: &mut V, file: &FileAst) -> Result<(), V::Error> {
    for ext in &file.ext {
        v.visit_external(ext)?;
    }
    Ok(())
}

pub fn walk_external<V: Visit + ?Sized>(v: &mut V, ext: &ExternalDecl) -> Result<(), V::Error> {
    match ext {
        ExternalDecl::Decl(decl) => v.visit_decl(decl),
        ExternalDecl::FuncDef(def) => v.visit_func_def(def),
    }
}

pub fn walk_func_def<V: Visit + ?Sized>(v: &mut V, def: &FuncDef) -> Result<(), V::Error> {
    v.visit_compound(&def.body)
}

pub fn walk_decl<V: Visit + ?Sized>(v: &mut V, decl: &Decl) -> Result<(), V::Error> {
    if let TypeNode::ArrayDecl(arr) = &decl.ty {
        if let Some(dim) = &arr.dim {
            v.visit_expr(dim)?;
        }
    }
    if let Some(init) = &decl.init {
        v.visit_expr(init)?;
    }
    Ok(())
}

pub fn walk_compound<V: Visit + ?Sized>(v: &mut V, compound: &Compound) -> Result<(), V::Error> {
    for stmt in &compound.items {
        v.visit_stmt(stmt)?;
    }
    Ok(())
}

pub fn walk_stmt<V: Visit + ?Sized>(v: &mut V, stmt: &Stmt) -> Result<(), V::Error> {
    match &stmt.kind {
        StmtKind::Decl(decl) => v.visit_decl(decl),
        StmtKind::Compound(c) => v.visit_compound(c),
        StmtKind::Expr(e) => v.visit_expr(e),
        StmtKind::If {
            cond,
            then,
            otherwise,
        } => {
            v.visit_expr(cond)?;
            v.visit_stmt(then)?;
            if let Some(otherwise) = otherwise {
                v.visit_stmt(otherwise)?;
            }
            Ok(())
        }
        StmtKind::For {
            init,
            cond,
            next,
            body,
        } => {
            match init {
                Some(ForInit::Decls(decls)) => {
                    for decl in decls {
                        v.visit_decl(decl)?;
                    }
                }
                Some(ForInit::Expr(e)) => v.visit_expr(e)?,
                None => {}
            }
            if let Some(cond) = cond {
                v.visit_expr(cond)?;
            }
            if let Some(next) = next {
                v.visit_expr(next)?;
            }
            v.visit_stmt(body)
        }
        StmtKind::While { cond, body } | StmtKind::DoWhile { cond, body } => {
            v.visit_expr(cond)?;
            v.visit_stmt(body)
        }
        StmtKind::Return(Some(e)) => v.visit_expr(e),
        StmtKind::Label { stmt, .. } => v.visit_stmt(stmt),
        StmtKind::Return(None)
        | StmtKind::Break
        | StmtKind::Continue
        | StmtKind::Goto(_)
        | StmtKind::Empty => Ok(()),
    }
}

pub fn walk_expr<V: Visit + ?Sized>(v: &mut V, expr: &Expr) -> Result<(), V::Error> {
    match &expr.kind {
        ExprKind::Id(_) | ExprKind::Constant(_) => Ok(()),
        ExprKind::Binary { left, right, .. } => {
            v.visit_expr(left)?;
            v.visit_expr(right)
        }
        ExprKind::Unary { operand, .. } => v.visit_expr(operand),
        ExprKind::Assign { target, value, .. } => {
            v.visit_expr(target)?;
            v.visit_expr(value)
        }
        ExprKind::Ternary {
            cond,
            then,
            otherwise,
        } => {
            v.visit_expr(cond)?;
            v.visit_expr(then)?;
            v.visit_expr(otherwise)
        }
        ExprKind::Cast { expr, .. } => v.visit_expr(expr),
        ExprKind::Index { array, index } => {
            v.visit_expr(array)?;
            v.visit_expr(index)
        }
        ExprKind::Call { args: items, .. }
        | ExprKind::InitList(items)
        | ExprKind::Comma(items) => {
            for item in items {
                v.visit_expr(item)?;
            }
            Ok(())
        }
    }
}

struct ExprRewriter<F, E> {
    f: F,
    _err: PhantomData<fn() -> E>,
}

impl<F, E> VisitMut for ExprRewriter<F, E>
where
    F: FnMut(&mut Expr) -> Result<(), E>,
{
    type Error = E;

    fn visit_expr(&mut self, expr: &mut Expr) -> Result<(), E> {
        walk_expr_mut(self, expr)?;
        (self.f)(expr)
    }
}

struct CompoundRewriter<F, E> {
    f: F,
    _err: PhantomData<fn() -> E>,
}

impl<F, E> VisitMut for CompoundRewriter<F, E>
where
    F: FnMut(&mut Compound) -> Result<(), E>,
{
    type Error = E;

    fn visit_compound(&mut self, compound: &mut Compound) -> Result<(), E> {
        walk_compound_mut(self, compound)?;
        (self.f)(compound)
    }

    fn visit_expr(&mut self, _expr: &mut Expr) -> Result<(), E> {
        Ok(())
    }
}

/// Rewrite every expression under `compound`, children before parents.
pub fn rewrite_exprs<F, E>(compound: &mut Compound, f: F) -> Result<(), E>
where
    F: FnMut(&mut Expr) -> Result<(), E>,
{
    ExprRewriter {
        f,
        _err: PhantomData,
    }
    .visit_compound(compound)
}

/// Rewrite every expression in a single declaration (dimension and initializer).
pub fn rewrite_decl_exprs<F, E>(decl: &mut Decl, f: F) -> Result<(), E>
where
    F: FnMut(&mut Expr) -> Result<(), E>,
{
    ExprRewriter {
        f,
        _err: PhantomData,
    }
    .visit_decl(decl)
}

/// Rewrite every block under and including `compound`, innermost first.
pub fn rewrite_compounds<F, E>(compound: &mut Compound, f: F) -> Result<(), E>
where
    F: FnMut(&mut Compound) -> Result<(), E>,
{
    CompoundRewriter {
        f,
        _err: PhantomData,
    }
    .visit_compound(compound)
}

fn infallible(result: Result<(), Infallible>) {
    match result {
        Ok(()) => {}
        Err(never) => match never {},
    }
}

struct ExprInspector<F>(F);

impl<F: FnMut(&Expr)> Visit for ExprInspector<F> {
    type Error = Infallible;

    fn visit_expr(&mut self, expr: &Expr) -> Result<(), Infallible> {
        (self.0)(expr);
        walk_expr(self, expr)
    }
}

/// Call `f` on every expression under `compound`, parents before children.
pub fn each_expr<F: FnMut(&Expr)>(compound: &Compound, f: F) {
    infallible(ExprInspector(f).visit_compound(compound))
}

/// Call `f` on `expr` and every expression below it, parents first.
pub fn each_subexpr<F: FnMut(&Expr)>(expr: &Expr, f: F) {
    infallible(ExprInspector(f).visit_expr(expr))
}

/// Rewrite `expr` and every expression below it, children first.
pub fn rewrite_subexprs<F, E>(expr: &mut Expr, f: F) -> Result<(), E>
where
    F: FnMut(&mut Expr) -> Result<(), E>,
{
    ExprRewriter {
        f,
        _err: PhantomData,
    }
    .visit_expr(expr)
}

/// Call `f` on every expression in one declaration.
pub fn each_decl_expr<F: FnMut(&Expr)>(decl: &Decl, f: F) {
    infallible(ExprInspector(f).visit_decl(decl))
}

struct StmtInspector<F>(F);

impl<F: FnMut(&Stmt)> Visit for StmtInspector<F> {
    type Error = Infallible;

    fn visit_stmt(&mut self, stmt: &Stmt) -> Result<(), Infallible> {
        (self.0)(stmt);
        walk_stmt(self, stmt)
    }

    fn visit_expr(&mut self, _expr: &Expr) -> Result<(), Infallible> {
        Ok(())
    }
}

/// Call `f` on every statement under `compound`, parents before children.
pub fn each_stmt<F: FnMut(&Stmt)>(compound: &Compound, f: F) {
    infallible(StmtInspector(f).visit_compound(compound))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{BinaryOp, ConstKind};
    use crate::types::ScalarType;

    fn body() -> Compound {
        // float y = x * 2; if (y > 1) return y + 1; return 0;
        Compound::new(vec![
            Stmt::decl(Decl::scalar(
                "y",
                ScalarType::Float,
                Some(Expr::binary(BinaryOp::Mul, Expr::id("x"), Expr::int(2))),
            )),
            Stmt::if_then(
                Expr::binary(BinaryOp::Gt, Expr::id("y"), Expr::int(1)),
                Stmt::ret(Some(Expr::binary(BinaryOp::Add, Expr::id("y"), Expr::int(1)))),
                None,
            ),
            Stmt::ret(Some(Expr::int(0))),
        ])
    }

    #[test]
    fn each_expr_sees_all_ids() {
        let mut ids = Vec::new();
        each_expr(&body(), |e| {
            if let Some(id) = e.as_id() {
                ids.push(id.to_string());
            }
        });
        assert_eq!(ids, vec!["x", "y", "y"]);
    }

    #[test]
    fn rewrite_exprs_replaces_in_place() {
        let mut c = body();
        rewrite_exprs(&mut c, |e| {
            if let ExprKind::Constant(k) = &mut e.kind {
                if k.kind == ConstKind::Int {
                    let text = format!("{}.0", k.value);
                    *e = Expr::float(text);
                }
            }
            Ok::<(), ()>(())
        })
        .unwrap();
        let mut ints = 0;
        each_expr(&c, |e| {
            if e.as_int_literal().is_some() {
                ints += 1;
            }
        });
        assert_eq!(ints, 0);
    }

    #[test]
    fn rewrite_exprs_propagates_errors() {
        let mut c = body();
        let err = rewrite_exprs(&mut c, |e| match e.as_id() {
            Some("y") => Err(format!("found {}", "y")),
            _ => Ok(()),
        });
        assert_eq!(err, Err("found y".to_string()));
    }

    #[test]
    fn rewrite_compounds_innermost_first() {
        let mut outer = Compound::new(vec![Stmt::compound(vec![Stmt::new(StmtKind::Break)])]);
        let mut sizes = Vec::new();
        rewrite_compounds(&mut outer, |c| {
            sizes.push(c.items.len());
            c.items.push(Stmt::new(StmtKind::Empty));
            Ok::<(), ()>(())
        })
        .unwrap();
        assert_eq!(sizes, vec![1, 1]);
        assert_eq!(outer.items.len(), 2);
    }

    #[test]
    fn each_stmt_counts_returns() {
        let mut returns = 0;
        each_stmt(&body(), |s| {
            if s.is_return() {
                returns += 1;
            }
        });
        assert_eq!(returns, 2);
    }
}
