//! `while`/`do-while` to bounded `for`.

use ckern_ast::visit::walk_stmt_mut;
use ckern_ast::{
    BinaryOp, Decl, Expr, FileAst, ForInit, ScalarType, Stmt, StmtKind, UnaryOp, VisitMut,
};

use super::into_items;
use crate::context::TransformContext;
use crate::error::{Result, TransformError};
use crate::transform::{AstTransform, TransformStats};

/// Fixed iteration bound of every normalized loop.
///
/// This is a conservative cap, not the result of any analysis: a loop
/// that would need more iterations silently stops early.
pub const LOOP_ITERATION_CAP: i64 = 1000;

/// Rewrites `while (c) body` into
/// `for (int _liN = 0; _liN < 1000; _liN++) { if (!c) break; body }`.
///
/// For `do-while` the guard goes at the end of the body instead. Counter
/// names come from the unit's [`NamePool`](crate::NamePool); existing
/// `for` loops are left alone.
#[derive(Debug)]
pub struct LoopNormalization;

impl AstTransform for LoopNormalization {
    fn name(&self) -> &str {
        "loop-normalization"
    }

    fn apply(&self, file: &mut FileAst, ctx: &mut TransformContext) -> Result<TransformStats> {
        let mut stats = TransformStats::default();
        for def in file.func_defs_mut() {
            let mut v = Normalizer {
                ctx: &mut *ctx,
                function: def.name().to_string(),
                rewritten: 0,
            };
            v.visit_compound(&mut def.body)?;
            stats.rewritten += v.rewritten;
            stats.inserted += v.rewritten;
        }
        Ok(stats)
    }
}

struct Normalizer<'a> {
    ctx: &'a mut TransformContext,
    function: String,
    rewritten: usize,
}

impl VisitMut for Normalizer<'_> {
    type Error = TransformError;

    fn visit_stmt(&mut self, stmt: &mut Stmt) -> Result<()> {
        let is_loop = matches!(stmt.kind, StmtKind::While { .. } | StmtKind::DoWhile { .. });
        if is_loop {
            let counter = self.ctx.names.fresh()?;
            let kind = std::mem::replace(&mut stmt.kind, StmtKind::Empty);
            stmt.kind = bounded_for(kind, &counter);
            self.rewritten += 1;
            tracing::warn!(
                function = %self.function,
                counter = %counter,
                cap = LOOP_ITERATION_CAP,
                "loop bounded to a fixed iteration cap"
            );
        }
        walk_stmt_mut(self, stmt)
    }
}

fn bounded_for(kind: StmtKind, counter: &str) -> StmtKind {
    let (cond, body, guard_first) = match kind {
        StmtKind::While { cond, body } => (cond, body, true),
        StmtKind::DoWhile { cond, body } => (cond, body, false),
        other => return other,
    };
    let guard = Stmt::if_then(
        Expr::unary(UnaryOp::Not, cond),
        Stmt::new(StmtKind::Break),
        None,
    );
    let mut items = into_items(*body);
    if guard_first {
        items.insert(0, guard);
    } else {
        items.push(guard);
    }
    StmtKind::For {
        init: Some(ForInit::Decls(vec![Decl::scalar(
            counter,
            ScalarType::Int,
            Some(Expr::int(0)),
        )])),
        cond: Some(Expr::binary(
            BinaryOp::Lt,
            Expr::id(counter),
            Expr::int(LOOP_ITERATION_CAP),
        )),
        next: Some(Expr::unary(UnaryOp::PostInc, Expr::id(counter))),
        body: Box::new(Stmt::compound(items)),
    }
}
