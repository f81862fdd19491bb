//! Folding of inline macro idioms back into builtin calls.

use ckern_ast::visit::rewrite_exprs;
use ckern_ast::{BinaryOp, Expr, ExprKind, FileAst, UnaryOp};

use super::{has_side_effects, same_expr};
use crate::context::TransformContext;
use crate::error::Result;
use crate::transform::{AstTransform, TransformStats};

/// `(x < 0) ? -x : x` and its mirrored forms become `abs(x)`.
#[derive(Debug)]
pub struct AbsIdiom;

/// `x & 1` becomes `is_odd(x)`.
#[derive(Debug)]
pub struct IsOddIdiom;

impl AstTransform for AbsIdiom {
    fn name(&self) -> &str {
        "abs-idiom"
    }

    fn apply(&self, file: &mut FileAst, _ctx: &mut TransformContext) -> Result<TransformStats> {
        Ok(fold(file, abs_operand, "abs"))
    }
}

impl AstTransform for IsOddIdiom {
    fn name(&self) -> &str {
        "is-odd-idiom"
    }

    fn apply(&self, file: &mut FileAst, _ctx: &mut TransformContext) -> Result<TransformStats> {
        Ok(fold(file, odd_operand, "is_odd"))
    }
}

/// Replace every expression `matcher` accepts by `callee(operand)`.
fn fold(file: &mut FileAst, matcher: fn(&Expr) -> Option<&Expr>, callee: &str) -> TransformStats {
    let mut rewritten = 0;
    for def in file.func_defs_mut() {
        let _ = rewrite_exprs(&mut def.body, |e| {
            if let Some(operand) = matcher(e) {
                let operand = operand.clone();
                tracing::trace!(idiom = callee, operand = %operand, "idiom folded");
                let coord = e.coord.take();
                *e = Expr::call(callee, vec![operand]).at(coord);
                rewritten += 1;
            }
            Ok::<(), ()>(())
        });
    }
    TransformStats {
        rewritten,
        ..Default::default()
    }
}

fn is_zero(e: &Expr) -> bool {
    match &e.kind {
        ExprKind::Constant(c) => c.as_f64() == Some(0.0),
        _ => false,
    }
}

fn negated(e: &Expr) -> Option<&Expr> {
    match &e.kind {
        ExprKind::Unary {
            op: UnaryOp::Neg,
            operand,
        } => Some(operand),
        _ => None,
    }
}

/// Operand `x` of an absolute-value ternary.
fn abs_operand(e: &Expr) -> Option<&Expr> {
    let ExprKind::Ternary {
        cond,
        then,
        otherwise,
    } = &e.kind
    else {
        return None;
    };
    let ExprKind::Binary { op, left, right } = &cond.kind else {
        return None;
    };
    if !is_zero(right) || has_side_effects(left) {
        return None;
    }
    let x = left.as_ref();
    let matches = match op {
        // x < 0 ? -x : x
        BinaryOp::Lt | BinaryOp::Le => {
            negated(then).is_some_and(|n| same_expr(n, x)) && same_expr(otherwise, x)
        }
        // x > 0 ? x : -x
        BinaryOp::Gt | BinaryOp::Ge => {
            same_expr(then, x) && negated(otherwise).is_some_and(|n| same_expr(n, x))
        }
        _ => false,
    };
    matches.then_some(x)
}

/// Operand `x` of `x & 1` or `1 & x`.
fn odd_operand(e: &Expr) -> Option<&Expr> {
    let ExprKind::Binary {
        op: BinaryOp::BitAnd,
        left,
        right,
    } = &e.kind
    else {
        return None;
    };
    if right.as_int_literal() == Some(1) {
        Some(left.as_ref())
    } else if left.as_int_literal() == Some(1) {
        Some(right.as_ref())
    } else {
        None
    }
}
