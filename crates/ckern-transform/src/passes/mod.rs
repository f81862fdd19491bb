//! The normalization passes, one module each.
//!
//! Passes share a few small tree utilities defined here: structural
//! comparison that ignores coordinates, the root variable of an lvalue,
//! and a scoped identifier renamer.

use std::collections::{HashMap, HashSet};

use ckern_ast::visit::{
    each_subexpr, walk_compound_mut, walk_decl_mut, walk_expr_mut, walk_stmt_mut,
};
use ckern_ast::{Compound, Decl, Expr, ExprKind, ForInit, Stmt, StmtKind, VisitMut};

mod builtin_math;
mod cast_to_call;
mod explicit_types;
mod goto;
mod idioms;
mod loops;
mod mtherr;
mod normalize_types;
mod recursion;
mod static_arrays;
mod static_storage;

pub use builtin_math::{generic_math_name, BuiltinMath};
pub(crate) use builtin_math::generic_math_names;
pub use cast_to_call::CastToCall;
pub use explicit_types::ExplicitTypes;
pub use goto::GotoElimination;
pub use idioms::{AbsIdiom, IsOddIdiom};
pub use loops::{LoopNormalization, LOOP_ITERATION_CAP};
pub use mtherr::MtherrElision;
pub use normalize_types::NormalizeTypes;
pub use recursion::{RecursionUnrolling, NAN_SENTINEL, UNROLLED_SUFFIX};
pub use static_arrays::{specialized_name, StaticArrays, ARRAY_HELPERS};
pub use static_storage::StaticStorage;

/// Structural equality, ignoring source coordinates.
pub(crate) fn same_expr(a: &Expr, b: &Expr) -> bool {
    use ExprKind::*;
    match (&a.kind, &b.kind) {
        (Id(x), Id(y)) => x == y,
        (Constant(x), Constant(y)) => x == y,
        (
            Binary {
                op: o1,
                left: l1,
                right: r1,
            },
            Binary {
                op: o2,
                left: l2,
                right: r2,
            },
        ) => o1 == o2 && same_expr(l1, l2) && same_expr(r1, r2),
        (
            Unary {
                op: o1,
                operand: x,
            },
            Unary {
                op: o2,
                operand: y,
            },
        ) => o1 == o2 && same_expr(x, y),
        (
            Assign {
                op: o1,
                target: t1,
                value: v1,
            },
            Assign {
                op: o2,
                target: t2,
                value: v2,
            },
        ) => o1 == o2 && same_expr(t1, t2) && same_expr(v1, v2),
        (
            Ternary {
                cond: c1,
                then: t1,
                otherwise: e1,
            },
            Ternary {
                cond: c2,
                then: t2,
                otherwise: e2,
            },
        ) => same_expr(c1, c2) && same_expr(t1, t2) && same_expr(e1, e2),
        (Call { name: n1, args: a1 }, Call { name: n2, args: a2 }) => {
            n1 == n2 && same_list(a1, a2)
        }
        (Cast { to: t1, expr: x }, Cast { to: t2, expr: y }) => t1 == t2 && same_expr(x, y),
        (
            Index {
                array: a1,
                index: i1,
            },
            Index {
                array: a2,
                index: i2,
            },
        ) => same_expr(a1, a2) && same_expr(i1, i2),
        (InitList(x), InitList(y)) | (Comma(x), Comma(y)) => same_list(x, y),
        _ => false,
    }
}

fn same_list(a: &[Expr], b: &[Expr]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| same_expr(x, y))
}

/// Whether evaluating `expr` writes to any variable.
pub(crate) fn has_side_effects(expr: &Expr) -> bool {
    let mut found = false;
    each_subexpr(expr, |e| match &e.kind {
        ExprKind::Assign { .. } => found = true,
        ExprKind::Unary { op, .. } if op.is_mutating() => found = true,
        _ => {}
    });
    found
}

/// Variable at the root of an lvalue: `x` for `x` and `x[i]`.
pub(crate) fn lvalue_root(expr: &Expr) -> Option<&str> {
    match &expr.kind {
        ExprKind::Id(name) => Some(name),
        ExprKind::Index { array, .. } => lvalue_root(array),
        _ => None,
    }
}

/// Identifier renamer that respects block scoping.
///
/// A local declaration of a name in the map shadows the rename for the
/// rest of its block. Function and call names are never touched.
pub(crate) struct ScopedRenamer<'a> {
    renames: &'a HashMap<String, String>,
    shadowed: Vec<HashSet<String>>,
    pub count: usize,
}

impl<'a> ScopedRenamer<'a> {
    pub fn new(renames: &'a HashMap<String, String>) -> Self {
        Self {
            renames,
            shadowed: vec![HashSet::new()],
            count: 0,
        }
    }

    /// Start with `names` (typically parameters) already shadowed.
    pub fn shadowing<'n>(mut self, names: impl IntoIterator<Item = &'n str>) -> Self {
        if let Some(scope) = self.shadowed.last_mut() {
            scope.extend(names.into_iter().map(str::to_string));
        }
        self
    }

    fn is_shadowed(&self, name: &str) -> bool {
        self.shadowed.iter().any(|s| s.contains(name))
    }

    fn declare(&mut self, decl: &Decl) {
        if let (Some(name), Some(scope)) = (&decl.name, self.shadowed.last_mut()) {
            if self.renames.contains_key(name) {
                scope.insert(name.clone());
            }
        }
    }
}

impl VisitMut for ScopedRenamer<'_> {
    type Error = std::convert::Infallible;

    fn visit_compound(&mut self, compound: &mut Compound) -> Result<(), Self::Error> {
        self.shadowed.push(HashSet::new());
        let result = walk_compound_mut(self, compound);
        self.shadowed.pop();
        result
    }

    fn visit_decl(&mut self, decl: &mut Decl) -> Result<(), Self::Error> {
        // The initializer sees the outer binding; the name is in scope after it.
        walk_decl_mut(self, decl)?;
        self.declare(decl);
        Ok(())
    }

    fn visit_stmt(&mut self, stmt: &mut Stmt) -> Result<(), Self::Error> {
        if let StmtKind::For {
            init: Some(ForInit::Decls(_)),
            ..
        } = &stmt.kind
        {
            self.shadowed.push(HashSet::new());
            let result = walk_stmt_mut(self, stmt);
            self.shadowed.pop();
            return result;
        }
        walk_stmt_mut(self, stmt)
    }

    fn visit_expr(&mut self, expr: &mut Expr) -> Result<(), Self::Error> {
        if let ExprKind::Id(name) = &mut expr.kind {
            if !self.is_shadowed(name) {
                if let Some(new_name) = self.renames.get(name.as_str()) {
                    *name = new_name.clone();
                    self.count += 1;
                }
            }
            return Ok(());
        }
        walk_expr_mut(self, expr)
    }
}

/// Rename identifiers in one function body. Returns the number of rewrites.
pub(crate) fn rename_in_body<'n>(
    body: &mut Compound,
    params: impl IntoIterator<Item = &'n str>,
    renames: &HashMap<String, String>,
) -> usize {
    if renames.is_empty() {
        return 0;
    }
    let mut renamer = ScopedRenamer::new(renames).shadowing(params);
    match walk_compound_mut(&mut renamer, body) {
        Ok(()) => renamer.count,
        Err(never) => match never {},
    }
}

/// Rename identifiers in a declaration's size and initializer.
pub(crate) fn rename_in_decl(decl: &mut Decl, renames: &HashMap<String, String>) -> usize {
    if renames.is_empty() {
        return 0;
    }
    let mut renamer = ScopedRenamer::new(renames);
    match walk_decl_mut(&mut renamer, decl) {
        Ok(()) => renamer.count,
        Err(never) => match never {},
    }
}

/// Statements of a loop or branch body, unwrapping one level of block.
pub(crate) fn into_items(stmt: Stmt) -> Vec<Stmt> {
    match stmt.kind {
        StmtKind::Compound(c) => c.items,
        StmtKind::Empty => Vec::new(),
        _ => vec![stmt],
    }
}
