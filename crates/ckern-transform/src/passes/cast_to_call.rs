//! Explicit casts become calls to the coercion builtins.

use ckern_ast::visit::{rewrite_decl_exprs, rewrite_exprs};
use ckern_ast::{Expr, ExprKind, ExternalDecl, FileAst, ScalarType};

use crate::context::TransformContext;
use crate::error::Result;
use crate::transform::{AstTransform, TransformStats};

/// `(T) e` becomes `T(e)` for `T` in `float`, `int`, `bool`; `(void) e`
/// becomes plain `e`.
#[derive(Debug)]
pub struct CastToCall;

impl AstTransform for CastToCall {
    fn name(&self) -> &str {
        "cast-to-call"
    }

    fn apply(&self, file: &mut FileAst, _ctx: &mut TransformContext) -> Result<TransformStats> {
        let mut rewritten = 0;
        let mut rewrite = |e: &mut Expr| {
            rewritten += usize::from(cast_to_call(e));
            Ok::<(), ()>(())
        };
        for ext in &mut file.ext {
            let _ = match ext {
                ExternalDecl::FuncDef(def) => rewrite_exprs(&mut def.body, &mut rewrite),
                ExternalDecl::Decl(decl) => rewrite_decl_exprs(decl, &mut rewrite),
            };
        }
        Ok(TransformStats {
            rewritten,
            ..Default::default()
        })
    }
}

fn cast_to_call(e: &mut Expr) -> bool {
    let ExprKind::Cast { to, expr } = &mut e.kind else {
        return false;
    };
    let to = *to;
    let inner = std::mem::replace(expr.as_mut(), Expr::int(0));
    let coord = e.coord.take();
    *e = match to {
        ScalarType::Void => inner,
        _ => Expr::call(to.c_name(), vec![inner]).at(coord),
    };
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use ckern_ast::{BinaryOp, Compound, Decl, FuncDef, Stmt};

    #[test]
    fn casts_become_calls() {
        let cast = |to, e| {
            Expr::new(ExprKind::Cast {
                to,
                expr: Box::new(e),
            })
        };
        let body = Compound::new(vec![
            Stmt::expr(cast(ScalarType::Void, Expr::id("n"))),
            Stmt::ret(Some(cast(
                ScalarType::Float,
                Expr::binary(BinaryOp::Add, cast(ScalarType::Int, Expr::id("x")), Expr::int(1)),
            ))),
        ]);
        let mut file = FileAst::new(vec![ExternalDecl::FuncDef(FuncDef {
            decl: Decl::prototype(
                "f",
                ScalarType::Float,
                vec![Decl::scalar("x", ScalarType::Float, None)],
            ),
            body,
            coord: None,
        })]);
        let mut ctx = TransformContext::new("t", 6);
        let stats = CastToCall.apply(&mut file, &mut ctx).unwrap();
        assert_eq!(stats.rewritten, 3);
        let text = file.to_string();
        assert!(text.contains("    n;\n"), "{text}");
        assert!(text.contains("return float(int(x) + 1);"), "{text}");
        assert!(CastToCall.apply(&mut file, &mut ctx).unwrap().is_noop());
    }

    #[test]
    fn casts_in_global_initializers_become_calls() {
        // int N = (int) 2.5f;
        let mut file = FileAst::new(vec![ExternalDecl::Decl(Decl::scalar(
            "N",
            ScalarType::Int,
            Some(Expr::new(ExprKind::Cast {
                to: ScalarType::Int,
                expr: Box::new(Expr::float("2.5f")),
            })),
        ))]);
        let mut ctx = TransformContext::new("t", 6);
        assert_eq!(CastToCall.apply(&mut file, &mut ctx).unwrap().rewritten, 1);
        let text = file.to_string();
        assert!(text.contains("int N = int(2.5f);"), "{text}");
    }
}
