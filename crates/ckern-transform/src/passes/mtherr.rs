//! Removal of `mtherr` error reporting.

use ckern_ast::visit::{rewrite_compounds, rewrite_exprs};
use ckern_ast::{Expr, ExprKind, ExternalDecl, FileAst, StmtKind};

use crate::context::TransformContext;
use crate::error::Result;
use crate::transform::{AstTransform, TransformStats};

/// Name of the diagnostic routine kernels call on domain errors.
pub const MTHERR: &str = "mtherr";

/// Strips `mtherr` declarations and calls.
///
/// A call standing alone as a statement disappears. A call nested in a
/// larger expression is replaced by its second argument (the error code)
/// when there is one, else by `0`.
#[derive(Debug)]
pub struct MtherrElision;

impl AstTransform for MtherrElision {
    fn name(&self) -> &str {
        "mtherr-elision"
    }

    fn apply(&self, file: &mut FileAst, _ctx: &mut TransformContext) -> Result<TransformStats> {
        let mut stats = TransformStats::default();

        let before = file.ext.len();
        file.ext.retain(|ext| ext.name() != Some(MTHERR));
        stats.removed += before - file.ext.len();

        for ext in &mut file.ext {
            let ExternalDecl::FuncDef(def) = ext else {
                continue;
            };
            let mut removed = 0;
            let _ = rewrite_compounds(&mut def.body, |block| {
                let before = block.items.len();
                block.items.retain(|stmt| match &stmt.kind {
                    StmtKind::Expr(e) => e.as_call().map(|(n, _)| n) != Some(MTHERR),
                    StmtKind::Decl(d) => d.name.as_deref() != Some(MTHERR),
                    _ => true,
                });
                removed += before - block.items.len();
                Ok::<(), ()>(())
            });
            stats.removed += removed;

            let mut rewritten = 0;
            let _ = rewrite_exprs(&mut def.body, |e| {
                if let ExprKind::Call { name, args } = &mut e.kind {
                    if name == MTHERR {
                        let code = if args.len() > 1 {
                            args.swap_remove(1)
                        } else {
                            Expr::int(0)
                        };
                        *e = code;
                        rewritten += 1;
                    }
                }
                Ok::<(), ()>(())
            });
            stats.rewritten += rewritten;
        }
        Ok(stats)
    }
}
