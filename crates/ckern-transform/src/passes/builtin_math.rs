//! Renaming of libm entry points to the generic builtin names.

use std::collections::HashSet;

use ckern_ast::visit::rewrite_exprs;
use ckern_ast::{ExprKind, ExternalDecl, FileAst};

use crate::context::TransformContext;
use crate::error::Result;
use crate::transform::{AstTransform, TransformStats};

/// libm name -> generic builtin name. Both the `f`-suffixed single
/// precision names and the plain double names map to one builtin.
const MATH_NAMES: &[(&str, &str)] = &[
    ("sinf", "sin"),
    ("sin", "sin"),
    ("cosf", "cos"),
    ("cos", "cos"),
    ("tanf", "tan"),
    ("tan", "tan"),
    ("asinf", "asin"),
    ("asin", "asin"),
    ("acosf", "acos"),
    ("acos", "acos"),
    ("atanf", "atan"),
    ("atan", "atan"),
    ("atan2f", "atan"),
    ("atan2", "atan"),
    ("expf", "exp"),
    ("exp", "exp"),
    ("logf", "log"),
    ("log", "log"),
    ("sqrtf", "sqrt"),
    ("sqrt", "sqrt"),
    ("powf", "pow"),
    ("pow", "pow"),
    ("fabsf", "abs"),
    ("fabs", "abs"),
    ("floorf", "floor"),
    ("floor", "floor"),
    ("ceilf", "ceil"),
    ("ceil", "ceil"),
    ("fminf", "min"),
    ("fmin", "min"),
    ("fmaxf", "max"),
    ("fmax", "max"),
    ("abs", "abs"),
    ("min", "min"),
    ("max", "max"),
];

/// Generic builtin for a libm name, if it is one.
pub fn generic_math_name(name: &str) -> Option<&'static str> {
    MATH_NAMES
        .iter()
        .find(|(libm, _)| *libm == name)
        .map(|(_, generic)| *generic)
}

/// Every generic builtin name (with repeats).
pub(crate) fn generic_math_names() -> impl Iterator<Item = &'static str> {
    MATH_NAMES.iter().map(|(_, generic)| *generic)
}

/// Routes libm calls to the builtin math table.
///
/// A local definition of one of these functions is reduced to its
/// prototype, since the builtin replaces it; duplicate prototypes that
/// arise from the renaming are dropped.
#[derive(Debug)]
pub struct BuiltinMath;

impl AstTransform for BuiltinMath {
    fn name(&self) -> &str {
        "builtin-math"
    }

    fn apply(&self, file: &mut FileAst, _ctx: &mut TransformContext) -> Result<TransformStats> {
        let mut stats = TransformStats::default();

        for ext in &mut file.ext {
            let Some(generic) = ext.name().and_then(generic_math_name) else {
                continue;
            };
            if let ExternalDecl::FuncDef(def) = ext {
                tracing::trace!(function = def.name(), "definition reduced to prototype");
                *ext = ExternalDecl::Decl(def.prototype());
                stats.removed += 1;
            }
            if let ExternalDecl::Decl(decl) = ext {
                if decl.is_function() && decl.name.as_deref() != Some(generic) {
                    decl.rename(generic);
                    stats.rewritten += 1;
                }
            }
        }

        // Keep the first prototype of each builtin.
        let mut seen = HashSet::new();
        let before = file.ext.len();
        file.ext.retain(|ext| match ext {
            ExternalDecl::Decl(d) if d.is_function() => match d.name.as_deref() {
                Some(name) if generic_math_name(name) == Some(name) => seen.insert(name.to_string()),
                _ => true,
            },
            _ => true,
        });
        stats.removed += before - file.ext.len();

        for def in file.func_defs_mut() {
            let mut renamed = 0;
            let _ = rewrite_exprs(&mut def.body, |e| {
                if let ExprKind::Call { name, .. } = &mut e.kind {
                    if let Some(generic) = generic_math_name(name) {
                        if name != generic {
                            *name = generic.to_string();
                            renamed += 1;
                        }
                    }
                }
                Ok::<(), ()>(())
            });
            stats.rewritten += renamed;
        }
        Ok(stats)
    }
}
