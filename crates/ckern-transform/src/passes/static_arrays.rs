//! Size specialization of the polynomial helpers.

use std::collections::{BTreeSet, HashMap};

use ckern_ast::visit::{each_stmt, rewrite_exprs};
use ckern_ast::{Decl, ExprKind, ExternalDecl, FileAst, FuncDef, ScalarType, StmtKind};

use crate::context::TransformContext;
use crate::error::{Result, TransformError};
use crate::transform::{AstTransform, TransformStats};

/// Helpers taking a coefficient array as their second argument.
pub const ARRAY_HELPERS: &[&str] = &["polevlf", "p1evlf", "chbevlf"];

/// Position of the coefficient array in a helper call.
const ARRAY_ARG: usize = 1;

/// Name of the variant of `helper` taking an array of length `n`.
pub fn specialized_name(helper: &str, n: usize) -> String {
    format!("{helper}_{n}")
}

/// Rewrites helper calls to their fixed-size variants.
///
/// Shader functions cannot take unsized array parameters, so each call
/// `p1evlf(x, coef, N)` whose `coef` names an array of known length `L`
/// becomes `p1evlf_L(x, coef, N)`, and one prototype per distinct variant
/// is placed at the top of the unit. Bodies for the variants come from
/// the builtin table; the unit's own generic definitions are dropped.
#[derive(Debug)]
pub struct StaticArrays;

impl AstTransform for StaticArrays {
    fn name(&self) -> &str {
        "static-arrays"
    }

    fn apply(&self, file: &mut FileAst, _ctx: &mut TransformContext) -> Result<TransformStats> {
        let mut stats = TransformStats::default();
        let globals = array_lengths(file.ext.iter().filter_map(|e| match e {
            ExternalDecl::Decl(d) => Some(d),
            ExternalDecl::FuncDef(_) => None,
        }));

        let mut used: BTreeSet<(usize, usize)> = BTreeSet::new();
        for def in file.func_defs_mut() {
            if ARRAY_HELPERS.contains(&def.name()) {
                continue;
            }
            let mut lengths = globals.clone();
            lengths.extend(local_array_lengths(def));
            let function = def.name().to_string();
            rewrite_exprs(&mut def.body, |e| {
                let ExprKind::Call { name, args } = &mut e.kind else {
                    return Ok(());
                };
                let Some(helper) = ARRAY_HELPERS.iter().position(|h| *h == name.as_str()) else {
                    return Ok(());
                };
                let array = args.get(ARRAY_ARG).and_then(|a| a.as_id());
                let Some(len) = array.and_then(|a| lengths.get(a).copied().flatten()) else {
                    return Err(TransformError::Unsupported {
                        pass: "static-arrays".into(),
                        detail: format!(
                            "call to '{name}' in '{function}' does not pass an array of known size"
                        ),
                    });
                };
                *name = specialized_name(ARRAY_HELPERS[helper], len);
                used.insert((helper, len));
                stats.rewritten += 1;
                Ok(())
            })?;
        }

        let before = file.ext.len();
        file.ext
            .retain(|e| !e.name().is_some_and(|n| ARRAY_HELPERS.contains(&n)));
        stats.removed += before - file.ext.len();

        let existing: BTreeSet<String> = file
            .ext
            .iter()
            .filter_map(|e| e.name())
            .map(str::to_string)
            .collect();
        let prototypes: Vec<ExternalDecl> = used
            .into_iter()
            .filter_map(|(helper, n)| {
                let name = specialized_name(ARRAY_HELPERS[helper], n);
                if existing.contains(&name) {
                    return None;
                }
                tracing::debug!(variant = %name, "array helper specialized");
                Some(ExternalDecl::Decl(variant_prototype(&name, n)))
            })
            .collect();
        stats.inserted += prototypes.len();
        file.ext.splice(0..0, prototypes);
        Ok(stats)
    }
}

/// `float name(float x, float coef[n], int n)`.
fn variant_prototype(name: &str, n: usize) -> Decl {
    Decl::prototype(
        name,
        ScalarType::Float,
        vec![
            Decl::scalar("x", ScalarType::Float, None),
            Decl::array("coef", ScalarType::Float, Some(n), None),
            Decl::scalar("n", ScalarType::Int, None),
        ],
    )
}

/// Array name -> length (`None` when the size is not known).
fn array_lengths<'a>(decls: impl Iterator<Item = &'a Decl>) -> HashMap<String, Option<usize>> {
    decls
        .filter(|d| d.is_array())
        .filter_map(|d| Some((d.name.clone()?, d.array_len())))
        .collect()
}

/// Arrays declared in the body or as parameters; these shadow globals.
fn local_array_lengths(def: &FuncDef) -> HashMap<String, Option<usize>> {
    let mut lengths = array_lengths(def.params().iter());
    each_stmt(&def.body, |s| {
        if let StmtKind::Decl(d) = &s.kind {
            if let Some(name) = d.name.as_ref().filter(|_| d.is_array()) {
                lengths.insert(name.clone(), d.array_len());
            }
        }
    });
    lengths
}
