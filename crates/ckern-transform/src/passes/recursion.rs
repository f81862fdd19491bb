//! One-level unrolling of direct and two-function recursion.

use std::collections::{BTreeSet, HashMap, HashSet};

use ckern_ast::visit::{each_expr, rewrite_exprs};
use ckern_ast::{Expr, ExprKind, ExternalDecl, FileAst, FuncDef};

use crate::context::TransformContext;
use crate::error::Result;
use crate::transform::{AstTransform, TransformStats};

/// Suffix of the synthetic copy of a recursive callee.
pub const UNROLLED_SUFFIX: &str = "_unrolled";

/// Builtin constant substituted for the innermost recursive call.
pub const NAN_SENTINEL: &str = "NAN";

/// Bounds recursion to a single unrolled level.
///
/// For a function `f` that calls itself, a copy `f_unrolled` is made in
/// which every call that could lead back to `f` is replaced by `NAN`, and
/// `f`'s own recursive calls are pointed at the copy. For a pair `f <-> g`
/// (with `f` first in the file) the copy is of `g`, and `f` calls
/// `g_unrolled`. The result approximates the recursion rather than
/// reproducing it; it is exact only when the recursion is at most one
/// level deep. Longer cycles are left alone and reported.
#[derive(Debug)]
pub struct RecursionUnrolling;

impl AstTransform for RecursionUnrolling {
    fn name(&self) -> &str {
        "recursion-unrolling"
    }

    fn apply(&self, file: &mut FileAst, _ctx: &mut TransformContext) -> Result<TransformStats> {
        let order: Vec<String> = file.func_defs().map(|d| d.name().to_string()).collect();
        let defined: HashSet<&str> = order.iter().map(String::as_str).collect();
        let calls: HashMap<String, BTreeSet<String>> = file
            .func_defs()
            .map(|d| (d.name().to_string(), callees(d, &defined)))
            .collect();
        let reach: HashMap<&str, HashSet<String>> = order
            .iter()
            .map(|f| (f.as_str(), reachable(f, &calls)))
            .collect();

        // (outer, callee) pairs, direct recursion first.
        let mut cycles: Vec<(String, String)> = Vec::new();
        for f in &order {
            if calls[f].contains(f) {
                cycles.push((f.clone(), f.clone()));
            }
        }
        for (i, f) in order.iter().enumerate() {
            for g in &order[i + 1..] {
                if calls[f].contains(g) && calls[g].contains(f) {
                    cycles.push((f.clone(), g.clone()));
                }
            }
        }

        let handled: HashSet<&str> = cycles
            .iter()
            .flat_map(|(a, b)| [a.as_str(), b.as_str()])
            .collect();
        for f in &order {
            if reach[f.as_str()].contains(f) && !handled.contains(f.as_str()) {
                tracing::warn!(
                    function = %f,
                    "recursion cycle longer than two functions left untouched"
                );
            }
        }
        if cycles.is_empty() {
            return Ok(TransformStats::default());
        }

        let mut stats = TransformStats::default();
        let mut taken: HashSet<String> = file.ext.iter().filter_map(|e| e.name()).map(str::to_string).collect();
        let mut copies: HashMap<String, FuncDef> = HashMap::new();
        let mut copy_names: HashMap<String, String> = HashMap::new();
        let mut redirects: HashMap<String, HashMap<String, String>> = HashMap::new();

        for (outer, callee) in &cycles {
            if !copy_names.contains_key(callee) {
                let Some(original) = file.func_def(callee) else {
                    continue;
                };
                let name = fresh_name(&mut taken, callee);
                // Any call that can get back to the callee ends the unrolling.
                let back: HashSet<&str> = order
                    .iter()
                    .map(String::as_str)
                    .filter(|h| *h == callee.as_str() || reach[h].contains(callee))
                    .collect();
                let mut copy = original.clone();
                copy.decl.rename(&name);
                let mut cut = 0;
                let _ = rewrite_exprs(&mut copy.body, |e| {
                    if let ExprKind::Call { name, .. } = &e.kind {
                        if back.contains(name.as_str()) {
                            *e = Expr::id(NAN_SENTINEL).at(e.coord.take());
                            cut += 1;
                        }
                    }
                    Ok::<(), ()>(())
                });
                stats.rewritten += cut;
                stats.inserted += 1;
                copy_names.insert(callee.clone(), name.clone());
                copies.insert(callee.clone(), copy);
            }
            tracing::warn!(
                function = %outer,
                callee = %callee,
                "recursion unrolled to one level"
            );
            redirects
                .entry(outer.clone())
                .or_default()
                .insert(callee.clone(), copy_names[callee].clone());
        }

        for def in file.func_defs_mut() {
            let Some(map) = redirects.get(def.name()) else {
                continue;
            };
            let mut redirected = 0;
            let _ = rewrite_exprs(&mut def.body, |e| {
                if let ExprKind::Call { name, .. } = &mut e.kind {
                    if let Some(copy) = map.get(name.as_str()) {
                        *name = copy.clone();
                        redirected += 1;
                    }
                }
                Ok::<(), ()>(())
            });
            stats.rewritten += redirected;
        }

        // Each copy goes right after the function it duplicates.
        let mut out = Vec::with_capacity(file.ext.len() + copies.len());
        for ext in std::mem::take(&mut file.ext) {
            let copy = match &ext {
                ExternalDecl::FuncDef(def) => copies.remove(def.name()),
                ExternalDecl::Decl(_) => None,
            };
            out.push(ext);
            if let Some(copy) = copy {
                out.push(ExternalDecl::FuncDef(copy));
            }
        }
        file.ext = out;
        Ok(stats)
    }
}

/// Names of defined functions `def` calls.
fn callees(def: &FuncDef, defined: &HashSet<&str>) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    each_expr(&def.body, |e| {
        if let Some((name, _)) = e.as_call() {
            if defined.contains(name) {
                out.insert(name.to_string());
            }
        }
    });
    out
}

/// Functions reachable from `start` through one or more calls.
fn reachable(start: &str, calls: &HashMap<String, BTreeSet<String>>) -> HashSet<String> {
    let mut seen = HashSet::new();
    let mut work: Vec<&str> = calls.get(start).into_iter().flatten().map(String::as_str).collect();
    while let Some(f) = work.pop() {
        if seen.insert(f.to_string()) {
            work.extend(calls.get(f).into_iter().flatten().map(String::as_str));
        }
    }
    seen
}

fn fresh_name(taken: &mut HashSet<String>, base: &str) -> String {
    let stem = format!("{base}{UNROLLED_SUFFIX}");
    let mut candidate = stem.clone();
    let mut n = 2;
    while taken.contains(&candidate) {
        candidate = format!("{stem}{n}");
        n += 1;
    }
    taken.insert(candidate.clone());
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use ckern_ast::{BinaryOp, Compound, Decl, ScalarType, Stmt};

    fn func(name: &str, ret: Expr) -> ExternalDecl {
        ExternalDecl::FuncDef(FuncDef {
            decl: Decl::prototype(name, ScalarType::Float, vec![Decl::scalar("x", ScalarType::Float, None)]),
            body: Compound::new(vec![Stmt::ret(Some(ret))]),
            coord: None,
        })
    }

    fn call(name: &str) -> Expr {
        Expr::call(name, vec![Expr::binary(BinaryOp::Sub, Expr::id("x"), Expr::float("1.0"))])
    }

    fn calls_of(file: &FileAst, name: &str) -> BTreeSet<String> {
        let defined: HashSet<&str> = file.func_defs().map(|d| d.name()).collect();
        callees(file.func_def(name).unwrap(), &defined)
    }

    #[test]
    fn direct_recursion_unrolled_once() {
        let mut file = FileAst::new(vec![func(
            "fact",
            Expr::binary(BinaryOp::Mul, Expr::id("x"), call("fact")),
        )]);
        let mut ctx = TransformContext::new("t", 6);
        let stats = RecursionUnrolling.apply(&mut file, &mut ctx).unwrap();
        assert_eq!(stats.inserted, 1);
        assert_eq!(stats.rewritten, 2);

        let names: Vec<_> = file.ext.iter().filter_map(|e| e.name()).collect();
        assert_eq!(names, ["fact", "fact_unrolled"]);
        let text = file.to_string();
        assert!(text.contains("return x * fact_unrolled(x - 1.0);"), "{text}");
        assert!(text.contains("return x * NAN;"), "{text}");
        assert!(RecursionUnrolling.apply(&mut file, &mut ctx).unwrap().is_noop());
    }

    #[test]
    fn mutual_recursion_unrolls_the_callee() {
        let mut file = FileAst::new(vec![func("f", call("g")), func("g", call("f"))]);
        let mut ctx = TransformContext::new("t", 6);
        RecursionUnrolling.apply(&mut file, &mut ctx).unwrap();

        assert_eq!(calls_of(&file, "f"), BTreeSet::from(["g_unrolled".to_string()]));
        assert_eq!(calls_of(&file, "g"), BTreeSet::from(["f".to_string()]));
        assert!(calls_of(&file, "g_unrolled").is_empty());
        assert!(RecursionUnrolling.apply(&mut file, &mut ctx).unwrap().is_noop());
    }

    #[test]
    fn three_cycles_left_alone() {
        let mut file = FileAst::new(vec![
            func("a", call("b")),
            func("b", call("c")),
            func("c", call("a")),
        ]);
        let before = file.clone();
        let mut ctx = TransformContext::new("t", 6);
        let stats = RecursionUnrolling.apply(&mut file, &mut ctx).unwrap();
        assert!(stats.is_noop());
        assert_eq!(file, before);
    }

    #[test]
    fn reachability() {
        let calls: HashMap<String, BTreeSet<String>> = [
            ("a".to_string(), BTreeSet::from(["b".to_string()])),
            ("b".to_string(), BTreeSet::from(["c".to_string()])),
            ("c".to_string(), BTreeSet::new()),
        ]
        .into_iter()
        .collect();
        let r = reachable("a", &calls);
        assert!(r.contains("b") && r.contains("c") && !r.contains("a"));
    }
}
