//! Renaming and hoisting of `static` variables.

use std::collections::{HashMap, HashSet};

use ckern_ast::visit::{each_expr, rewrite_compounds};
use ckern_ast::{Decl, ExprKind, ExternalDecl, FileAst, FuncDef, Storage, StmtKind};

use super::{lvalue_root, rename_in_body, rename_in_decl};
use crate::context::TransformContext;
use crate::error::{Result, TransformError};
use crate::transform::{AstTransform, TransformStats};

/// Promotes `static` variables to ordinary globals named `<base>_<name>`.
///
/// File-level statics are renamed in place; function-local ones are moved
/// to file scope just before their function. A promoted variable must
/// never be written: as a plain global, a write would persist across
/// calls, so any assignment or increment is an error. Static functions
/// only lose the `static` keyword.
#[derive(Debug)]
pub struct StaticStorage;

impl AstTransform for StaticStorage {
    fn name(&self) -> &str {
        "static-storage"
    }

    fn apply(&self, file: &mut FileAst, ctx: &mut TransformContext) -> Result<TransformStats> {
        let mut stats = TransformStats::default();
        let mut taken: HashSet<String> = file.ext.iter().filter_map(|e| e.name()).map(str::to_string).collect();
        let mut global_renames: HashMap<String, String> = HashMap::new();
        // new name -> original name, for diagnostics
        let mut promoted: HashMap<String, String> = HashMap::new();

        for ext in &mut file.ext {
            match ext {
                ExternalDecl::Decl(decl) if decl.is_static() && !decl.is_function() => {
                    let Some(old) = decl.name.clone() else {
                        continue;
                    };
                    let new = unique_name(&mut taken, &ctx.base_name, None, &old);
                    promote(decl, &new);
                    tracing::trace!(from = %old, to = %new, "file-level static renamed");
                    promoted.insert(new.clone(), old.clone());
                    global_renames.insert(old, new);
                    stats.rewritten += 1;
                }
                ExternalDecl::Decl(decl) if decl.is_static() => {
                    decl.storage.retain(|s| *s != Storage::Static);
                    stats.rewritten += 1;
                }
                ExternalDecl::FuncDef(def) if def.decl.is_static() => {
                    def.decl.storage.retain(|s| *s != Storage::Static);
                    stats.rewritten += 1;
                }
                _ => {}
            }
        }

        let mut out = Vec::with_capacity(file.ext.len());
        for ext in std::mem::take(&mut file.ext) {
            let mut def = match ext {
                ExternalDecl::FuncDef(def) => def,
                ExternalDecl::Decl(mut decl) => {
                    stats.rewritten += rename_in_decl(&mut decl, &global_renames);
                    out.push(ExternalDecl::Decl(decl));
                    continue;
                }
            };

            let hoisted = take_local_statics(&mut def);
            let mut renames = global_renames.clone();
            for mut decl in hoisted {
                let Some(old) = decl.name.clone() else {
                    continue;
                };
                let new = unique_name(&mut taken, &ctx.base_name, Some(def.name()), &old);
                stats.rewritten += rename_in_decl(&mut decl, &renames);
                promote(&mut decl, &new);
                tracing::trace!(function = def.name(), from = %old, to = %new, "local static hoisted");
                promoted.insert(new.clone(), old.clone());
                renames.insert(old, new);
                stats.inserted += 1;
                out.push(ExternalDecl::Decl(decl));
            }

            let params: Vec<String> = def.params().iter().filter_map(|p| p.name.clone()).collect();
            stats.rewritten += rename_in_body(
                &mut def.body,
                params.iter().map(String::as_str),
                &renames,
            );
            check_not_written(&def, &promoted)?;
            out.push(ExternalDecl::FuncDef(def));
        }
        file.ext = out;
        Ok(stats)
    }
}

/// `<base>_<name>`, or `<base>_<function>_<name>` if that is taken.
fn unique_name(
    taken: &mut HashSet<String>,
    base: &str,
    function: Option<&str>,
    name: &str,
) -> String {
    let mut candidate = format!("{base}_{name}");
    if taken.contains(&candidate) {
        if let Some(function) = function {
            candidate = format!("{base}_{function}_{name}");
        }
    }
    let stem = candidate.clone();
    let mut n = 2;
    while taken.contains(&candidate) {
        candidate = format!("{stem}_{n}");
        n += 1;
    }
    taken.insert(candidate.clone());
    candidate
}

fn promote(decl: &mut Decl, new_name: &str) {
    decl.rename(new_name);
    decl.storage.retain(|s| *s != Storage::Static);
}

/// Remove every static variable declaration from a function body.
fn take_local_statics(def: &mut FuncDef) -> Vec<Decl> {
    let mut taken = Vec::new();
    let _ = rewrite_compounds(&mut def.body, |block| {
        let items = std::mem::take(&mut block.items);
        for stmt in items {
            match stmt.kind {
                StmtKind::Decl(d) if d.is_static() && !d.is_function() => taken.push(d),
                kind => block.items.push(ckern_ast::Stmt {
                    kind,
                    coord: stmt.coord,
                }),
            }
        }
        Ok::<(), ()>(())
    });
    taken
}

fn check_not_written(def: &FuncDef, promoted: &HashMap<String, String>) -> Result<()> {
    let mut written: Option<String> = None;
    each_expr(&def.body, |e| {
        let target = match &e.kind {
            ExprKind::Assign { target, .. } => target,
            ExprKind::Unary { op, operand } if op.is_mutating() => operand,
            _ => return,
        };
        if let Some(original) = lvalue_root(target).and_then(|root| promoted.get(root)) {
            written.get_or_insert_with(|| original.clone());
        }
    });
    match written {
        Some(name) => Err(TransformError::StaticReassigned {
            name,
            function: def.name().to_string(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ckern_ast::{AssignOp, BinaryOp, Compound, Expr, ScalarType, Stmt, UnaryOp};

    fn static_array(name: &str, values: &[&str]) -> Decl {
        let mut d = Decl::array(
            name,
            ScalarType::Float,
            None,
            Some(Expr::new(ExprKind::InitList(
                values.iter().map(|v| Expr::float(*v)).collect(),
            ))),
        );
        d.storage.push(Storage::Static);
        d
    }

    fn func(name: &str, body: Vec<Stmt>) -> ExternalDecl {
        ExternalDecl::FuncDef(FuncDef {
            decl: Decl::prototype(name, ScalarType::Float, vec![Decl::scalar("x", ScalarType::Float, None)]),
            body: Compound::new(body),
            coord: None,
        })
    }

    #[test]
    fn file_level_static_renamed_with_references() {
        let mut file = FileAst::new(vec![
            ExternalDecl::Decl(static_array("P", &["1.0", "2.0"])),
            func("gammaf", vec![Stmt::ret(Some(Expr::index(Expr::id("P"), Expr::int(1))))]),
        ]);
        let mut ctx = TransformContext::new("gammaf", 6);
        let stats = StaticStorage.apply(&mut file, &mut ctx).unwrap();
        assert_eq!(stats.rewritten, 2);
        let text = file.to_string();
        assert!(text.contains("float gammaf_P[] = {1.0, 2.0};"), "{text}");
        assert!(text.contains("return gammaf_P[1];"), "{text}");
        assert!(!text.contains("static"));
        assert!(StaticStorage.apply(&mut file, &mut ctx).unwrap().is_noop());
    }

    #[test]
    fn local_static_hoisted_in_front_of_function() {
        let mut file = FileAst::new(vec![func(
            "lgamf",
            vec![
                Stmt::decl(static_array("A", &["0.5"])),
                Stmt::ret(Some(Expr::index(Expr::id("A"), Expr::int(0)))),
            ],
        )]);
        let mut ctx = TransformContext::new("gammaf", 6);
        let stats = StaticStorage.apply(&mut file, &mut ctx).unwrap();
        assert_eq!(stats.inserted, 1);
        let names: Vec<_> = file.ext.iter().filter_map(|e| e.name()).collect();
        assert_eq!(names, ["gammaf_A", "lgamf"]);
        assert_eq!(file.func_def("lgamf").unwrap().body.items.len(), 1);
        assert!(file.to_string().contains("return gammaf_A[0];"));
    }

    #[test]
    fn colliding_local_statics_get_function_prefix() {
        let mut file = FileAst::new(vec![
            func("f", vec![Stmt::decl(static_array("C", &["1.0"])), Stmt::ret(Some(Expr::index(Expr::id("C"), Expr::int(0))))]),
            func("g", vec![Stmt::decl(static_array("C", &["2.0"])), Stmt::ret(Some(Expr::index(Expr::id("C"), Expr::int(0))))]),
        ]);
        let mut ctx = TransformContext::new("u", 6);
        StaticStorage.apply(&mut file, &mut ctx).unwrap();
        let names: Vec<_> = file.ext.iter().filter_map(|e| e.name()).collect();
        assert_eq!(names, ["u_C", "f", "u_g_C", "g"]);
        assert!(file.to_string().contains("return u_g_C[0];"));
    }

    #[test]
    fn reassignment_is_rejected() {
        let mut file = FileAst::new(vec![
            ExternalDecl::Decl(static_array("P", &["1.0"])),
            func(
                "f",
                vec![
                    Stmt::expr(Expr::assign(
                        AssignOp::Assign,
                        Expr::index(Expr::id("P"), Expr::int(0)),
                        Expr::id("x"),
                    )),
                    Stmt::ret(Some(Expr::id("x"))),
                ],
            ),
        ]);
        let mut ctx = TransformContext::new("u", 6);
        let err = StaticStorage.apply(&mut file, &mut ctx).unwrap_err();
        assert!(matches!(
            err,
            TransformError::StaticReassigned { ref name, ref function } if name == "P" && function == "f"
        ));
    }

    #[test]
    fn increment_is_rejected() {
        let mut counter = Decl::scalar("calls", ScalarType::Int, Some(Expr::int(0)));
        counter.storage.push(Storage::Static);
        let mut file = FileAst::new(vec![func(
            "f",
            vec![
                Stmt::decl(counter),
                Stmt::expr(Expr::unary(UnaryOp::PostInc, Expr::id("calls"))),
                Stmt::ret(Some(Expr::id("x"))),
            ],
        )]);
        let mut ctx = TransformContext::new("u", 6);
        assert!(matches!(
            StaticStorage.apply(&mut file, &mut ctx),
            Err(TransformError::StaticReassigned { .. })
        ));
    }

    #[test]
    fn shadowing_local_is_not_a_write() {
        let mut file = FileAst::new(vec![
            ExternalDecl::Decl(static_array("P", &["1.0"])),
            func(
                "f",
                vec![
                    Stmt::decl(Decl::scalar("P", ScalarType::Float, None)),
                    Stmt::expr(Expr::assign(AssignOp::Assign, Expr::id("P"), Expr::id("x"))),
                    Stmt::ret(Some(Expr::id("P"))),
                ],
            ),
        ]);
        let mut ctx = TransformContext::new("u", 6);
        assert!(StaticStorage.apply(&mut file, &mut ctx).is_ok());
    }

    #[test]
    fn static_referenced_from_another_global_is_renamed() {
        // static float A = 2.0f; float B = A * 3.0f;
        let mut a = Decl::scalar("A", ScalarType::Float, Some(Expr::float("2.0f")));
        a.storage.push(Storage::Static);
        let b = Decl::scalar(
            "B",
            ScalarType::Float,
            Some(Expr::binary(BinaryOp::Mul, Expr::id("A"), Expr::float("3.0f"))),
        );
        let mut file = FileAst::new(vec![ExternalDecl::Decl(a), ExternalDecl::Decl(b)]);
        let mut ctx = TransformContext::new("u", 6);
        let stats = StaticStorage.apply(&mut file, &mut ctx).unwrap();
        assert_eq!(stats.rewritten, 2);
        let text = file.to_string();
        assert!(text.contains("float u_A = 2.0f;"), "{text}");
        assert!(text.contains("float B = u_A * 3.0f;"), "{text}");
    }
}
