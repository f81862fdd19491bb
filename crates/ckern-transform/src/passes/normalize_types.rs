//! Canonical element type spellings and literal text.

use ckern_ast::node::{parse_float_literal, parse_int_literal};
use ckern_ast::visit::{walk_decl_mut, walk_expr_mut};
use ckern_ast::{ConstKind, Constant, Decl, Expr, ExprKind, FileAst, TypeNode, VisitMut};

use crate::context::TransformContext;
use crate::error::Result;
use crate::transform::{AstTransform, TransformStats};

/// Collapses every declared type onto `float | int | bool | void` and
/// rewrites literals into the form both dialects accept: decimal ints and
/// floats that always carry a `.` or an exponent, without suffixes.
#[derive(Debug)]
pub struct NormalizeTypes;

impl AstTransform for NormalizeTypes {
    fn name(&self) -> &str {
        "normalize-types"
    }

    fn apply(&self, file: &mut FileAst, _ctx: &mut TransformContext) -> Result<TransformStats> {
        let mut v = Normalizer::default();
        match v.visit_file(file) {
            Ok(()) => {}
            Err(never) => match never {},
        }
        // Parameters are not reached by the visitor.
        for def in file.func_defs_mut() {
            v.normalize_chain(&mut def.decl.ty);
        }
        Ok(TransformStats {
            rewritten: v.rewritten,
            ..Default::default()
        })
    }
}

#[derive(Default)]
struct Normalizer {
    rewritten: usize,
}

impl Normalizer {
    fn normalize_chain(&mut self, ty: &mut TypeNode) {
        match ty {
            TypeNode::TypeDecl(t) => {
                let canonical = t.scalar.c_name();
                if t.names.len() != 1 || t.names[0] != canonical {
                    t.names = vec![canonical.to_string()];
                    self.rewritten += 1;
                }
            }
            TypeNode::ArrayDecl(a) => self.normalize_chain(&mut a.ty),
            TypeNode::FuncDecl(f) => {
                for p in &mut f.params {
                    self.normalize_chain(&mut p.ty);
                }
                self.normalize_chain(&mut f.ty);
            }
        }
    }
}

impl VisitMut for Normalizer {
    type Error = std::convert::Infallible;

    fn visit_decl(&mut self, decl: &mut Decl) -> std::result::Result<(), Self::Error> {
        self.normalize_chain(&mut decl.ty);
        walk_decl_mut(self, decl)
    }

    fn visit_expr(&mut self, expr: &mut Expr) -> std::result::Result<(), Self::Error> {
        walk_expr_mut(self, expr)?;
        if let ExprKind::Constant(c) = &mut expr.kind {
            if let Some(normal) = normalize_literal(c) {
                tracing::trace!(from = %c.value, to = %normal.value, "literal normalized");
                *c = normal;
                self.rewritten += 1;
            }
        }
        Ok(())
    }
}

/// Canonical form of a literal, or `None` if it already is canonical.
fn normalize_literal(c: &Constant) -> Option<Constant> {
    let normal = match c.kind {
        ConstKind::Int => Constant {
            kind: ConstKind::Int,
            value: parse_int_literal(&c.value)?.to_string(),
        },
        ConstKind::Char => Constant {
            kind: ConstKind::Int,
            value: c.as_i64()?.to_string(),
        },
        ConstKind::Float => Constant {
            kind: ConstKind::Float,
            value: float_text(&c.value)?,
        },
        ConstKind::Str => return None,
    };
    (normal != *c).then_some(normal)
}

/// `1.5f` -> `1.5`, `1.` -> `1.0`, `.5` -> `0.5`, `2` -> `2.0`; `1e5` stays.
pub(crate) fn float_text(raw: &str) -> Option<String> {
    parse_float_literal(raw)?;
    let mut text = raw.trim_end_matches(['f', 'F', 'l', 'L']).to_string();
    if text.starts_with('.') {
        text.insert(0, '0');
    }
    let (mantissa, exponent) = match text.find(['e', 'E']) {
        Some(i) => text.split_at(i),
        None => (text.as_str(), ""),
    };
    let mantissa = if mantissa.ends_with('.') {
        format!("{mantissa}0")
    } else if !mantissa.contains('.') && exponent.is_empty() {
        format!("{mantissa}.0")
    } else {
        mantissa.to_string()
    };
    Some(format!("{mantissa}{}", exponent.to_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ckern_ast::{Compound, ExternalDecl, FuncDef, ScalarType, Stmt, TypeDecl};

    #[test]
    fn float_spellings() {
        assert_eq!(float_text("1.5f").as_deref(), Some("1.5"));
        assert_eq!(float_text("1.").as_deref(), Some("1.0"));
        assert_eq!(float_text(".25").as_deref(), Some("0.25"));
        assert_eq!(float_text("1e5").as_deref(), Some("1e5"));
        assert_eq!(float_text("3.4E38F").as_deref(), Some("3.4e38"));
        assert_eq!(float_text("2").as_deref(), Some("2.0"));
        assert_eq!(float_text("bogus"), None);
    }

    #[test]
    fn int_and_char_literals() {
        let hex = Constant {
            kind: ConstKind::Int,
            value: "0x10".into(),
        };
        assert_eq!(normalize_literal(&hex).map(|c| c.value), Some("16".into()));
        let ch = Constant {
            kind: ConstKind::Char,
            value: "'a'".into(),
        };
        let n = normalize_literal(&ch).unwrap();
        assert_eq!((n.kind, n.value.as_str()), (ConstKind::Int, "97"));
        let plain = Constant {
            kind: ConstKind::Int,
            value: "7".into(),
        };
        assert_eq!(normalize_literal(&plain), None);
    }

    #[test]
    fn double_declarations_become_float() {
        let mut param = Decl::scalar("x", ScalarType::Float, None);
        param.ty = TypeNode::TypeDecl(TypeDecl {
            names: vec!["long".into(), "double".into()],
            ..TypeDecl::new(Some("x".into()), ScalarType::Float)
        });
        let mut local = Decl::scalar("y", ScalarType::Float, Some(Expr::float("2.0f")));
        local.ty.element_mut().names = vec!["double".into()];

        let mut file = FileAst::new(vec![ExternalDecl::FuncDef(FuncDef {
            decl: Decl::prototype("f", ScalarType::Float, vec![param]),
            body: Compound::new(vec![Stmt::decl(local), Stmt::ret(Some(Expr::id("y")))]),
            coord: None,
        })]);
        let mut ctx = TransformContext::new("t", 6);
        let stats = NormalizeTypes.apply(&mut file, &mut ctx).unwrap();
        assert_eq!(stats.rewritten, 3);

        let def = file.func_def("f").unwrap();
        assert_eq!(def.params()[0].ty.element().names, ["float"]);
        assert_eq!(file.to_string().matches("2.0f").count(), 0);

        let again = NormalizeTypes.apply(&mut file, &mut ctx).unwrap();
        assert!(again.is_noop());
    }
}
