//! `goto` elimination by block replication.

use std::collections::HashMap;

use ckern_ast::visit::{each_stmt, rewrite_compounds, walk_compound, walk_stmt, walk_stmt_mut};
use ckern_ast::{Compound, FileAst, FuncDef, Stmt, StmtKind, Visit, VisitMut};

use crate::context::TransformContext;
use crate::error::{Result, TransformError};
use crate::transform::{AstTransform, TransformStats};

/// Replaces every `goto L` with a copy of the code that follows `L:`.
///
/// The code captured for a label runs from the labeled statement forward
/// through its block up to and including the first `return`, stepping
/// over any further labels on the way. Gotos inside a captured block are
/// expanded recursively; a label reached again while it is being
/// expanded is a cycle and fails the unit. Once all gotos are replaced,
/// labels are dropped and statements after a `return` in the same block
/// are removed as unreachable.
#[derive(Debug)]
pub struct GotoElimination;

impl AstTransform for GotoElimination {
    fn name(&self) -> &str {
        "goto-elimination"
    }

    fn apply(&self, file: &mut FileAst, _ctx: &mut TransformContext) -> Result<TransformStats> {
        let mut stats = TransformStats::default();
        for def in file.func_defs_mut() {
            stats += eliminate(def)?;
        }
        Ok(stats)
    }
}

fn eliminate(def: &mut FuncDef) -> Result<TransformStats> {
    let mut has_jumps = false;
    each_stmt(&def.body, |s| {
        if matches!(s.kind, StmtKind::Goto(_) | StmtKind::Label { .. }) {
            has_jumps = true;
        }
    });
    if !has_jumps {
        return Ok(TransformStats::default());
    }

    let mut collector = Captures::default();
    match collector.visit_compound(&def.body) {
        Ok(()) => {}
        Err(never) => match never {},
    }
    let mut captures = collector.blocks;
    for items in captures.values_mut() {
        let mut block = Compound::new(std::mem::take(items));
        strip_labels(&mut block);
        *items = block.items;
    }

    let mut stats = TransformStats {
        removed: strip_labels(&mut def.body),
        ..Default::default()
    };

    let mut expander = Expander {
        captures: &captures,
        function: def.name().to_string(),
        stack: Vec::new(),
        replaced: 0,
    };
    expander.visit_compound(&mut def.body)?;
    stats.rewritten = expander.replaced;
    stats.removed += drop_unreachable(&mut def.body);
    tracing::debug!(
        function = def.name(),
        labels = captures.len(),
        gotos = stats.rewritten,
        "gotos eliminated"
    );
    Ok(stats)
}

/// Label name -> statements the label stands for.
#[derive(Default)]
struct Captures {
    blocks: HashMap<String, Vec<Stmt>>,
}

/// Names on a chain of labels (`a: b: stmt`) and the statement under them.
fn label_chain(stmt: &Stmt) -> (Vec<&str>, &Stmt) {
    let mut names = Vec::new();
    let mut cur = stmt;
    while let StmtKind::Label { name, stmt } = &cur.kind {
        names.push(name.as_str());
        cur = stmt;
    }
    (names, cur)
}

impl Visit for Captures {
    type Error = std::convert::Infallible;

    fn visit_compound(&mut self, compound: &Compound) -> std::result::Result<(), Self::Error> {
        for (i, item) in compound.items.iter().enumerate() {
            let (names, _) = label_chain(item);
            if names.is_empty() {
                continue;
            }
            let end = compound.items[i..]
                .iter()
                .position(|s| label_chain(s).1.is_return())
                .map_or(compound.items.len(), |p| i + p + 1);
            for name in names {
                self.blocks
                    .entry(name.to_string())
                    .or_insert_with(|| compound.items[i..end].to_vec());
            }
        }
        walk_compound(self, compound)
    }

    fn visit_stmt(&mut self, stmt: &Stmt) -> std::result::Result<(), Self::Error> {
        // Labels outside a block's item list capture just their statement.
        if let StmtKind::Label { name, stmt: inner } = &stmt.kind {
            self.blocks
                .entry(name.clone())
                .or_insert_with(|| vec![inner.as_ref().clone()]);
        }
        walk_stmt(self, stmt)
    }
}

/// Replace `L: stmt` by `stmt` everywhere. Returns the number of labels removed.
fn strip_labels(block: &mut Compound) -> usize {
    struct Stripper(usize);

    impl VisitMut for Stripper {
        type Error = std::convert::Infallible;

        fn visit_stmt(&mut self, stmt: &mut Stmt) -> std::result::Result<(), Self::Error> {
            while let StmtKind::Label { stmt: inner, .. } = &mut stmt.kind {
                let inner = std::mem::replace(inner.as_mut(), Stmt::new(StmtKind::Empty));
                *stmt = inner;
                self.0 += 1;
            }
            walk_stmt_mut(self, stmt)
        }
    }

    let mut s = Stripper(0);
    match s.visit_compound(block) {
        Ok(()) => s.0,
        Err(never) => match never {},
    }
}

struct Expander<'a> {
    captures: &'a HashMap<String, Vec<Stmt>>,
    function: String,
    stack: Vec<String>,
    replaced: usize,
}

impl Expander<'_> {
    fn expand(&mut self, label: &str) -> Result<Stmt> {
        if self.stack.iter().any(|l| l == label) {
            return Err(TransformError::CyclicGoto {
                label: label.to_string(),
                function: self.function.clone(),
            });
        }
        let items = self
            .captures
            .get(label)
            .cloned()
            .ok_or_else(|| TransformError::UnknownLabel {
                label: label.to_string(),
                function: self.function.clone(),
            })?;
        self.stack.push(label.to_string());
        let mut block = Compound::new(items);
        self.visit_compound(&mut block)?;
        self.stack.pop();
        Ok(Stmt::new(StmtKind::Compound(block)))
    }
}

impl VisitMut for Expander<'_> {
    type Error = TransformError;

    fn visit_stmt(&mut self, stmt: &mut Stmt) -> Result<()> {
        if let StmtKind::Goto(label) = &stmt.kind {
            let label = label.clone();
            let coord = stmt.coord.take();
            *stmt = self.expand(&label)?.at(coord);
            self.replaced += 1;
            tracing::trace!(function = %self.function, label = %label, "goto replaced");
            return Ok(());
        }
        walk_stmt_mut(self, stmt)
    }
}

/// Truncate every block after its first `return`.
fn drop_unreachable(body: &mut Compound) -> usize {
    let mut removed = 0;
    let _ = rewrite_compounds(body, |block| {
        if let Some(p) = block.items.iter().position(Stmt::is_return) {
            removed += block.items.len() - (p + 1);
            block.items.truncate(p + 1);
        }
        Ok::<(), ()>(())
    });
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use ckern_ast::{BinaryOp, Decl, Expr, ExternalDecl, ScalarType};

    fn label(name: &str, stmt: Stmt) -> Stmt {
        Stmt::new(StmtKind::Label {
            name: name.into(),
            stmt: Box::new(stmt),
        })
    }

    fn goto(name: &str) -> Stmt {
        Stmt::new(StmtKind::Goto(name.into()))
    }

    fn unit(body: Vec<Stmt>) -> FileAst {
        FileAst::new(vec![ExternalDecl::FuncDef(FuncDef {
            decl: Decl::prototype("f", ScalarType::Float, vec![Decl::scalar("x", ScalarType::Float, None)]),
            body: Compound::new(body),
            coord: None,
        })])
    }

    fn count_jumps(file: &FileAst) -> usize {
        let mut n = 0;
        for def in file.func_defs() {
            each_stmt(&def.body, |s| {
                if matches!(s.kind, StmtKind::Goto(_) | StmtKind::Label { .. }) {
                    n += 1;
                }
            });
        }
        n
    }

    #[test]
    fn forward_jumps_replaced_by_tail_blocks() {
        // if (x < 0) goto small; return x; small: if (x == 0) goto domerr; return -x; domerr: return NAN;
        let mut file = unit(vec![
            Stmt::if_then(Expr::binary(BinaryOp::Lt, Expr::id("x"), Expr::int(0)), goto("small"), None),
            Stmt::ret(Some(Expr::id("x"))),
            label(
                "small",
                Stmt::if_then(Expr::binary(BinaryOp::Eq, Expr::id("x"), Expr::int(0)), goto("domerr"), None),
            ),
            Stmt::ret(Some(Expr::unary(ckern_ast::UnaryOp::Neg, Expr::id("x")))),
            label("domerr", Stmt::ret(Some(Expr::id("NAN")))),
        ]);
        let mut ctx = TransformContext::new("t", 6);
        let stats = GotoElimination.apply(&mut file, &mut ctx).unwrap();
        assert_eq!(stats.rewritten, 3);
        assert_eq!(count_jumps(&file), 0);

        let expected = "\
float f(float x) {
    if (x < 0) {
        if (x == 0) {
            return NAN;
        }
        return -x;
    }
    return x;
}
";
        assert_eq!(file.to_string(), expected);
        assert!(GotoElimination.apply(&mut file, &mut ctx).unwrap().is_noop());
    }

    #[test]
    fn capture_steps_over_following_labels() {
        // goto a; a: x = 1; b: return x;
        let assign = Stmt::expr(Expr::assign(ckern_ast::AssignOp::Assign, Expr::id("x"), Expr::float("1.0")));
        let mut file = unit(vec![
            Stmt::if_then(Expr::id("x"), goto("a"), None),
            Stmt::ret(Some(Expr::float("0.0"))),
            label("a", assign),
            label("b", Stmt::ret(Some(Expr::id("x")))),
        ]);
        let mut ctx = TransformContext::new("t", 6);
        GotoElimination.apply(&mut file, &mut ctx).unwrap();
        let text = file.to_string();
        assert!(text.contains("x = 1.0;\n        return x;"), "{text}");
        assert_eq!(count_jumps(&file), 0);
    }

    #[test]
    fn unknown_label_is_an_error() {
        let mut file = unit(vec![goto("nowhere"), Stmt::ret(None)]);
        let mut ctx = TransformContext::new("t", 6);
        let err = GotoElimination.apply(&mut file, &mut ctx).unwrap_err();
        assert!(matches!(
            err,
            TransformError::UnknownLabel { ref label, ref function } if label == "nowhere" && function == "f"
        ));
    }

    #[test]
    fn backward_jump_is_a_cycle() {
        // top: x = x + 1; goto top;
        let mut file = unit(vec![
            label(
                "top",
                Stmt::expr(Expr::assign(
                    ckern_ast::AssignOp::Assign,
                    Expr::id("x"),
                    Expr::binary(BinaryOp::Add, Expr::id("x"), Expr::int(1)),
                )),
            ),
            goto("top"),
        ]);
        let mut ctx = TransformContext::new("t", 6);
        assert!(matches!(
            GotoElimination.apply(&mut file, &mut ctx),
            Err(TransformError::CyclicGoto { .. })
        ));
    }
}
