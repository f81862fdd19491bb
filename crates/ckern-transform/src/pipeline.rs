//! Pipeline orchestrator: runs the fixed pass sequence over one unit.

use std::time::Instant;

use ckern_ast::FileAst;

use crate::context::{TransformContext, DEFAULT_POOL_CAPACITY};
use crate::error::Result;
use crate::passes::{
    AbsIdiom, BuiltinMath, CastToCall, ExplicitTypes, GotoElimination, IsOddIdiom,
    LoopNormalization, MtherrElision, NormalizeTypes, RecursionUnrolling, StaticArrays,
    StaticStorage,
};
use crate::report::TransformReport;
use crate::transform::TransformRegistry;

/// Configuration for transforming one compilation unit.
#[derive(Debug)]
pub struct PipelineConfig {
    /// Base name of the source file, used to prefix hoisted statics.
    pub base_name: String,
    /// Passes to run, in order.
    pub transforms: TransformRegistry,
    /// Loop counter names available to the unit.
    pub pool_capacity: usize,
}

impl PipelineConfig {
    /// The standard pass order.
    ///
    /// Later passes rely on the normal forms established by earlier ones:
    /// casts are calls before the idiom folds run, gotos are gone before
    /// loops are rewritten, and type coercion runs last so that every
    /// synthetic call it sees already has a known signature.
    pub fn standard(base_name: impl Into<String>) -> Self {
        let mut transforms = TransformRegistry::new();
        transforms.register(Box::new(NormalizeTypes));
        transforms.register(Box::new(MtherrElision));
        transforms.register(Box::new(BuiltinMath));
        transforms.register(Box::new(StaticStorage));
        transforms.register(Box::new(CastToCall));
        transforms.register(Box::new(AbsIdiom));
        transforms.register(Box::new(IsOddIdiom));
        transforms.register(Box::new(GotoElimination));
        transforms.register(Box::new(LoopNormalization));
        transforms.register(Box::new(RecursionUnrolling));
        transforms.register(Box::new(StaticArrays));
        transforms.register(Box::new(ExplicitTypes));
        Self {
            base_name: base_name.into(),
            transforms,
            pool_capacity: DEFAULT_POOL_CAPACITY,
        }
    }

    /// A configuration with no passes.
    pub fn empty(base_name: impl Into<String>) -> Self {
        Self {
            base_name: base_name.into(),
            transforms: TransformRegistry::new(),
            pool_capacity: DEFAULT_POOL_CAPACITY,
        }
    }
}

/// Output of a successful pipeline run.
#[derive(Debug)]
pub struct TransformOutput {
    /// The normalized tree.
    pub file: FileAst,
    pub report: TransformReport,
}

/// Run every configured pass over `file`.
///
/// A fresh [`TransformContext`] is created for the unit, so the name
/// pool starts over for every call.
pub fn transform(mut file: FileAst, config: &PipelineConfig) -> Result<TransformOutput> {
    let start = Instant::now();
    let mut ctx = TransformContext::new(&config.base_name, config.pool_capacity);

    let passes = config.transforms.apply_all(&mut file, &mut ctx)?;

    let report = TransformReport {
        unit: ctx.base_name.clone(),
        duration_ms: start.elapsed().as_millis() as u64,
        passes,
        names_issued: ctx.names.issued(),
    };
    tracing::info!(
        unit = %report.unit,
        passes = report.passes.len(),
        rewritten = report.total().rewritten,
        "unit transformed"
    );
    Ok(TransformOutput { file, report })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ckern_ast::{BinaryOp, Compound, Decl, Expr, ExternalDecl, FuncDef, ScalarType, Stmt, StmtKind};

    fn counting_unit(loops: usize) -> FileAst {
        let mut items = vec![Stmt::decl(Decl::scalar(
            "i",
            ScalarType::Int,
            Some(Expr::int(0)),
        ))];
        for _ in 0..loops {
            items.push(Stmt::new(StmtKind::While {
                cond: Expr::binary(BinaryOp::Lt, Expr::id("i"), Expr::int(10)),
                body: Box::new(Stmt::compound(vec![Stmt::expr(Expr::unary(
                    ckern_ast::UnaryOp::PostInc,
                    Expr::id("i"),
                ))])),
            }));
        }
        items.push(Stmt::ret(Some(Expr::id("i"))));
        FileAst::new(vec![ExternalDecl::FuncDef(FuncDef {
            decl: Decl::prototype("count", ScalarType::Int, Vec::new()),
            body: Compound::new(items),
            coord: None,
        })])
    }

    #[test]
    fn standard_order() {
        let config = PipelineConfig::standard("gammaf");
        assert_eq!(
            config.transforms.names(),
            [
                "normalize-types",
                "mtherr-elision",
                "builtin-math",
                "static-storage",
                "cast-to-call",
                "abs-idiom",
                "is-odd-idiom",
                "goto-elimination",
                "loop-normalization",
                "recursion-unrolling",
                "static-arrays",
                "explicit-types",
            ]
        );
    }

    #[test]
    fn empty_pipeline_is_identity() {
        let file = counting_unit(1);
        let out = transform(file.clone(), &PipelineConfig::empty("unit")).unwrap();
        assert_eq!(out.file, file);
        assert!(out.report.passes.is_empty());
    }

    #[test]
    fn name_pool_is_per_unit() {
        let config = PipelineConfig::standard("unit");
        let first = transform(counting_unit(4), &config).unwrap();
        assert_eq!(first.report.names_issued, 4);
        // A second unit gets a fresh pool.
        let second = transform(counting_unit(4), &config).unwrap();
        assert_eq!(second.report.names_issued, 4);
    }

    #[test]
    fn pool_exhaustion_fails_unit() {
        let config = PipelineConfig::standard("unit");
        let err = transform(counting_unit(7), &config).unwrap_err();
        assert!(matches!(
            err,
            crate::TransformError::NamePoolExhausted { capacity: 6 }
        ));
    }

    #[test]
    fn standard_pipeline_is_idempotent() {
        let config = PipelineConfig::standard("unit");
        let once = transform(counting_unit(2), &config).unwrap().file;
        let twice = transform(once.clone(), &config).unwrap();
        assert_eq!(twice.file, once);
        assert!(twice.report.total().is_noop());
    }
}
