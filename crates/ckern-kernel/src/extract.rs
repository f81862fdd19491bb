//! Classification of a normalized unit into kernel records.
//!
//! Globals on the variable allow-list, and globals without an
//! initializer, become variables. Every other initialized global is a
//! constant and must fold to numbers here. Function bodies are emitted for
//! both families and scanned for the names they reference; nothing is
//! followed transitively, the linker does that.

use std::collections::{HashMap, HashSet, VecDeque};
use std::convert::Infallible;

use ckern_ast::visit::{walk_compound, walk_decl, walk_expr, walk_stmt, Visit};
use ckern_ast::{
    BinaryOp, Compound, ConstKind, Decl, Expr, ExprKind, ExternalDecl, FileAst, ForInit,
    FuncDef, ScalarType, Stmt, StmtKind, UnaryOp,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::builtins::BUILTIN_CONSTANTS;
use crate::emit::{emit_function, strip_suffix};
use crate::error::{KernelError, Result};
use crate::kernel::{
    Dependencies, FunctionKernel, Kernel, KernelArg, KernelValue, ValueKernel, NAN_LITERAL,
};
use crate::target::TargetFamily;

/// Globals treated as variables when no list is configured.
pub const DEFAULT_VARIABLES: &[&str] = &["sgngamf"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Globals that are mutable state rather than constants.
    pub variables: Vec<String>,
    /// When set, only kernels reachable from these names are kept.
    pub exports: Option<Vec<String>>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            variables: DEFAULT_VARIABLES.iter().map(|s| s.to_string()).collect(),
            exports: None,
        }
    }
}

/// Kernels extracted from one unit, in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KernelBatch {
    pub kernels: Vec<Kernel>,
}

impl KernelBatch {
    pub fn len(&self) -> usize {
        self.kernels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kernels.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Kernel> {
        self.kernels.iter().find(|k| k.name() == name)
    }

    /// Drop every kernel not reachable from `exports` through this batch's
    /// own dependency edges. Names defined elsewhere are left to the
    /// linker.
    pub fn retain_reachable(&mut self, exports: &[String]) {
        let by_name: HashMap<&str, &Kernel> =
            self.kernels.iter().map(|k| (k.name(), k)).collect();
        let mut keep: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        for name in exports {
            if by_name.contains_key(name.as_str()) {
                queue.push_back(name);
            } else {
                warn!(export = %name, "export is not defined in this unit");
            }
        }
        while let Some(name) = queue.pop_front() {
            if !keep.insert(name.to_string()) {
                continue;
            }
            let Some(Kernel::Function(f)) = by_name.get(name) else {
                continue;
            };
            for dep in f
                .deps
                .functions
                .iter()
                .chain(&f.deps.constants)
                .chain(&f.deps.variables)
            {
                if by_name.contains_key(dep.as_str()) && !keep.contains(dep) {
                    queue.push_back(dep);
                }
            }
        }
        let before = self.kernels.len();
        self.kernels.retain(|k| keep.contains(k.name()));
        debug!(
            kept = self.kernels.len(),
            dropped = before - self.kernels.len(),
            "reduced batch to exports"
        );
    }
}

/// Extract kernel records from a normalized unit.
pub fn extract(file: &FileAst, config: &ExtractConfig) -> Result<KernelBatch> {
    let allow: HashSet<&str> = config.variables.iter().map(String::as_str).collect();

    // Names first, so functions defined before a global still see it.
    let mut constants: HashSet<String> = HashSet::new();
    let mut variables: HashSet<String> = HashSet::new();
    for ext in &file.ext {
        let ExternalDecl::Decl(decl) = ext else {
            continue;
        };
        let Some(name) = decl.name.as_deref() else {
            continue;
        };
        if decl.is_function() {
            continue;
        }
        if allow.contains(name) || (decl.init.is_none() && !decl.is_extern()) {
            variables.insert(name.to_string());
        } else {
            constants.insert(name.to_string());
        }
    }

    let mut folder = Folder::default();
    let mut kernels = Vec::new();
    for ext in &file.ext {
        match ext {
            ExternalDecl::Decl(decl) if decl.is_function() || decl.is_extern() => {}
            ExternalDecl::Decl(decl) => {
                let Some(name) = decl.name.clone() else {
                    continue;
                };
                let value = folder.value(&name, decl)?;
                if variables.contains(&name) {
                    debug!(name = %name, "variable");
                    kernels.push(Kernel::Variable(value));
                } else {
                    debug!(name = %name, "constant");
                    folder.known.insert(name, value.clone());
                    kernels.push(Kernel::Constant(value));
                }
            }
            ExternalDecl::FuncDef(def) => {
                let kernel = function_kernel(def, &constants, &variables)?;
                debug!(
                    name = %kernel.name,
                    deps = kernel.deps.len(),
                    "function"
                );
                kernels.push(Kernel::Function(kernel));
            }
        }
    }

    let mut batch = KernelBatch { kernels };
    if let Some(exports) = &config.exports {
        batch.retain_reachable(exports);
    }
    info!(kernels = batch.len(), "extracted kernels");
    Ok(batch)
}

fn function_kernel(
    def: &FuncDef,
    constants: &HashSet<String>,
    variables: &HashSet<String>,
) -> Result<FunctionKernel> {
    let args = def
        .params()
        .iter()
        .enumerate()
        .map(|(index, p)| KernelArg {
            name: p.name.clone().unwrap_or_else(|| format!("_a{index}")),
            ty: p.scalar_type(),
            index,
            array_len: p.array_len(),
        })
        .collect();

    Ok(FunctionKernel {
        name: def.name().to_string(),
        args,
        return_type: def.return_type(),
        deps: dependencies(def, constants, variables),
        shader: Some(emit_function(def, TargetFamily::Shader)?),
        scalar: Some(emit_function(def, TargetFamily::Scalar)?),
    })
}

/// Names a function body refers to, split by kind.
pub fn dependencies(
    def: &FuncDef,
    constants: &HashSet<String>,
    variables: &HashSet<String>,
) -> Dependencies {
    let params = def.params().iter().filter_map(|p| p.name.clone()).collect();
    let mut collector = DependencyCollector {
        function: def.name(),
        constants,
        variables,
        scopes: vec![params],
        deps: Dependencies::default(),
    };
    match collector.visit_compound(&def.body) {
        Ok(()) => collector.deps,
        Err(never) => match never {},
    }
}

/// Walks one body with a stack of block scopes, so a local only hides a
/// global inside the block that declares it.
struct DependencyCollector<'a> {
    function: &'a str,
    constants: &'a HashSet<String>,
    variables: &'a HashSet<String>,
    scopes: Vec<HashSet<String>>,
    deps: Dependencies,
}

impl DependencyCollector<'_> {
    fn is_local(&self, name: &str) -> bool {
        self.scopes.iter().any(|s| s.contains(name))
    }

    fn scoped<F>(&mut self, f: F) -> std::result::Result<(), Infallible>
    where
        F: FnOnce(&mut Self) -> std::result::Result<(), Infallible>,
    {
        self.scopes.push(HashSet::new());
        let result = f(self);
        self.scopes.pop();
        result
    }

    fn reference(&mut self, name: &str) {
        if self.is_local(name) {
            return;
        }
        if self.variables.contains(name) {
            self.deps.variables.insert(name.to_string());
        } else if self.constants.contains(name) || BUILTIN_CONSTANTS.contains(&name) {
            self.deps.constants.insert(name.to_string());
        } else {
            warn!(function = self.function, name = %name, "unresolved identifier");
        }
    }
}

impl Visit for DependencyCollector<'_> {
    type Error = Infallible;

    fn visit_compound(&mut self, compound: &Compound) -> std::result::Result<(), Infallible> {
        self.scoped(|v| walk_compound(v, compound))
    }

    fn visit_decl(&mut self, decl: &Decl) -> std::result::Result<(), Infallible> {
        // The initializer still sees the outer binding.
        walk_decl(self, decl)?;
        if let (Some(name), Some(scope)) = (&decl.name, self.scopes.last_mut()) {
            scope.insert(name.clone());
        }
        Ok(())
    }

    fn visit_stmt(&mut self, stmt: &Stmt) -> std::result::Result<(), Infallible> {
        match &stmt.kind {
            StmtKind::For {
                init: Some(ForInit::Decls(_)),
                ..
            } => self.scoped(|v| walk_stmt(v, stmt)),
            _ => walk_stmt(self, stmt),
        }
    }

    fn visit_expr(&mut self, expr: &Expr) -> std::result::Result<(), Infallible> {
        match &expr.kind {
            ExprKind::Call { name, .. } => {
                self.deps.functions.insert(name.clone());
            }
            ExprKind::Id(name) => self.reference(name),
            _ => {}
        }
        walk_expr(self, expr)
    }
}

/// Folds global initializers, remembering constants already seen.
#[derive(Debug, Default)]
struct Folder {
    known: HashMap<String, ValueKernel>,
}

impl Folder {
    fn value(&self, name: &str, decl: &Decl) -> Result<ValueKernel> {
        let ty = decl.scalar_type();
        let (value, literals) = if decl.is_array() {
            let len = decl.array_len().ok_or_else(|| KernelError::Unsupported {
                name: name.to_string(),
                detail: "array without a size or initializer".to_string(),
            })?;
            let items: &[Expr] = match decl.init.as_ref().map(|e| &e.kind) {
                Some(ExprKind::InitList(items)) => items,
                Some(_) => {
                    return Err(KernelError::NonConstantInitializer {
                        name: name.to_string(),
                    })
                }
                None => &[],
            };
            let mut values = Vec::with_capacity(len);
            let mut literals = Vec::with_capacity(len);
            for item in items.iter().take(len) {
                let v = self.number(name, ty, item)?;
                literals.push(literal(item, v, ty));
                values.push(v);
            }
            while values.len() < len {
                values.push(0.0);
                literals.push(zero_literal(ty));
            }
            (KernelValue::Vector(values), literals)
        } else {
            match &decl.init {
                Some(init) => {
                    let v = self.number(name, ty, init)?;
                    (KernelValue::Scalar(v), vec![literal(init, v, ty)])
                }
                None => (KernelValue::Scalar(0.0), vec![zero_literal(ty)]),
            }
        };
        Ok(ValueKernel {
            name: name.to_string(),
            ty,
            value,
            literals,
        })
    }

    /// Fold one scalar initializer.
    fn number(&self, name: &str, ty: ScalarType, expr: &Expr) -> Result<f64> {
        let v = self.fold(expr).ok_or_else(|| KernelError::NonConstantInitializer {
            name: name.to_string(),
        })?;
        if v.is_infinite() {
            return Err(KernelError::Unsupported {
                name: name.to_string(),
                detail: "initializer is infinite".to_string(),
            });
        }
        Ok(match ty {
            ScalarType::Int => v.trunc(),
            _ => v,
        })
    }

    fn fold(&self, expr: &Expr) -> Option<f64> {
        match &expr.kind {
            ExprKind::Constant(c) => c.as_f64(),
            ExprKind::Id(id) if id == NAN_LITERAL => Some(f64::NAN),
            ExprKind::Id(id) => match &self.known.get(id)?.value {
                KernelValue::Scalar(v) => Some(*v),
                KernelValue::Vector(_) => None,
            },
            ExprKind::Index { array, index } => {
                let vector = self.known.get(array.as_id()?)?.value.as_vector()?;
                let i = usize::try_from(index.as_int_literal()?).ok()?;
                vector.get(i).copied()
            }
            ExprKind::Unary { op, operand } => {
                let v = self.fold(operand)?;
                match op {
                    UnaryOp::Neg => Some(-v),
                    UnaryOp::Plus => Some(v),
                    _ => None,
                }
            }
            ExprKind::Binary { op, left, right } => {
                let (a, b) = (self.fold(left)?, self.fold(right)?);
                match op {
                    BinaryOp::Add => Some(a + b),
                    BinaryOp::Sub => Some(a - b),
                    BinaryOp::Mul => Some(a * b),
                    BinaryOp::Div => Some(a / b),
                    _ => None,
                }
            }
            ExprKind::Call { name, args } if args.len() == 1 => {
                let v = self.fold(&args[0])?;
                match name.as_str() {
                    "float" => Some(v),
                    "int" => Some(v.trunc()),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

/// Source text reproducing a folded value.
///
/// Float literals keep their spelling; everything else is printed from
/// the value.
fn literal(expr: &Expr, value: f64, ty: ScalarType) -> String {
    if value.is_nan() {
        return NAN_LITERAL.to_string();
    }
    if ty == ScalarType::Float {
        match &expr.kind {
            ExprKind::Constant(c) if c.kind == ConstKind::Float => {
                return strip_suffix(&c.value).to_string();
            }
            ExprKind::Unary {
                op: UnaryOp::Neg,
                operand,
            } => {
                if let ExprKind::Constant(c) = &operand.kind {
                    if c.kind == ConstKind::Float {
                        return format!("-{}", strip_suffix(&c.value));
                    }
                }
            }
            _ => {}
        }
    }
    match ty {
        ScalarType::Float => format!("{value:?}"),
        ScalarType::Bool => (value != 0.0).to_string(),
        _ => format!("{}", value as i64),
    }
}

fn zero_literal(ty: ScalarType) -> String {
    match ty {
        ScalarType::Float => "0.0".to_string(),
        ScalarType::Bool => "false".to_string(),
        _ => "0".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ckern_ast::{AssignOp, Compound, Stmt};
    use std::collections::BTreeSet;

    fn func(name: &str, params: Vec<Decl>, body: Vec<Stmt>) -> ExternalDecl {
        ExternalDecl::FuncDef(FuncDef {
            decl: Decl::prototype(name, ScalarType::Float, params),
            body: Compound::new(body),
            coord: None,
        })
    }

    fn global(decl: Decl) -> ExternalDecl {
        ExternalDecl::Decl(decl)
    }

    fn gamma_unit() -> FileAst {
        let x = || Decl::scalar("x", ScalarType::Float, None);
        FileAst::new(vec![
            global(Decl::prototype("stir", ScalarType::Float, vec![x()])),
            global(Decl::array(
                "gammaf_P",
                ScalarType::Float,
                Some(3),
                Some(Expr::new(ExprKind::InitList(vec![
                    Expr::float("1.0f"),
                    Expr::float("2.5"),
                ]))),
            )),
            global(Decl::scalar("HALF", ScalarType::Float, Some(Expr::float("0.5")))),
            global(Decl::scalar(
                "TWO",
                ScalarType::Float,
                Some(Expr::binary(BinaryOp::Mul, Expr::id("HALF"), Expr::float("4.0"))),
            )),
            global(Decl::scalar("K", ScalarType::Int, Some(Expr::int(16)))),
            global(Decl::scalar("sgngamf", ScalarType::Int, Some(Expr::int(0)))),
            func(
                "gamma",
                vec![x()],
                vec![
                    Stmt::decl(Decl::scalar(
                        "p",
                        ScalarType::Float,
                        Some(Expr::call(
                            "polevlf_3",
                            vec![Expr::id("x"), Expr::id("gammaf_P"), Expr::int(2)],
                        )),
                    )),
                    Stmt::expr(Expr::assign(AssignOp::Assign, Expr::id("sgngamf"), Expr::int(1))),
                    Stmt::ret(Some(Expr::binary(
                        BinaryOp::Add,
                        Expr::binary(
                            BinaryOp::Mul,
                            Expr::call("stir", vec![Expr::id("x")]),
                            Expr::id("p"),
                        ),
                        Expr::binary(BinaryOp::Add, Expr::id("TWO"), Expr::id("NAN")),
                    ))),
                ],
            ),
        ])
    }

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn classifies_globals_and_functions() {
        let batch = extract(&gamma_unit(), &ExtractConfig::default()).unwrap();
        let kinds: Vec<(&str, String)> = batch
            .kernels
            .iter()
            .map(|k| (k.name(), k.kind().to_string()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("gammaf_P", "constant".to_string()),
                ("HALF", "constant".to_string()),
                ("TWO", "constant".to_string()),
                ("K", "constant".to_string()),
                ("sgngamf", "variable".to_string()),
                ("gamma", "function".to_string()),
            ]
        );
    }

    #[test]
    fn folds_initializers() {
        let batch = extract(&gamma_unit(), &ExtractConfig::default()).unwrap();
        let value = |name: &str| batch.get(name).and_then(Kernel::as_value).unwrap().clone();

        let p = value("gammaf_P");
        assert_eq!(p.value, KernelValue::Vector(vec![1.0, 2.5, 0.0]));
        assert_eq!(p.literals, vec!["1.0", "2.5", "0.0"]);

        let two = value("TWO");
        assert_eq!(two.value, KernelValue::Scalar(2.0));
        assert_eq!(two.literals, vec!["2.0"]);

        assert_eq!(value("K").literals, vec!["16"]);
    }

    #[test]
    fn collects_dependencies_by_kind() {
        let batch = extract(&gamma_unit(), &ExtractConfig::default()).unwrap();
        let gamma = batch.get("gamma").and_then(Kernel::as_function).unwrap();
        assert_eq!(gamma.deps.functions, set(&["polevlf_3", "stir"]));
        assert_eq!(gamma.deps.constants, set(&["NAN", "TWO", "gammaf_P"]));
        assert_eq!(gamma.deps.variables, set(&["sgngamf"]));
        assert_eq!(gamma.args.len(), 1);
        assert!(gamma
            .shader
            .as_ref()
            .unwrap()
            .body
            .starts_with("float gamma(float x) {\n"));
        assert!(gamma
            .scalar
            .as_ref()
            .unwrap()
            .body
            .starts_with("function gamma(x) {\n"));
    }

    #[test]
    fn inner_block_local_hides_global_only_inside_the_block() {
        // float C = 2.0f;
        // float f(float x) { if (x > 0.0f) { float C = 1.0f; x = x + C; } return x * C; }
        // float g(float C) { return C; }
        let inner = Stmt::compound(vec![
            Stmt::decl(Decl::scalar("C", ScalarType::Float, Some(Expr::float("1.0")))),
            Stmt::expr(Expr::assign(
                AssignOp::Assign,
                Expr::id("x"),
                Expr::binary(BinaryOp::Add, Expr::id("x"), Expr::id("C")),
            )),
        ]);
        let file = FileAst::new(vec![
            global(Decl::scalar("C", ScalarType::Float, Some(Expr::float("2.0f")))),
            func(
                "f",
                vec![Decl::scalar("x", ScalarType::Float, None)],
                vec![
                    Stmt::if_then(
                        Expr::binary(BinaryOp::Gt, Expr::id("x"), Expr::float("0.0")),
                        inner,
                        None,
                    ),
                    Stmt::ret(Some(Expr::binary(BinaryOp::Mul, Expr::id("x"), Expr::id("C")))),
                ],
            ),
            func(
                "g",
                vec![Decl::scalar("C", ScalarType::Float, None)],
                vec![Stmt::ret(Some(Expr::id("C")))],
            ),
        ]);
        let batch = extract(&file, &ExtractConfig::default()).unwrap();
        let deps = |name: &str| batch.get(name).and_then(Kernel::as_function).unwrap().deps.clone();
        assert_eq!(deps("f").constants, set(&["C"]));
        assert!(deps("g").constants.is_empty());
    }

    #[test]
    fn unresolved_identifier_is_not_a_dependency() {
        let file = FileAst::new(vec![func("f", vec![], vec![Stmt::ret(Some(Expr::id("Q")))])]);
        let batch = extract(&file, &ExtractConfig::default()).unwrap();
        let f = batch.get("f").and_then(Kernel::as_function).unwrap();
        assert_eq!(f.deps, Dependencies::default());
    }

    #[test]
    fn non_constant_initializer_is_rejected() {
        let file = FileAst::new(vec![global(Decl::scalar(
            "B",
            ScalarType::Float,
            Some(Expr::call("foo", vec![Expr::float("1.0")])),
        ))]);
        let err = extract(&file, &ExtractConfig::default()).unwrap_err();
        assert!(matches!(err, KernelError::NonConstantInitializer { name } if name == "B"));
    }

    #[test]
    fn negative_literals_keep_their_text() {
        let file = FileAst::new(vec![global(Decl::scalar(
            "M",
            ScalarType::Float,
            Some(Expr::unary(UnaryOp::Neg, Expr::float("3.5e-2f"))),
        ))]);
        let batch = extract(&file, &ExtractConfig::default()).unwrap();
        let m = batch.get("M").and_then(Kernel::as_value).unwrap();
        assert_eq!(m.literals, vec!["-3.5e-2"]);
        assert_eq!(m.value, KernelValue::Scalar(-0.035));
    }

    #[test]
    fn uninitialized_globals_are_variables() {
        let file = FileAst::new(vec![global(Decl::scalar("state", ScalarType::Float, None))]);
        let batch = extract(&file, &ExtractConfig::default()).unwrap();
        assert_eq!(batch.kernels[0].kind().to_string(), "variable");
    }

    #[test]
    fn reduction_keeps_only_reachable_kernels() {
        let file = FileAst::new(vec![
            global(Decl::scalar("C", ScalarType::Float, Some(Expr::float("1.0")))),
            global(Decl::scalar("D", ScalarType::Float, Some(Expr::float("2.0")))),
            func("g", vec![], vec![Stmt::ret(Some(Expr::id("C")))]),
            func("f", vec![], vec![Stmt::ret(Some(Expr::call("g", vec![])))]),
            func("h", vec![], vec![Stmt::ret(Some(Expr::id("D")))]),
        ]);
        let config = ExtractConfig {
            exports: Some(vec!["f".to_string(), "missing".to_string()]),
            ..ExtractConfig::default()
        };
        let batch = extract(&file, &config).unwrap();
        let names: Vec<&str> = batch.kernels.iter().map(|k| k.name()).collect();
        assert_eq!(names, vec!["C", "g", "f"]);
    }
}
