//! Explicit numeric coercions.
//!
//! The scalar dialect has a single number type and the shader dialect
//! has no implicit conversions, so after this pass every point where C
//! would convert between `int`, `float`, and `bool` carries an explicit
//! `int(..)`, `float(..)`, or `bool(..)` call. Integer division and
//! remainder are spelled so that both dialects truncate.

use std::collections::HashMap;

use ckern_ast::node::parse_int_literal;
use ckern_ast::{
    AssignOp, BinaryOp, Compound, ConstKind, Decl, Expr, ExprKind, ExternalDecl, FileAst,
    ForInit, ScalarType, Stmt, StmtKind, UnaryOp,
};

use super::{generic_math_names, has_side_effects};
use crate::context::TransformContext;
use crate::error::Result;
use crate::transform::{AstTransform, TransformStats};

/// Integer remainder builtin.
const IMOD: &str = "imod";

#[derive(Debug)]
pub struct ExplicitTypes;

impl AstTransform for ExplicitTypes {
    fn name(&self) -> &str {
        "explicit-types"
    }

    fn apply(&self, file: &mut FileAst, _ctx: &mut TransformContext) -> Result<TransformStats> {
        let env = Env::new(file);
        let mut rewritten = 0;
        for ext in &mut file.ext {
            match ext {
                ExternalDecl::Decl(decl) if !decl.is_function() => {
                    let mut typer = Typer::new(&env, ScalarType::Void, &[]);
                    typer.decl(decl);
                    rewritten += typer.rewritten;
                }
                ExternalDecl::Decl(_) => {}
                ExternalDecl::FuncDef(def) => {
                    let mut typer = Typer::new(&env, def.return_type(), def.params());
                    typer.compound(&mut def.body);
                    rewritten += typer.rewritten;
                }
            }
        }
        Ok(TransformStats {
            rewritten,
            ..Default::default()
        })
    }
}

#[derive(Debug)]
enum Params {
    /// Declared parameter types; `None` marks an array parameter.
    Fixed(Vec<Option<ScalarType>>),
    /// Any number of arguments, all of one type.
    Uniform(ScalarType),
    /// Arguments are passed through untouched (the coercion functions).
    Unchecked,
}

#[derive(Debug)]
struct Signature {
    ret: ScalarType,
    params: Params,
}

impl Signature {
    fn of(decl: &Decl) -> Option<Self> {
        let f = decl.func_decl()?;
        let params = f
            .params
            .iter()
            .map(|p| (!p.is_array()).then(|| p.scalar_type()))
            .collect();
        Some(Self {
            ret: decl.scalar_type(),
            params: Params::Fixed(params),
        })
    }

    fn param(&self, i: usize) -> Option<ScalarType> {
        match &self.params {
            Params::Fixed(types) => types.get(i).copied().flatten(),
            Params::Uniform(ty) => Some(*ty),
            Params::Unchecked => None,
        }
    }
}

/// Element type of a variable; arrays are typed by their elements.
#[derive(Debug, Clone, Copy)]
struct Var {
    ty: ScalarType,
}

impl Var {
    fn of(decl: &Decl) -> Self {
        Self {
            ty: decl.scalar_type(),
        }
    }
}

/// Unit-wide names: globals, declared functions, and builtins.
#[derive(Debug)]
struct Env {
    globals: HashMap<String, Var>,
    functions: HashMap<String, Signature>,
}

impl Env {
    fn new(file: &FileAst) -> Self {
        use ScalarType::*;

        let mut functions = HashMap::new();
        for ty in [Int, Float, Bool] {
            functions.insert(
                ty.c_name().to_string(),
                Signature {
                    ret: ty,
                    params: Params::Unchecked,
                },
            );
        }
        for name in generic_math_names() {
            functions.insert(
                name.to_string(),
                Signature {
                    ret: Float,
                    params: Params::Uniform(Float),
                },
            );
        }
        functions.insert(
            IMOD.to_string(),
            Signature {
                ret: Int,
                params: Params::Fixed(vec![Some(Int), Some(Int)]),
            },
        );
        functions.insert(
            "is_odd".to_string(),
            Signature {
                ret: Bool,
                params: Params::Fixed(vec![Some(Int)]),
            },
        );

        let mut globals = HashMap::new();
        for ext in &file.ext {
            let decl = match ext {
                ExternalDecl::Decl(d) => d,
                ExternalDecl::FuncDef(f) => &f.decl,
            };
            let Some(name) = decl.name.clone() else {
                continue;
            };
            match Signature::of(decl) {
                Some(sig) => {
                    functions.insert(name, sig);
                }
                None => {
                    globals.insert(name, Var::of(decl));
                }
            }
        }
        Self { globals, functions }
    }
}

/// Common type of two operands of a comparison or ternary.
fn unify(a: ScalarType, b: ScalarType) -> ScalarType {
    match (a, b) {
        _ if a == b => a,
        (ScalarType::Float, _) | (_, ScalarType::Float) => ScalarType::Float,
        _ => ScalarType::Int,
    }
}

/// Common type of two arithmetic operands; bools count as ints.
fn arithmetic(a: ScalarType, b: ScalarType) -> ScalarType {
    match unify(a, b) {
        ScalarType::Bool => ScalarType::Int,
        ty => ty,
    }
}

/// `3` -> `3.0`, `-3` -> `-3.0`.
fn float_literal(e: &Expr) -> Option<Expr> {
    match &e.kind {
        ExprKind::Constant(c) if c.kind == ConstKind::Int => {
            let v = parse_int_literal(&c.value)?;
            Some(Expr::float(format!("{v}.0")).at(e.coord.clone()))
        }
        ExprKind::Unary {
            op: UnaryOp::Neg,
            operand,
        } => Some(Expr::unary(UnaryOp::Neg, float_literal(operand)?).at(e.coord.clone())),
        _ => None,
    }
}

/// Rewrite to apply once the children of an expression are typed.
enum Post {
    Keep,
    WrapInt,
    Imod,
    Expand(BinaryOp),
}

struct Typer<'a> {
    env: &'a Env,
    scopes: Vec<HashMap<String, Var>>,
    ret: ScalarType,
    /// Set while typing the direct argument of an `int(..)` call.
    under_int: bool,
    rewritten: usize,
}

impl<'a> Typer<'a> {
    fn new(env: &'a Env, ret: ScalarType, params: &[Decl]) -> Self {
        let scope = params
            .iter()
            .filter_map(|p| Some((p.name.clone()?, Var::of(p))))
            .collect();
        Self {
            env,
            scopes: vec![scope],
            ret,
            under_int: false,
            rewritten: 0,
        }
    }

    fn lookup(&self, name: &str) -> Option<Var> {
        self.scopes
            .iter()
            .rev()
            .find_map(|s| s.get(name))
            .or_else(|| self.env.globals.get(name))
            .copied()
    }

    fn coerce(&mut self, e: &mut Expr, from: ScalarType, to: ScalarType) {
        if from == to || from == ScalarType::Void || to == ScalarType::Void {
            return;
        }
        if to == ScalarType::Float {
            if let Some(lit) = float_literal(e) {
                *e = lit;
                self.rewritten += 1;
                return;
            }
        }
        let inner = std::mem::replace(e, Expr::int(0));
        let coord = inner.coord.clone();
        *e = Expr::call(to.c_name(), vec![inner]).at(coord);
        self.rewritten += 1;
    }

    fn condition(&mut self, e: &mut Expr) {
        let ty = self.expr(e);
        self.coerce(e, ty, ScalarType::Bool);
    }

    fn compound(&mut self, compound: &mut Compound) {
        self.scopes.push(HashMap::new());
        for stmt in &mut compound.items {
            self.stmt(stmt);
        }
        self.scopes.pop();
    }

    fn decl(&mut self, decl: &mut Decl) {
        let ty = decl.scalar_type();
        let array = decl.is_array();
        match decl.init.as_mut() {
            Some(Expr {
                kind: ExprKind::InitList(items),
                ..
            }) => {
                for item in items {
                    let t = self.expr(item);
                    self.coerce(item, t, ty);
                }
            }
            Some(init) if !array => {
                let t = self.expr(init);
                self.coerce(init, t, ty);
            }
            Some(init) => {
                self.expr(init);
            }
            None => {}
        }
        if let (Some(name), Some(scope)) = (decl.name.clone(), self.scopes.last_mut()) {
            scope.insert(name, Var { ty });
        }
    }

    fn stmt(&mut self, stmt: &mut Stmt) {
        match &mut stmt.kind {
            StmtKind::Decl(d) => self.decl(d),
            StmtKind::Compound(c) => self.compound(c),
            StmtKind::Expr(e) => {
                self.expr(e);
            }
            StmtKind::If {
                cond,
                then,
                otherwise,
            } => {
                self.condition(cond);
                self.stmt(then);
                if let Some(o) = otherwise {
                    self.stmt(o);
                }
            }
            StmtKind::For {
                init,
                cond,
                next,
                body,
            } => {
                self.scopes.push(HashMap::new());
                match init {
                    Some(ForInit::Decls(decls)) => {
                        for d in decls {
                            self.decl(d);
                        }
                    }
                    Some(ForInit::Expr(e)) => {
                        self.expr(e);
                    }
                    None => {}
                }
                if let Some(c) = cond {
                    self.condition(c);
                }
                if let Some(n) = next {
                    self.expr(n);
                }
                self.stmt(body);
                self.scopes.pop();
            }
            StmtKind::While { cond, body } | StmtKind::DoWhile { cond, body } => {
                self.condition(cond);
                self.stmt(body);
            }
            StmtKind::Return(Some(e)) => {
                let ty = self.expr(e);
                let ret = self.ret;
                self.coerce(e, ty, ret);
            }
            StmtKind::Label { stmt, .. } => self.stmt(stmt),
            StmtKind::Return(None)
            | StmtKind::Break
            | StmtKind::Continue
            | StmtKind::Goto(_)
            | StmtKind::Empty => {}
        }
    }

    /// Type `e`, inserting coercions below it. Returns the type of `e`
    /// as rewritten.
    fn expr(&mut self, e: &mut Expr) -> ScalarType {
        use ScalarType::*;

        let under_int = std::mem::take(&mut self.under_int);
        let mut post = Post::Keep;
        let ty = match &mut e.kind {
            ExprKind::Id(name) => self.lookup(name).map_or(Float, |v| v.ty),
            ExprKind::Constant(c) => match c.kind {
                ConstKind::Int | ConstKind::Char => Int,
                ConstKind::Float | ConstKind::Str => Float,
            },
            ExprKind::Binary { op, left, right } => {
                let op = *op;
                let lt = self.expr(left);
                let rt = self.expr(right);
                if op.is_logical() {
                    self.coerce(left, lt, Bool);
                    self.coerce(right, rt, Bool);
                    Bool
                } else if op.is_bitwise() {
                    self.coerce(left, lt, Int);
                    self.coerce(right, rt, Int);
                    Int
                } else if op.is_comparison() {
                    let common = unify(lt, rt);
                    self.coerce(left, lt, common);
                    self.coerce(right, rt, common);
                    Bool
                } else {
                    let common = arithmetic(lt, rt);
                    self.coerce(left, lt, common);
                    self.coerce(right, rt, common);
                    match (op, common) {
                        (BinaryOp::Div, Int) if !under_int => post = Post::WrapInt,
                        (BinaryOp::Mod, Int) => post = Post::Imod,
                        _ => {}
                    }
                    common
                }
            }
            ExprKind::Unary { op, operand } => {
                let op = *op;
                let t = self.expr(operand);
                match op {
                    UnaryOp::Not => {
                        self.coerce(operand, t, Bool);
                        Bool
                    }
                    UnaryOp::BitNot => {
                        self.coerce(operand, t, Int);
                        Int
                    }
                    UnaryOp::Neg | UnaryOp::Plus if t == Bool => {
                        self.coerce(operand, t, Int);
                        Int
                    }
                    _ => t,
                }
            }
            ExprKind::Assign { op, target, value } => {
                let op = *op;
                let tt = self.expr(target);
                let vt = self.expr(value);
                match op.binary() {
                    Some(bin)
                        if tt == Int
                            && (vt == Float || matches!(bin, BinaryOp::Div | BinaryOp::Mod))
                            && !has_side_effects(target) =>
                    {
                        post = Post::Expand(bin);
                    }
                    _ => self.coerce(value, vt, tt),
                }
                tt
            }
            ExprKind::Ternary {
                cond,
                then,
                otherwise,
            } => {
                self.condition(cond);
                let a = self.expr(then);
                let b = self.expr(otherwise);
                let common = unify(a, b);
                self.coerce(then, a, common);
                self.coerce(otherwise, b, common);
                common
            }
            ExprKind::Call { name, args } => {
                let env = self.env;
                let sig = env.functions.get(name.as_str());
                for (i, arg) in args.iter_mut().enumerate() {
                    self.under_int = i == 0 && name.as_str() == "int";
                    let t = self.expr(arg);
                    if let Some(param) = sig.and_then(|s| s.param(i)) {
                        self.coerce(arg, t, param);
                    }
                }
                sig.map_or(Float, |s| s.ret)
            }
            ExprKind::Cast { to, expr } => {
                self.expr(expr);
                *to
            }
            ExprKind::Index { array, index } => {
                let elem = self.expr(array);
                let t = self.expr(index);
                self.coerce(index, t, Int);
                elem
            }
            ExprKind::InitList(items) => {
                for item in items {
                    self.expr(item);
                }
                Float
            }
            ExprKind::Comma(items) => {
                let mut last = Void;
                for item in items {
                    last = self.expr(item);
                }
                last
            }
        };

        match post {
            Post::Keep => ty,
            Post::WrapInt => {
                let inner = std::mem::replace(e, Expr::int(0));
                let coord = inner.coord.clone();
                *e = Expr::call(Int.c_name(), vec![inner]).at(coord);
                self.rewritten += 1;
                Int
            }
            Post::Imod => {
                let taken = std::mem::replace(e, Expr::int(0));
                *e = match taken.kind {
                    ExprKind::Binary { left, right, .. } => {
                        self.rewritten += 1;
                        Expr::call(IMOD, vec![*left, *right]).at(taken.coord)
                    }
                    kind => Expr {
                        kind,
                        coord: taken.coord,
                    },
                };
                Int
            }
            Post::Expand(bin) => {
                // `t op= v` on an int becomes `t = int(t op v)`.
                let taken = std::mem::replace(e, Expr::int(0));
                *e = match taken.kind {
                    ExprKind::Assign { target, value, .. } => {
                        let mut combined = Expr::binary(bin, (*target).clone(), *value);
                        let ct = self.expr(&mut combined);
                        self.coerce(&mut combined, ct, Int);
                        self.rewritten += 1;
                        Expr::assign(AssignOp::Assign, *target, combined).at(taken.coord)
                    }
                    kind => Expr {
                        kind,
                        coord: taken.coord,
                    },
                };
                ty
            }
        }
    }
}
