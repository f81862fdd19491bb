//! Node definitions for the typed C tree.
//!
//! Categories are closed enums: top-level items, declarator chains,
//! statements, and expressions. Statements and expressions carry their
//! source coordinate next to the kind, the way a span travels with a
//! node in most compilers. Coordinates are diagnostic only and never
//! consulted by any transform.
//!
//! Ownership is strictly tree-shaped: every child is owned by exactly one
//! parent. Duplicating a subtree is a `clone()`.

use std::fmt;

use crate::types::ScalarType;

/// Optional source coordinate string (e.g. `"gammaf.c:41:5"`).
pub type Coord = Option<String>;

/// A whole translation unit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FileAst {
    /// Top-level items in source order.
    pub ext: Vec<ExternalDecl>,
    pub coord: Coord,
}

impl FileAst {
    pub fn new(ext: Vec<ExternalDecl>) -> Self {
        Self { ext, coord: None }
    }

    pub fn func_defs(&self) -> impl Iterator<Item = &FuncDef> {
        self.ext.iter().filter_map(|e| match e {
            ExternalDecl::FuncDef(f) => Some(f),
            ExternalDecl::Decl(_) => None,
        })
    }

    pub fn func_defs_mut(&mut self) -> impl Iterator<Item = &mut FuncDef> {
        self.ext.iter_mut().filter_map(|e| match e {
            ExternalDecl::FuncDef(f) => Some(f),
            ExternalDecl::Decl(_) => None,
        })
    }

    /// Definition of the function `name`, if the unit defines it.
    pub fn func_def(&self, name: &str) -> Option<&FuncDef> {
        self.func_defs().find(|f| f.name() == name)
    }
}

/// A top-level item.
#[derive(Debug, Clone, PartialEq)]
pub enum ExternalDecl {
    /// Prototype or global declaration.
    Decl(Decl),
    /// Function with a body.
    FuncDef(FuncDef),
}

impl ExternalDecl {
    /// Declared name of the item, if it has one.
    pub fn name(&self) -> Option<&str> {
        match self {
            ExternalDecl::Decl(d) => d.name.as_deref(),
            ExternalDecl::FuncDef(f) => f.decl.name.as_deref(),
        }
    }
}

/// Storage class specifiers that survive validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Storage {
    Static,
    Extern,
    Register,
    Auto,
}

impl Storage {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "static" => Some(Storage::Static),
            "extern" => Some(Storage::Extern),
            "register" => Some(Storage::Register),
            "auto" => Some(Storage::Auto),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Storage::Static => "static",
            Storage::Extern => "extern",
            Storage::Register => "register",
            Storage::Auto => "auto",
        }
    }
}

/// A declaration: variable, parameter, or function prototype.
#[derive(Debug, Clone, PartialEq)]
pub struct Decl {
    /// Declared name (`None` for unnamed parameters).
    pub name: Option<String>,
    /// Qualifiers; only `const` is accepted.
    pub quals: Vec<String>,
    pub storage: Vec<Storage>,
    /// Declarator chain ending in a [`TypeDecl`].
    pub ty: TypeNode,
    pub init: Option<Expr>,
    pub coord: Coord,
}

impl Decl {
    /// A plain scalar variable declaration `ty name = init;`.
    pub fn scalar(name: impl Into<String>, ty: ScalarType, init: Option<Expr>) -> Self {
        let name = name.into();
        Self {
            name: Some(name.clone()),
            quals: Vec::new(),
            storage: Vec::new(),
            ty: TypeNode::TypeDecl(TypeDecl::new(Some(name), ty)),
            init,
            coord: None,
        }
    }

    /// A one-dimensional array declaration `ty name[len] = init;`.
    pub fn array(
        name: impl Into<String>,
        ty: ScalarType,
        len: Option<usize>,
        init: Option<Expr>,
    ) -> Self {
        let name = name.into();
        Self {
            name: Some(name.clone()),
            quals: Vec::new(),
            storage: Vec::new(),
            ty: TypeNode::ArrayDecl(ArrayDecl {
                ty: Box::new(TypeNode::TypeDecl(TypeDecl::new(Some(name), ty))),
                dim: len.map(|n| Box::new(Expr::int(n as i64))),
                coord: None,
            }),
            init,
            coord: None,
        }
    }

    /// A function prototype `ret name(params);`.
    pub fn prototype(name: impl Into<String>, ret: ScalarType, params: Vec<Decl>) -> Self {
        let name = name.into();
        Self {
            name: Some(name.clone()),
            quals: Vec::new(),
            storage: Vec::new(),
            ty: TypeNode::FuncDecl(FuncDecl {
                params,
                ty: Box::new(TypeNode::TypeDecl(TypeDecl::new(Some(name), ret))),
                coord: None,
            }),
            init: None,
            coord: None,
        }
    }

    pub fn is_static(&self) -> bool {
        self.storage.contains(&Storage::Static)
    }

    pub fn is_extern(&self) -> bool {
        self.storage.contains(&Storage::Extern)
    }

    pub fn is_const(&self) -> bool {
        self.quals.iter().any(|q| q == "const")
    }

    /// Whether the declarator chain declares a function.
    pub fn is_function(&self) -> bool {
        matches!(self.ty, TypeNode::FuncDecl(_))
    }

    /// Element type at the end of the declarator chain.
    pub fn scalar_type(&self) -> ScalarType {
        self.ty.element().scalar
    }

    /// Length of a one-dimensional array declaration.
    ///
    /// Taken from the dimension when it is a literal, otherwise from the
    /// initializer list length.
    pub fn array_len(&self) -> Option<usize> {
        let TypeNode::ArrayDecl(arr) = &self.ty else {
            return None;
        };
        if let Some(n) = arr.dim.as_ref().and_then(|d| d.as_int_literal()) {
            return usize::try_from(n).ok();
        }
        match self.init.as_ref().map(|e| &e.kind) {
            Some(ExprKind::InitList(items)) => Some(items.len()),
            _ => None,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self.ty, TypeNode::ArrayDecl(_))
    }

    /// Rename the declaration, keeping the innermost `declname` in sync.
    pub fn rename(&mut self, new_name: impl Into<String>) {
        let new_name = new_name.into();
        self.ty.element_mut().declname = Some(new_name.clone());
        self.name = Some(new_name);
    }

    /// Function declarator, if this declares a function.
    pub fn func_decl(&self) -> Option<&FuncDecl> {
        match &self.ty {
            TypeNode::FuncDecl(f) => Some(f),
            _ => None,
        }
    }

    pub fn func_decl_mut(&mut self) -> Option<&mut FuncDecl> {
        match &mut self.ty {
            TypeNode::FuncDecl(f) => Some(f),
            _ => None,
        }
    }
}

/// A declarator chain node.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeNode {
    TypeDecl(TypeDecl),
    FuncDecl(FuncDecl),
    ArrayDecl(ArrayDecl),
}

impl TypeNode {
    /// The terminal `TypeDecl` of the chain.
    pub fn element(&self) -> &TypeDecl {
        match self {
            TypeNode::TypeDecl(t) => t,
            TypeNode::FuncDecl(f) => f.ty.element(),
            TypeNode::ArrayDecl(a) => a.ty.element(),
        }
    }

    pub fn element_mut(&mut self) -> &mut TypeDecl {
        match self {
            TypeNode::TypeDecl(t) => t,
            TypeNode::FuncDecl(f) => f.ty.element_mut(),
            TypeNode::ArrayDecl(a) => a.ty.element_mut(),
        }
    }
}

/// Terminal declarator naming a scalar element type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub declname: Option<String>,
    pub quals: Vec<String>,
    /// `IdentifierType.names` as written.
    pub names: Vec<String>,
    /// Resolved element type.
    pub scalar: ScalarType,
    pub coord: Coord,
}

impl TypeDecl {
    pub fn new(declname: Option<String>, scalar: ScalarType) -> Self {
        Self {
            declname,
            quals: Vec::new(),
            names: vec![scalar.c_name().to_string()],
            scalar,
            coord: None,
        }
    }
}

/// Function declarator.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    /// Parameters; `f(void)` is normalized to an empty list.
    pub params: Vec<Decl>,
    /// Return type chain.
    pub ty: Box<TypeNode>,
    pub coord: Coord,
}

/// Array declarator.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayDecl {
    pub ty: Box<TypeNode>,
    pub dim: Option<Box<Expr>>,
    pub coord: Coord,
}

/// A function definition.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncDef {
    pub decl: Decl,
    pub body: Compound,
    pub coord: Coord,
}

impl FuncDef {
    pub fn name(&self) -> &str {
        self.decl.name.as_deref().unwrap_or_default()
    }

    pub fn return_type(&self) -> ScalarType {
        self.decl.scalar_type()
    }

    pub fn params(&self) -> &[Decl] {
        self.decl.func_decl().map(|f| f.params.as_slice()).unwrap_or(&[])
    }

    /// Prototype declaration matching this definition.
    pub fn prototype(&self) -> Decl {
        let mut decl = self.decl.clone();
        decl.init = None;
        decl
    }
}

/// A braced statement block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Compound {
    pub items: Vec<Stmt>,
    pub coord: Coord,
}

impl Compound {
    pub fn new(items: Vec<Stmt>) -> Self {
        Self { items, coord: None }
    }
}

/// A statement with its coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub coord: Coord,
}

/// Initializer clause of a `for` loop.
#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    Decls(Vec<Decl>),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Decl(Decl),
    Compound(Compound),
    Expr(Expr),
    If {
        cond: Expr,
        then: Box<Stmt>,
        otherwise: Option<Box<Stmt>>,
    },
    For {
        init: Option<ForInit>,
        cond: Option<Expr>,
        next: Option<Expr>,
        body: Box<Stmt>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        cond: Expr,
        body: Box<Stmt>,
    },
    Return(Option<Expr>),
    Break,
    Continue,
    Goto(String),
    Label {
        name: String,
        stmt: Box<Stmt>,
    },
    Empty,
}

impl Stmt {
    pub fn new(kind: StmtKind) -> Self {
        Self { kind, coord: None }
    }

    pub fn expr(expr: Expr) -> Self {
        Self::new(StmtKind::Expr(expr))
    }

    pub fn decl(decl: Decl) -> Self {
        Self::new(StmtKind::Decl(decl))
    }

    pub fn compound(items: Vec<Stmt>) -> Self {
        Self::new(StmtKind::Compound(Compound::new(items)))
    }

    pub fn ret(expr: Option<Expr>) -> Self {
        Self::new(StmtKind::Return(expr))
    }

    pub fn if_then(cond: Expr, then: Stmt, otherwise: Option<Stmt>) -> Self {
        Self::new(StmtKind::If {
            cond,
            then: Box::new(then),
            otherwise: otherwise.map(Box::new),
        })
    }

    pub fn is_return(&self) -> bool {
        matches!(self.kind, StmtKind::Return(_))
    }

    /// Attach a coordinate.
    pub fn at(mut self, coord: Coord) -> Self {
        self.coord = coord;
        self
    }
}

/// Literal category of a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstKind {
    Int,
    Float,
    Char,
    Str,
}

/// A literal as written in source.
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    pub kind: ConstKind,
    pub value: String,
}

impl Constant {
    /// Numeric value of an int, float, or char literal.
    pub fn as_f64(&self) -> Option<f64> {
        match self.kind {
            ConstKind::Int => parse_int_literal(&self.value).map(|v| v as f64),
            ConstKind::Float => parse_float_literal(&self.value),
            ConstKind::Char => parse_char_literal(&self.value).map(f64::from),
            ConstKind::Str => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self.kind {
            ConstKind::Int => parse_int_literal(&self.value),
            ConstKind::Char => parse_char_literal(&self.value).map(i64::from),
            _ => None,
        }
    }
}

/// Parse a C integer literal (decimal, hex, or octal, with suffixes).
pub fn parse_int_literal(text: &str) -> Option<i64> {
    let trimmed = text.trim_end_matches(['u', 'U', 'l', 'L']);
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        i64::from_str_radix(hex, 16).ok()
    } else if trimmed.len() > 1 && trimmed.starts_with('0') {
        i64::from_str_radix(&trimmed[1..], 8).ok()
    } else {
        trimmed.parse().ok()
    }
}

/// Parse a C floating literal (suffixes `f`, `F`, `l`, `L` allowed).
pub fn parse_float_literal(text: &str) -> Option<f64> {
    let trimmed = text.trim_end_matches(['f', 'F', 'l', 'L']);
    if trimmed.starts_with("0x") || trimmed.starts_with("0X") {
        return None;
    }
    trimmed.parse().ok()
}

fn parse_char_literal(text: &str) -> Option<u32> {
    let inner = text.strip_prefix('\'')?.strip_suffix('\'')?;
    let mut chars = inner.chars();
    match (chars.next()?, chars.next()) {
        ('\\', Some(esc)) => match esc {
            'n' => Some(10),
            't' => Some(9),
            '0' => Some(0),
            '\\' => Some(92),
            '\'' => Some(39),
            _ => None,
        },
        (c, None) => Some(c as u32),
        _ => None,
    }
}

/// An expression with its coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub coord: Coord,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Id(String),
    Constant(Constant),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Ternary {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
    /// `(to) expr`; the target is always a scalar `TypeDecl`.
    Cast {
        to: ScalarType,
        expr: Box<Expr>,
    },
    Index {
        array: Box<Expr>,
        index: Box<Expr>,
    },
    InitList(Vec<Expr>),
    /// Comma expression.
    Comma(Vec<Expr>),
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Self { kind, coord: None }
    }

    pub fn id(name: impl Into<String>) -> Self {
        Self::new(ExprKind::Id(name.into()))
    }

    pub fn int(value: i64) -> Self {
        Self::new(ExprKind::Constant(Constant {
            kind: ConstKind::Int,
            value: value.to_string(),
        }))
    }

    /// Float literal from source text (e.g. `"1.0"`, `"3e-5"`).
    pub fn float(text: impl Into<String>) -> Self {
        Self::new(ExprKind::Constant(Constant {
            kind: ConstKind::Float,
            value: text.into(),
        }))
    }

    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::new(ExprKind::Call {
            name: name.into(),
            args,
        })
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Self::new(ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Self::new(ExprKind::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    pub fn assign(op: AssignOp, target: Expr, value: Expr) -> Self {
        Self::new(ExprKind::Assign {
            op,
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    pub fn ternary(cond: Expr, then: Expr, otherwise: Expr) -> Self {
        Self::new(ExprKind::Ternary {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    pub fn index(array: Expr, index: Expr) -> Self {
        Self::new(ExprKind::Index {
            array: Box::new(array),
            index: Box::new(index),
        })
    }

    pub fn at(mut self, coord: Coord) -> Self {
        self.coord = coord;
        self
    }

    pub fn as_id(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Id(name) => Some(name),
            _ => None,
        }
    }

    /// Callee name and arguments, if this is a call.
    pub fn as_call(&self) -> Option<(&str, &[Expr])> {
        match &self.kind {
            ExprKind::Call { name, args } => Some((name, args)),
            _ => None,
        }
    }

    pub fn as_int_literal(&self) -> Option<i64> {
        match &self.kind {
            ExprKind::Constant(c) => c.as_i64(),
            _ => None,
        }
    }

    /// Binding strength for printing; higher binds tighter.
    pub fn precedence(&self) -> u8 {
        match &self.kind {
            ExprKind::Comma(_) => 1,
            ExprKind::Assign { .. } => 2,
            ExprKind::Ternary { .. } => 3,
            ExprKind::Binary { op, .. } => op.precedence(),
            ExprKind::Unary { op, .. } if op.is_postfix() => 15,
            ExprKind::Unary { .. } | ExprKind::Cast { .. } => 14,
            ExprKind::Call { .. } | ExprKind::Index { .. } => 15,
            ExprKind::Id(_) | ExprKind::Constant(_) | ExprKind::InitList(_) => 16,
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl BinaryOp {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Mod,
            "<" => BinaryOp::Lt,
            "<=" => BinaryOp::Le,
            ">" => BinaryOp::Gt,
            ">=" => BinaryOp::Ge,
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::Ne,
            "&&" => BinaryOp::And,
            "||" => BinaryOp::Or,
            "&" => BinaryOp::BitAnd,
            "|" => BinaryOp::BitOr,
            "^" => BinaryOp::BitXor,
            "<<" => BinaryOp::Shl,
            ">>" => BinaryOp::Shr,
            _ => return None,
        })
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
        }
    }

    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Or => 4,
            BinaryOp::And => 5,
            BinaryOp::BitOr => 6,
            BinaryOp::BitXor => 7,
            BinaryOp::BitAnd => 8,
            BinaryOp::Eq | BinaryOp::Ne => 9,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => 10,
            BinaryOp::Shl | BinaryOp::Shr => 11,
            BinaryOp::Add | BinaryOp::Sub => 12,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 13,
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge | BinaryOp::Eq | BinaryOp::Ne
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    pub fn is_bitwise(&self) -> bool {
        matches!(
            self,
            BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor | BinaryOp::Shl | BinaryOp::Shr
        )
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Unary operators. Postfix forms are spelled `p++`/`p--` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    BitNot,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

impl UnaryOp {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "-" => UnaryOp::Neg,
            "+" => UnaryOp::Plus,
            "!" => UnaryOp::Not,
            "~" => UnaryOp::BitNot,
            "++" => UnaryOp::PreInc,
            "--" => UnaryOp::PreDec,
            "p++" => UnaryOp::PostInc,
            "p--" => UnaryOp::PostDec,
            _ => return None,
        })
    }

    /// Source spelling without the postfix marker.
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
            UnaryOp::PreInc | UnaryOp::PostInc => "++",
            UnaryOp::PreDec | UnaryOp::PostDec => "--",
        }
    }

    pub fn is_postfix(&self) -> bool {
        matches!(self, UnaryOp::PostInc | UnaryOp::PostDec)
    }

    /// Whether the operator writes to its operand.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec
        )
    }
}

/// Assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl AssignOp {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "=" => AssignOp::Assign,
            "+=" => AssignOp::Add,
            "-=" => AssignOp::Sub,
            "*=" => AssignOp::Mul,
            "/=" => AssignOp::Div,
            "%=" => AssignOp::Mod,
            "&=" => AssignOp::BitAnd,
            "|=" => AssignOp::BitOr,
            "^=" => AssignOp::BitXor,
            "<<=" => AssignOp::Shl,
            ">>=" => AssignOp::Shr,
            _ => return None,
        })
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
            AssignOp::Mod => "%=",
            AssignOp::BitAnd => "&=",
            AssignOp::BitOr => "|=",
            AssignOp::BitXor => "^=",
            AssignOp::Shl => "<<=",
            AssignOp::Shr => ">>=",
        }
    }

    /// The binary operator a compound assignment applies.
    pub fn binary(&self) -> Option<BinaryOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::Add => Some(BinaryOp::Add),
            AssignOp::Sub => Some(BinaryOp::Sub),
            AssignOp::Mul => Some(BinaryOp::Mul),
            AssignOp::Div => Some(BinaryOp::Div),
            AssignOp::Mod => Some(BinaryOp::Mod),
            AssignOp::BitAnd => Some(BinaryOp::BitAnd),
            AssignOp::BitOr => Some(BinaryOp::BitOr),
            AssignOp::BitXor => Some(BinaryOp::BitXor),
            AssignOp::Shl => Some(BinaryOp::Shl),
            AssignOp::Shr => Some(BinaryOp::Shr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_literals() {
        assert_eq!(parse_int_literal("42"), Some(42));
        assert_eq!(parse_int_literal("0x1F"), Some(31));
        assert_eq!(parse_int_literal("010"), Some(8));
        assert_eq!(parse_int_literal("7UL"), Some(7));
        assert_eq!(parse_int_literal("0"), Some(0));
    }

    #[test]
    fn float_literals() {
        assert_eq!(parse_float_literal("1.5f"), Some(1.5));
        assert_eq!(parse_float_literal("2e3"), Some(2000.0));
        assert_eq!(parse_float_literal(".25"), Some(0.25));
        assert_eq!(
            parse_float_literal("1.70141183460469231e38L"),
            "1.70141183460469231e38".parse::<f64>().ok()
        );
    }

    #[test]
    fn char_literal_value() {
        let c = Constant {
            kind: ConstKind::Char,
            value: "'A'".into(),
        };
        assert_eq!(c.as_i64(), Some(65));
    }

    #[test]
    fn array_len_from_dim_or_init() {
        let sized = Decl::array("P", ScalarType::Float, Some(8), None);
        assert_eq!(sized.array_len(), Some(8));

        let unsized_decl = Decl::array(
            "Q",
            ScalarType::Float,
            None,
            Some(Expr::new(ExprKind::InitList(vec![
                Expr::float("1.0"),
                Expr::float("2.0"),
                Expr::float("3.0"),
            ]))),
        );
        assert_eq!(unsized_decl.array_len(), Some(3));
        assert_eq!(Decl::scalar("x", ScalarType::Int, None).array_len(), None);
    }

    #[test]
    fn rename_keeps_declname_in_sync() {
        let mut decl = Decl::array("P", ScalarType::Float, Some(4), None);
        decl.rename("gammaf_P");
        assert_eq!(decl.name.as_deref(), Some("gammaf_P"));
        assert_eq!(decl.ty.element().declname.as_deref(), Some("gammaf_P"));
    }

    #[test]
    fn operator_spellings_round_trip() {
        for s in ["+", "<=", "&&", "<<", "%"] {
            assert_eq!(BinaryOp::parse(s).map(|op| op.symbol()), Some(s));
        }
        assert_eq!(UnaryOp::parse("p++"), Some(UnaryOp::PostInc));
        assert_eq!(UnaryOp::parse("&"), None);
        assert_eq!(AssignOp::parse("*=").and_then(|op| op.binary()), Some(BinaryOp::Mul));
    }
}
