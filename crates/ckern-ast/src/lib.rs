//! Typed C syntax tree for the ckern kernel compiler.
//!
//! The tree is built from the JSON dump of an external C parser
//! (pycparser's `_nodetype`/`coord` wire format) and validated on the way
//! in: every node either lands in a fully typed shape or construction fails
//! with the offending tag and source coordinate.
//!
//! ## Modules
//!
//! - [`node`]: node definitions, operators, and small constructors
//! - [`types`]: scalar element types shared by the whole toolchain
//! - [`parse`]: validating construction from untyped JSON
//! - [`visit`]: `Visit`/`VisitMut` traversal and in-place rewriting
//! - [`display`]: C source printer for normalized trees

pub mod display;
pub mod error;
pub mod node;
pub mod parse;
pub mod types;
pub mod visit;

pub use error::{AstError, Result};
pub use node::{
    AssignOp, BinaryOp, Compound, ConstKind, Constant, Coord, Decl, Expr, ExprKind,
    ExternalDecl, FileAst, ForInit, FuncDecl, FuncDef, Stmt, StmtKind, Storage, TypeDecl,
    TypeNode, UnaryOp,
};
pub use parse::{parse_file, parse_file_str};
pub use types::ScalarType;
pub use visit::{Visit, VisitMut};
