//! Transform errors.

use ckern_ast::AstError;
use thiserror::Error;

/// Errors that abort the transformation of a compilation unit.
///
/// There is no partial output: a failing pass fails the whole unit.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("loop counter name pool exhausted ({capacity} names per unit)")]
    NamePoolExhausted { capacity: usize },

    #[error("goto targets unknown label '{label}' in function '{function}'")]
    UnknownLabel { label: String, function: String },

    #[error("goto to label '{label}' in function '{function}' forms a cycle")]
    CyclicGoto { label: String, function: String },

    #[error("static variable '{name}' is reassigned in function '{function}'")]
    StaticReassigned { name: String, function: String },

    #[error("{pass}: {detail}")]
    Unsupported { pass: String, detail: String },

    #[error(transparent)]
    Ast(#[from] AstError),
}

/// Result type alias for transform operations.
pub type Result<T> = std::result::Result<T, TransformError>;
