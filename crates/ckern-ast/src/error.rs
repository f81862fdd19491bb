//! AST construction errors.

/// Render an optional coordinate for error messages.
fn at(coord: &Option<String>) -> String {
    match coord {
        Some(c) => format!("at {c}"),
        None => "at <unknown>".to_string(),
    }
}

/// Errors raised while building a typed tree from untyped input.
///
/// Structural errors are fatal: there is no partial construction.
#[derive(Debug, thiserror::Error)]
pub enum AstError {
    /// The `_nodetype` tag is not part of the supported wire format.
    #[error("unknown node type '{tag}' {}", at(.coord))]
    UnknownNodeType { tag: String, coord: Option<String> },

    /// A known node appeared where a different kind was expected.
    #[error("expected {expected}, found '{found}' {}", at(.coord))]
    UnexpectedNode {
        expected: String,
        found: String,
        coord: Option<String>,
    },

    /// A required field is absent or null.
    #[error("{node} is missing field '{field}' {}", at(.coord))]
    MissingField {
        node: String,
        field: String,
        coord: Option<String>,
    },

    /// A field is present but has the wrong shape.
    #[error("{node}.{field}: {detail} {}", at(.coord))]
    InvalidField {
        node: String,
        field: String,
        detail: String,
        coord: Option<String>,
    },

    /// A construct outside the supported C subset.
    #[error("unsupported {node}: {detail} {}", at(.coord))]
    Unsupported {
        node: String,
        detail: String,
        coord: Option<String>,
    },

    /// The input text is not JSON at all.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for AST operations.
pub type Result<T> = std::result::Result<T, AstError>;
