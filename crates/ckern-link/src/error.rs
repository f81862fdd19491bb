//! Linker error types.

/// Errors raised while resolving or exporting an entry point.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// The requested entry point is not a registered function.
    #[error("entry point '{name}' is not a registered function")]
    UnknownEntryPoint { name: String },

    #[error("function '{name}' required by '{required_by}' is not registered")]
    MissingFunction { name: String, required_by: String },

    #[error("constant '{name}' required by '{required_by}' is not registered")]
    MissingConstant { name: String, required_by: String },

    #[error("variable '{name}' required by '{required_by}' is not registered")]
    MissingVariable { name: String, required_by: String },

    /// The entry point has no code for the requested target.
    #[error("function '{name}' has no {target} code")]
    MissingTargetCode { name: String, target: String },
}

/// Result type alias for linker operations.
pub type Result<T> = std::result::Result<T, LinkError>;
