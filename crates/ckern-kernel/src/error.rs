//! Error types for kernel extraction, emission, and bundle files.

use ckern_ast::AstError;

/// Errors that can occur while building or loading kernels.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    /// A global initializer is not a compile-time constant.
    #[error("initializer of '{name}' is not a constant expression")]
    NonConstantInitializer { name: String },

    /// A declaration outside the exportable subset.
    #[error("'{name}' cannot be exported: {detail}")]
    Unsupported { name: String, detail: String },

    /// A construct the target code generator cannot express.
    #[error("cannot emit '{name}': {detail}")]
    Emit { name: String, detail: String },

    /// Unknown target dialect name.
    #[error("unknown target '{name}' (expected glsl100, glsl300, or js)")]
    UnknownTarget { name: String },

    /// Bundle contents do not match the stored hash.
    #[error("kernel bundle hash mismatch: file is corrupted or was edited")]
    BundleHashMismatch,

    #[error("not a kernel bundle (format '{format}')")]
    InvalidBundleFormat { format: String },

    #[error("unsupported kernel bundle version {version}")]
    UnsupportedBundleVersion { version: u32 },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Ast(#[from] AstError),
}

/// Result type for kernel operations.
pub type Result<T> = std::result::Result<T, KernelError>;
