//! Normalization passes for the ckern kernel compiler.
//!
//! A C translation unit goes through a fixed sequence of tree rewrites,
//! each establishing one normal form that the code generators rely on:
//! no casts, no `while`, no `goto`, no unbounded recursion, no implicit
//! numeric conversions, and no unsized array parameters.
//!
//! ```text
//! FileAst -> normalize-types -> mtherr -> builtin-math -> static-storage
//!         -> cast-to-call -> abs/is-odd idioms -> goto -> loops
//!         -> recursion -> static-arrays -> explicit-types -> FileAst
//! ```
//!
//! [`transform`] runs a [`PipelineConfig`] over one unit and returns the
//! rewritten tree together with a [`TransformReport`].

pub mod context;
pub mod error;
pub mod passes;
pub mod pipeline;
pub mod report;
pub mod transform;

pub use context::{NamePool, TransformContext};
pub use error::{Result, TransformError};
pub use pipeline::{transform, PipelineConfig, TransformOutput};
pub use report::TransformReport;
pub use transform::{AstTransform, TransformRegistry, TransformStats};
