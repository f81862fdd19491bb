//! Kernel records and target code for the ckern kernel compiler.
//!
//! A normalized unit is split into [`Kernel`] records by [`extract()`]:
//! constants and variables carry their folded values, functions carry
//! GLSL and JavaScript bodies produced by the [`emit`] module plus the
//! names they depend on. [`builtins::table`] supplies the primitives every
//! unit relies on, and [`KernelBundle`] is the on-disk form handed to the
//! linker.

pub mod builtins;
pub mod bundle;
pub mod emit;
pub mod error;
pub mod extract;
pub mod kernel;
pub mod target;

pub use bundle::KernelBundle;
pub use error::{KernelError, Result};
pub use extract::{extract, ExtractConfig, KernelBatch};
pub use kernel::{
    ConstantKernel, Dependencies, FunctionCode, FunctionKernel, Kernel, KernelArg, KernelKind,
    KernelValue, ValueKernel, VariableKernel,
};
pub use target::{GlslVersion, Target, TargetFamily};
