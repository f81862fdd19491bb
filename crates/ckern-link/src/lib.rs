//! Linker for ckern kernels.
//!
//! Holds every known [`Kernel`](ckern_kernel::Kernel) in three name-keyed
//! tables and turns an entry point into one self-contained unit of target
//! source: the transitive closure of its dependencies is found by
//! [`Linker::resolve`], then declarations, prototypes, and bodies are
//! concatenated by [`Linker::export`].

pub mod error;
pub mod linker;
pub mod resolution;

pub use error::{LinkError, Result};
pub use linker::Linker;
pub use resolution::Resolution;
