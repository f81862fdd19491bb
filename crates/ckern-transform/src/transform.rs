//! Transform trait and registry.

use std::fmt;
use std::ops::AddAssign;

use ckern_ast::FileAst;

use crate::context::TransformContext;
use crate::error::Result;

/// Statistics from applying one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformStats {
    /// Nodes rewritten in place.
    pub rewritten: usize,
    /// Nodes or declarations inserted.
    pub inserted: usize,
    /// Nodes or declarations removed.
    pub removed: usize,
}

impl TransformStats {
    /// Whether the pass left the tree untouched.
    pub fn is_noop(&self) -> bool {
        self.rewritten == 0 && self.inserted == 0 && self.removed == 0
    }
}

impl AddAssign for TransformStats {
    fn add_assign(&mut self, rhs: Self) {
        self.rewritten += rhs.rewritten;
        self.inserted += rhs.inserted;
        self.removed += rhs.removed;
    }
}

/// A whole-unit AST normalization pass.
///
/// Object-safe so passes can be stored in `Box<dyn AstTransform>`.
/// A pass either succeeds on the whole unit or fails it; it must be a
/// no-op when run on its own output.
pub trait AstTransform: fmt::Debug + Send + Sync {
    /// Stable kebab-case name used in reports and logs.
    fn name(&self) -> &str;

    /// Apply the pass in place.
    fn apply(&self, file: &mut FileAst, ctx: &mut TransformContext) -> Result<TransformStats>;
}

/// Ordered list of passes.
#[derive(Debug, Default)]
pub struct TransformRegistry {
    transforms: Vec<Box<dyn AstTransform>>,
}

impl TransformRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pass; passes run in registration order.
    pub fn register(&mut self, transform: Box<dyn AstTransform>) {
        self.transforms.push(transform);
    }

    pub fn transforms(&self) -> &[Box<dyn AstTransform>] {
        &self.transforms
    }

    /// Names of the registered passes, in order.
    pub fn names(&self) -> Vec<&str> {
        self.transforms.iter().map(|t| t.name()).collect()
    }

    /// Apply every pass in order, stopping at the first failure.
    pub fn apply_all(
        &self,
        file: &mut FileAst,
        ctx: &mut TransformContext,
    ) -> Result<Vec<(String, TransformStats)>> {
        let mut out = Vec::with_capacity(self.transforms.len());
        for t in &self.transforms {
            let stats = t.apply(file, ctx)?;
            tracing::debug!(
                pass = t.name(),
                rewritten = stats.rewritten,
                inserted = stats.inserted,
                removed = stats.removed,
                "pass applied"
            );
            out.push((t.name().to_string(), stats));
        }
        Ok(out)
    }
}
