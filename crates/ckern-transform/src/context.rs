//! Per-unit transform state: the loop counter name pool and the unit's base name.

use crate::error::{Result, TransformError};

/// Number of loop counter names available to one compilation unit.
pub const DEFAULT_POOL_CAPACITY: usize = 6;

/// Prefix of synthetic loop counter names (`_li0`, `_li1`, ...).
pub const LOOP_COUNTER_PREFIX: &str = "_li";

/// Deterministic generator of synthetic identifiers.
///
/// Names are issued in order from a fixed, finite pool. Running out is a
/// hard error rather than a silent wrap-around, since reusing a counter
/// name in nested loops would alias the two counters.
#[derive(Debug, Clone)]
pub struct NamePool {
    prefix: String,
    capacity: usize,
    next: usize,
}

impl NamePool {
    pub fn new(prefix: impl Into<String>, capacity: usize) -> Self {
        Self {
            prefix: prefix.into(),
            capacity,
            next: 0,
        }
    }

    /// Issue the next name, or fail if the pool is exhausted.
    pub fn fresh(&mut self) -> Result<String> {
        if self.next >= self.capacity {
            return Err(TransformError::NamePoolExhausted {
                capacity: self.capacity,
            });
        }
        let name = format!("{}{}", self.prefix, self.next);
        self.next += 1;
        Ok(name)
    }

    /// Whether `name` is one this pool issues.
    pub fn owns(&self, name: &str) -> bool {
        name.strip_prefix(self.prefix.as_str())
            .and_then(|n| n.parse::<usize>().ok())
            .is_some_and(|n| n < self.capacity)
    }

    /// Forget all issued names.
    pub fn reset(&mut self) {
        self.next = 0;
    }

    /// Number of names issued since the last reset.
    pub fn issued(&self) -> usize {
        self.next
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for NamePool {
    fn default() -> Self {
        Self::new(LOOP_COUNTER_PREFIX, DEFAULT_POOL_CAPACITY)
    }
}

/// State threaded through every pass of one compilation unit.
#[derive(Debug, Clone)]
pub struct TransformContext {
    /// Identifier-safe base name of the source file (e.g. `gammaf`).
    pub base_name: String,
    /// Loop counter names.
    pub names: NamePool,
}

impl TransformContext {
    pub fn new(base_name: &str, pool_capacity: usize) -> Self {
        Self {
            base_name: sanitize_identifier(base_name),
            names: NamePool::new(LOOP_COUNTER_PREFIX, pool_capacity),
        }
    }
}

/// Turn a file stem into a valid C identifier fragment.
pub fn sanitize_identifier(raw: &str) -> String {
    let mut out: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.chars().next().is_some_and(|c| c.is_ascii_digit()) || out.is_empty() {
        out.insert(0, '_');
    }
    out
}
