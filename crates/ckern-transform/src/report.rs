//! Transform report aggregating per-pass statistics.

use std::fmt;

use crate::transform::TransformStats;

/// Summary of one compilation unit's trip through the pipeline.
#[derive(Debug, Clone)]
pub struct TransformReport {
    /// Base name of the unit.
    pub unit: String,
    /// Total duration in milliseconds.
    pub duration_ms: u64,
    /// Statistics per pass, in pipeline order.
    pub passes: Vec<(String, TransformStats)>,
    /// Loop counter names consumed.
    pub names_issued: usize,
}

impl TransformReport {
    /// Sum over all passes.
    pub fn total(&self) -> TransformStats {
        let mut total = TransformStats::default();
        for (_, stats) in &self.passes {
            total += *stats;
        }
        total
    }

    /// Statistics of the named pass, if it ran.
    pub fn pass(&self, name: &str) -> Option<&TransformStats> {
        self.passes.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }
}

impl fmt::Display for TransformReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Transform Report ===")?;
        writeln!(f, "Unit: {}", self.unit)?;
        writeln!(f, "Duration: {} ms", self.duration_ms)?;
        writeln!(f)?;
        writeln!(f, "--- Passes ({}) ---", self.passes.len())?;
        for (name, stats) in &self.passes {
            if stats.is_noop() {
                writeln!(f, "  {name}: no changes")?;
            } else {
                writeln!(
                    f,
                    "  {name}: {} rewritten, +{} inserted, -{} removed",
                    stats.rewritten, stats.inserted, stats.removed,
                )?;
            }
        }
        writeln!(f)?;
        writeln!(f, "Loop counters issued: {}", self.names_issued)?;
        Ok(())
    }
}
