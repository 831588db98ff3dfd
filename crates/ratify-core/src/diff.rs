//! Reduce a line-level diff into added/removed counts.
//!
//! The diff itself is produced elsewhere; this module only consumes the
//! ordered sequence of per-line operations it yields.

use crate::types::DiffStats;

/// One line of a line-level diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOp {
    /// Line present only in the old text.
    Old,
    /// Line present only in the new text.
    New,
    /// Line unchanged between old and new.
    Same,
}

/// Aggregate a line-operation sequence into diff stats.
pub fn aggregate<I>(ops: I) -> DiffStats
where
    I: IntoIterator<Item = LineOp>,
{
    let mut stats = DiffStats::default();
    for op in ops {
        match op {
            LineOp::New => stats.lines_added += 1,
            LineOp::Old => stats.lines_removed += 1,
            LineOp::Same => {}
        }
    }
    stats
}

/// Aggregate run-length encoded operations (`(op, line_count)` chunks).
pub fn aggregate_chunks<I>(chunks: I) -> DiffStats
where
    I: IntoIterator<Item = (LineOp, usize)>,
{
    let mut stats = DiffStats::default();
    for (op, count) in chunks {
        let count = count as u64;
        match op {
            LineOp::New => stats.lines_added += count,
            LineOp::Old => stats.lines_removed += count,
            LineOp::Same => {}
        }
    }
    stats
}
