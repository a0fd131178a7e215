//! Ratio-driven insertion of region B into region A
//!
//! Instead of raw indices the caller names two index ranges and two ratios:
//! where inside A to insert (`a_pos`) and how much of B to copy (`b_ratio`).
//! The derived insertion is then carried out exactly like `trace_insert_range`.

use serde::Serialize;
use std::io::Write;
use trace_format::{TraceError, TraceReader};

use crate::cli::ParametricArgs;
use crate::insert::{report_dry_run, write_insertion, InsertPlan, InsertRange};
use crate::Result;

/// Check `a_pos ∈ [0, 1]` and `b_ratio ∈ (0, 1]`
pub(crate) fn validate_ratios(a_pos: f64, b_ratio: f64) -> trace_format::Result<()> {
    if !(0.0..=1.0).contains(&a_pos) {
        return Err(TraceError::InvalidParameter(format!(
            "a_pos ({a_pos:.4}) must be in range [0.0, 1.0]"
        )));
    }
    if !(b_ratio > 0.0 && b_ratio <= 1.0) {
        return Err(TraceError::InvalidParameter(format!(
            "b_ratio ({b_ratio:.4}) must be in range (0.0, 1.0]"
        )));
    }
    Ok(())
}

/// `floor(len * ratio)` for a ratio in `[0, 1]`
pub(crate) fn scaled(len: u64, ratio: f64) -> u64 {
    ((len as f64 * ratio).floor() as u64).min(len)
}

/// Number of B records to copy. Never less than one.
pub(crate) fn insert_len(b_len: u64, b_ratio: f64) -> u64 {
    scaled(b_len, b_ratio).max(1)
}

/// One insertion described by position ratios over regions A and B
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParametricInsert {
    pub a_begin: u64,
    pub a_end: u64,
    pub b_begin: u64,
    pub b_end: u64,
    pub a_pos: f64,
    pub b_ratio: f64,
}

impl ParametricInsert {
    /// Translate the ratios into a raw insertion.
    ///
    /// Overlapping A and B regions are rejected.
    pub fn derive(&self) -> trace_format::Result<InsertRange> {
        if self.a_begin >= self.a_end {
            return Err(TraceError::InvalidRange(format!(
                "a_begin ({}) must be less than a_end ({})",
                self.a_begin, self.a_end
            )));
        }
        if self.b_begin >= self.b_end {
            return Err(TraceError::InvalidRange(format!(
                "b_begin ({}) must be less than b_end ({})",
                self.b_begin, self.b_end
            )));
        }
        validate_ratios(self.a_pos, self.b_ratio)?;
        if self.a_begin < self.b_end && self.b_begin < self.a_end {
            return Err(TraceError::InvalidRange(format!(
                "A range [{}, {}) and B range [{}, {}) overlap",
                self.a_begin, self.a_end, self.b_begin, self.b_end
            )));
        }

        let insert_at = self.a_begin + scaled(self.a_end - self.a_begin, self.a_pos);
        let b_insert_len = insert_len(self.b_end - self.b_begin, self.b_ratio);
        Ok(InsertRange {
            src_begin: self.b_begin,
            src_end: self.b_begin + b_insert_len,
            insert_at,
        })
    }

    /// Derive and validate against a trace of `total_records` records
    pub fn plan(&self, total_records: u64) -> trace_format::Result<ParametricPlan> {
        let insert = self.derive()?;
        if self.a_end > total_records {
            return Err(TraceError::InvalidRange(format!(
                "a_end ({}) exceeds total records ({})",
                self.a_end, total_records
            )));
        }
        if self.b_end > total_records {
            return Err(TraceError::InvalidRange(format!(
                "b_end ({}) exceeds total records ({})",
                self.b_end, total_records
            )));
        }

        Ok(ParametricPlan { operation: *self, insert: insert.plan(total_records)? })
    }
}

/// A validated parametric insertion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParametricPlan {
    pub operation: ParametricInsert,
    pub insert: InsertPlan,
}

impl ParametricPlan {
    pub fn a_len(&self) -> u64 {
        self.operation.a_end - self.operation.a_begin
    }

    pub fn b_len(&self) -> u64 {
        self.operation.b_end - self.operation.b_begin
    }

    /// Insertion point lies outside `[a_begin, a_end]`
    pub fn outside_a(&self) -> bool {
        let op = &self.operation;
        self.insert.insert_at < op.a_begin || self.insert.insert_at > op.a_end
    }

    /// B does not start where A ends
    pub fn b_detached(&self) -> bool {
        self.operation.b_begin != self.operation.a_end
    }

    pub fn log(&self) {
        let op = &self.operation;
        let insert = &self.insert;
        tracing::info!("A range: [{}, {}) ({} records)", op.a_begin, op.a_end, self.a_len());
        tracing::info!("B range: [{}, {}) ({} records)", op.b_begin, op.b_end, self.b_len());
        tracing::info!("Parameters: a_pos = {:.4}, b_ratio = {:.4}", op.a_pos, op.b_ratio);
        tracing::info!(
            "insert_at = {} (A[{}] + {:.0}% of A length)",
            insert.insert_at,
            op.a_begin,
            op.a_pos * 100.0
        );
        tracing::info!(
            "B insert: [{}, {}) ({} records, {:.0}% of B)",
            insert.src_begin,
            insert.src_end,
            insert.len,
            op.b_ratio * 100.0
        );
        tracing::info!(
            "Output records: {} + {} = {}",
            insert.total_records,
            insert.len,
            insert.output_records
        );

        if self.outside_a() {
            tracing::warn!(
                "insert_at ({}) is outside A range [{}, {}]",
                insert.insert_at,
                op.a_begin,
                op.a_end
            );
        }
        if self.b_detached() {
            tracing::warn!(
                "B range [{}, {}) does not immediately follow A range [{}, {})",
                op.b_begin,
                op.b_end,
                op.a_begin,
                op.a_end
            );
        }
    }
}

/// Entry point of `trace_insert_b_at_a`
pub fn run(args: &ParametricArgs, out: &mut impl Write) -> Result<()> {
    let operation = args.operation();
    let mut reader = TraceReader::open(&args.io.input)?;
    crate::log_input(&reader);

    let plan = operation.plan(reader.total_records())?;
    plan.log();

    if args.io.dry_run {
        return report_dry_run(&operation, &plan.insert, args.io.json, out);
    }
    write_insertion(&mut reader, &plan.insert, args.io.output_path()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insert::splice_insert;
    use crate::test_util::{ips, numbered_trace};
    use trace_format::TraceWriter;

    fn op(a: (u64, u64), b: (u64, u64), a_pos: f64, b_ratio: f64) -> ParametricInsert {
        ParametricInsert {
            a_begin: a.0,
            a_end: a.1,
            b_begin: b.0,
            b_end: b.1,
            a_pos,
            b_ratio,
        }
    }

    #[test]
    fn test_derive_midpoint_full_b() {
        let insert = op((0, 6), (6, 9), 0.5, 1.0).derive().unwrap();
        assert_eq!(insert, InsertRange { src_begin: 6, src_end: 9, insert_at: 3 });
    }

    #[test]
    fn test_derive_floors() {
        // 7 * 0.5 = 3.5 and 5 * 0.5 = 2.5
        let insert = op((10, 17), (17, 22), 0.5, 0.5).derive().unwrap();
        assert_eq!(insert, InsertRange { src_begin: 17, src_end: 19, insert_at: 13 });
    }

    #[test]
    fn test_derive_minimum_one_record() {
        let insert = op((0, 4), (4, 6), 0.0, 0.1).derive().unwrap();
        assert_eq!(insert.src_end - insert.src_begin, 1);
        assert_eq!(insert.insert_at, 0);
    }

    #[test]
    fn test_a_pos_one_inserts_at_a_end() {
        let plan = op((0, 6), (6, 9), 1.0, 1.0).plan(9).unwrap();
        assert_eq!(plan.insert.insert_at, 6);
        assert!(!plan.outside_a());
    }

    #[test]
    fn test_ratio_validation() {
        let err = op((0, 6), (6, 9), 1.5, 1.0).derive().unwrap_err();
        assert_eq!(err.to_string(), "a_pos (1.5000) must be in range [0.0, 1.0]");

        let err = op((0, 6), (6, 9), 0.5, 0.0).derive().unwrap_err();
        assert_eq!(err.to_string(), "b_ratio (0.0000) must be in range (0.0, 1.0]");

        assert!(op((0, 6), (6, 9), f64::NAN, 1.0).derive().is_err());
    }

    #[test]
    fn test_rejects_overlapping_regions() {
        let err = op((0, 6), (4, 9), 0.5, 1.0).derive().unwrap_err();
        assert_eq!(err.to_string(), "A range [0, 6) and B range [4, 9) overlap");
    }

    #[test]
    fn test_detached_b_is_allowed() {
        let plan = op((0, 4), (6, 9), 0.5, 1.0).plan(10).unwrap();
        assert!(plan.b_detached());
        assert_eq!(plan.insert.insert_at, 2);
    }

    #[test]
    fn test_plan_checks_region_bounds() {
        let err = op((0, 6), (6, 12), 0.5, 0.5).plan(10).unwrap_err();
        assert_eq!(err.to_string(), "b_end (12) exceeds total records (10)");

        let err = op((6, 12), (0, 6), 0.5, 0.5).plan(10).unwrap_err();
        assert_eq!(err.to_string(), "a_end (12) exceeds total records (10)");
    }

    #[test]
    fn test_matches_raw_insert() {
        let plan = op((0, 6), (6, 9), 0.5, 1.0).plan(10).unwrap();
        let mut reader = numbered_trace(10);
        let source = reader.read_range(plan.insert.src_begin, plan.insert.src_end).unwrap();
        let mut writer = TraceWriter::new(Vec::new(), "mem");
        splice_insert(&mut reader, &source, plan.insert.insert_at, &mut writer).unwrap();

        assert_eq!(
            ips(&writer.finish().unwrap()),
            vec![100, 101, 102, 106, 107, 108, 103, 104, 105, 106, 107, 108, 109]
        );
    }
}
