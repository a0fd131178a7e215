//! Parametric insertion repeated over every A/B iteration
//!
//! The trace is assumed to contain `iterations` back-to-back blocks, each an
//! A block of `a_len` records followed by a B block of `b_len` records,
//! starting at `first_a_begin`. The same `a_pos`/`b_ratio` insertion is
//! applied independently to every selected iteration in a single forward
//! pass. At each insertion point the scan is paused, the iteration's B
//! prefix is read into a buffer sized once for the whole run, written out,
//! and the scan resumes where it stopped.

use anyhow::Context;
use serde::Serialize;
use std::io::{Read, Seek, Write};
use trace_format::{allocate_records, RawRecord, TraceError, TraceReader, TraceWriter};

use crate::cli::BulkArgs;
use crate::parametric::{insert_len, scaled, validate_ratios};
use crate::{next_record, write_json, Result, PROGRESS_INTERVAL};

/// Number of iterations listed by a dry run
pub const DRY_RUN_PREVIEW: usize = 5;

/// Insertion applied to each of `iterations` repeated A/B blocks
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BulkInsert {
    pub first_a_begin: u64,
    pub a_len: u64,
    pub b_len: u64,
    pub iterations: u64,
    pub a_pos: f64,
    pub b_ratio: f64,
    /// Apply to iterations whose index is a multiple of this; 0 applies to none
    pub every: u64,
}

impl BulkInsert {
    /// Validate the declared structure against a trace of `total_records` records
    pub fn plan(&self, total_records: u64) -> trace_format::Result<BulkPlan> {
        if self.a_len == 0 || self.b_len == 0 || self.iterations == 0 {
            return Err(TraceError::InvalidParameter(format!(
                "a_len ({}), b_len ({}) and iterations ({}) must all be positive",
                self.a_len, self.b_len, self.iterations
            )));
        }
        validate_ratios(self.a_pos, self.b_ratio)?;

        let structure_end = self
            .a_len
            .checked_add(self.b_len)
            .and_then(|stride| stride.checked_mul(self.iterations))
            .and_then(|len| len.checked_add(self.first_a_begin))
            .filter(|&end| end <= total_records)
            .ok_or_else(|| {
                TraceError::InvalidRange(format!(
                    "structure exceeds trace bounds: first_a_begin ({}) + iterations ({}) x ({} + {}) > total records ({})",
                    self.first_a_begin, self.iterations, self.a_len, self.b_len, total_records
                ))
            })?;

        let b_insert_len = insert_len(self.b_len, self.b_ratio);
        let active_iterations = match self.every {
            0 => 0,
            every => (self.iterations - 1) / every + 1,
        };
        let total_inserted = active_iterations * b_insert_len;

        Ok(BulkPlan {
            operation: *self,
            total_records,
            stride: self.a_len + self.b_len,
            structure_end,
            a_offset: scaled(self.a_len, self.a_pos),
            b_insert_len,
            active_iterations,
            total_inserted,
            output_records: total_records + total_inserted,
        })
    }
}

/// The splice performed for one iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IterationSplice {
    pub iteration: u64,
    pub a_begin: u64,
    /// Input index the copy is inserted before
    pub insert_at: u64,
    pub src_begin: u64,
    pub src_end: u64,
}

/// A validated bulk insertion
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BulkPlan {
    pub operation: BulkInsert,
    pub total_records: u64,
    /// Records per iteration, `a_len + b_len`
    pub stride: u64,
    /// One past the last record of the last iteration
    pub structure_end: u64,
    /// Insertion offset inside each A block
    pub a_offset: u64,
    pub b_insert_len: u64,
    pub active_iterations: u64,
    pub total_inserted: u64,
    pub output_records: u64,
}

impl BulkPlan {
    /// Splice for iteration `i`, whether or not it is active
    pub fn iteration(&self, i: u64) -> IterationSplice {
        let a_begin = self.operation.first_a_begin + i * self.stride;
        let src_begin = a_begin + self.operation.a_len;
        IterationSplice {
            iteration: i,
            a_begin,
            insert_at: a_begin + self.a_offset,
            src_begin,
            src_end: src_begin + self.b_insert_len,
        }
    }

    /// Splices of the selected iterations, in increasing input order
    pub fn active(&self) -> impl Iterator<Item = IterationSplice> + '_ {
        let every = self.operation.every;
        (0..self.active_iterations).map(move |k| self.iteration(k * every))
    }

    pub fn log(&self) {
        let op = &self.operation;
        tracing::info!(
            "Structure: first_a_begin = {}, a_len = {}, b_len = {}, iter_len = {}, iterations = {}",
            op.first_a_begin,
            op.a_len,
            op.b_len,
            self.stride,
            op.iterations
        );
        tracing::info!(
            "Parameters: a_pos = {:.4}, b_ratio = {:.4}, every = {}",
            op.a_pos,
            op.b_ratio,
            op.every
        );
        tracing::info!(
            "Per-iteration insert: {} records at A+{}",
            self.b_insert_len,
            self.a_offset
        );
        tracing::info!(
            "Active iterations: {} (every {}th of {})",
            self.active_iterations,
            op.every,
            op.iterations
        );
        tracing::info!(
            "Total insertions: {} x {} = {} records",
            self.active_iterations,
            self.b_insert_len,
            self.total_inserted
        );
        tracing::info!(
            "Output records: {} + {} = {}",
            self.total_records,
            self.total_inserted,
            self.output_records
        );
    }

    pub fn report(&self) -> BulkReport {
        BulkReport {
            plan: *self,
            first_splices: self.active().take(DRY_RUN_PREVIEW).collect(),
            remaining_splices: self.active_iterations.saturating_sub(DRY_RUN_PREVIEW as u64),
        }
    }
}

/// Dry-run document for a bulk insertion
#[derive(Debug, Clone, Serialize)]
pub struct BulkReport {
    pub plan: BulkPlan,
    pub first_splices: Vec<IterationSplice>,
    pub remaining_splices: u64,
}

impl BulkReport {
    pub fn log(&self) {
        tracing::info!("First {} insertion points (input indices):", self.first_splices.len());
        for splice in &self.first_splices {
            tracing::info!(
                "  iter {}: insert_at={}, B src=[{}, {})",
                splice.iteration,
                splice.insert_at,
                splice.src_begin,
                splice.src_end
            );
        }
        if self.remaining_splices > 0 {
            tracing::info!("  ... ({} more)", self.remaining_splices);
        }
    }
}

/// Counters of a finished bulk pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkSummary {
    pub records_read: u64,
    pub records_written: u64,
    pub insertions: u64,
}

/// Executes a [`BulkPlan`] with one reusable B buffer
pub struct BulkSplicer<'a> {
    plan: &'a BulkPlan,
    buffer: Vec<RawRecord>,
}

impl<'a> BulkSplicer<'a> {
    /// Allocate the per-iteration buffer. Fails before any output exists.
    pub fn new(plan: &'a BulkPlan) -> trace_format::Result<Self> {
        Ok(Self { plan, buffer: allocate_records(plan.b_insert_len)? })
    }

    /// Copy the whole input to `writer`, inserting each active iteration's B prefix.
    pub fn splice<R: Read + Seek, W: Write>(
        &mut self,
        reader: &mut TraceReader<R>,
        writer: &mut TraceWriter<W>,
    ) -> trace_format::Result<BulkSummary> {
        let total = reader.total_records();
        let mut pending = self.plan.active().peekable();
        let mut insertions = 0u64;
        reader.seek_to(0)?;

        for idx in 0..total {
            if let Some(splice) = pending.next_if(|s| s.insert_at == idx) {
                let resume = reader.save_position();
                reader.seek_to(splice.src_begin)?;
                reader.read_into(&mut self.buffer)?;
                writer.write_records(&self.buffer)?;
                reader.restore_position(resume)?;
                insertions += 1;
            }

            let record = next_record(reader)?;
            writer.write_record(&record)?;

            if (idx + 1) % PROGRESS_INTERVAL == 0 {
                tracing::info!(
                    "Processed {} M records, {} insertions...",
                    (idx + 1) / 1_000_000,
                    insertions
                );
            }
        }

        Ok(BulkSummary {
            records_read: total,
            records_written: writer.records_written(),
            insertions,
        })
    }
}

/// Entry point of `trace_insert_all_iters`
pub fn run(args: &BulkArgs, out: &mut impl Write) -> Result<()> {
    let operation = args.operation();
    let mut reader = TraceReader::open(&args.io.input)?;
    crate::log_input(&reader);

    let plan = operation.plan(reader.total_records())?;
    plan.log();

    if args.io.dry_run {
        tracing::info!("Dry run: validation passed. No output written.");
        let report = plan.report();
        report.log();
        if args.io.json {
            write_json(out, &report)?;
        }
        return Ok(());
    }
    let output = args.io.output_path()?;

    let mut splicer =
        BulkSplicer::new(&plan).context("failed to allocate the per-iteration buffer")?;
    let mut writer = TraceWriter::create(output)?;
    tracing::info!("Writing output to: {}", writer.path().display());

    let summary = splicer
        .splice(&mut reader, &mut writer)
        .with_context(|| format!("partial output left at {}", output.display()))?;
    writer.finish()?;

    tracing::info!("Read {} input records", summary.records_read);
    tracing::info!("Wrote {} output records", summary.records_written);
    tracing::info!("Performed {} insertions", summary.insertions);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{ips, numbered_trace};

    fn bulk(first: u64, a_len: u64, b_len: u64, iterations: u64, every: u64) -> BulkInsert {
        BulkInsert {
            first_a_begin: first,
            a_len,
            b_len,
            iterations,
            a_pos: 0.5,
            b_ratio: 1.0,
            every,
        }
    }

    fn apply(total: u64, op: BulkInsert) -> (Vec<u64>, BulkSummary) {
        let plan = op.plan(total).unwrap();
        let mut reader = numbered_trace(total);
        let mut writer = TraceWriter::new(Vec::new(), "mem");
        let summary = BulkSplicer::new(&plan).unwrap().splice(&mut reader, &mut writer).unwrap();
        let out = ips(&writer.finish().unwrap());
        assert_eq!(out.len() as u64, plan.output_records);
        (out, summary)
    }

    #[test]
    fn test_iteration_geometry() {
        let plan = bulk(10, 4, 2, 3, 1).plan(40).unwrap();
        assert_eq!(plan.stride, 6);
        assert_eq!(plan.structure_end, 28);
        assert_eq!(
            plan.iteration(2),
            IterationSplice { iteration: 2, a_begin: 22, insert_at: 24, src_begin: 26, src_end: 28 }
        );
    }

    #[test]
    fn test_every_iteration() {
        // iterations at [1,5) A, [5,7) B and [7,11) A, [11,13) B
        let (out, summary) = apply(14, bulk(1, 4, 2, 2, 1));
        assert_eq!(summary.insertions, 2);
        assert_eq!(
            out,
            vec![
                100, 101, 102, 105, 106, 103, 104, 105, 106, //
                107, 108, 111, 112, 109, 110, 111, 112, 113,
            ]
        );
    }

    #[test]
    fn test_skipped_iterations_pass_through() {
        let (out, summary) = apply(12, bulk(0, 2, 2, 3, 2));
        // Active iterations 0 and 2: insert [2,4) before 1 and [10,12) before 9
        assert_eq!(summary.insertions, 2);
        assert_eq!(
            out,
            vec![100, 102, 103, 101, 102, 103, 104, 105, 106, 107, 108, 110, 111, 109, 110, 111]
        );
    }

    #[test]
    fn test_every_zero_copies_input() {
        let (out, summary) = apply(8, bulk(0, 2, 2, 2, 0));
        assert_eq!(summary.insertions, 0);
        assert_eq!(out, (100..108).collect::<Vec<_>>());
    }

    #[test]
    fn test_active_iteration_count() {
        for (iterations, every, expected) in
            [(10, 1, 10), (10, 3, 4), (9, 3, 3), (1, 8, 1), (4096, 8, 512), (10, 0, 0), (3, 10, 1)]
        {
            let plan = bulk(0, 1, 1, iterations, every).plan(2 * iterations).unwrap();
            assert_eq!(plan.active_iterations, expected, "iterations={iterations} every={every}");
            assert_eq!(plan.active().count() as u64, expected);
            assert_eq!(plan.total_inserted, expected * plan.b_insert_len);
        }
    }

    #[test]
    fn test_active_iterations_are_multiples_of_every() {
        let plan = bulk(0, 3, 3, 10, 4).plan(60).unwrap();
        let iterations: Vec<u64> = plan.active().map(|s| s.iteration).collect();
        assert_eq!(iterations, vec![0, 4, 8]);
    }

    #[test]
    fn test_partial_b_ratio() {
        let op = BulkInsert { b_ratio: 0.5, a_pos: 0.0, ..bulk(0, 2, 4, 2, 1) };
        let (out, _) = apply(12, op);
        assert_eq!(
            out,
            vec![102, 103, 100, 101, 102, 103, 104, 105, 108, 109, 106, 107, 108, 109, 110, 111]
        );
    }

    #[test]
    fn test_structure_must_fit() {
        let err = bulk(5, 4, 2, 3, 1).plan(22).unwrap_err();
        assert!(matches!(err, TraceError::InvalidRange(_)));
        assert!(err.to_string().contains("total records (22)"), "{err}");

        assert!(bulk(5, 4, 2, 3, 1).plan(23).is_ok());
        assert!(bulk(1, u64::MAX, 1, 2, 1).plan(100).is_err());
    }

    #[test]
    fn test_rejects_empty_structure() {
        assert!(matches!(
            bulk(0, 0, 2, 3, 1).plan(100).unwrap_err(),
            TraceError::InvalidParameter(_)
        ));
        assert!(bulk(0, 2, 2, 0, 1).plan(100).is_err());
    }

    #[test]
    fn test_report_preview() {
        let plan = bulk(0, 2, 2, 8, 1).plan(32).unwrap();
        let report = plan.report();
        assert_eq!(report.first_splices.len(), DRY_RUN_PREVIEW);
        assert_eq!(report.remaining_splices, 3);
        assert_eq!(report.first_splices[1].insert_at, 5);
    }
}
