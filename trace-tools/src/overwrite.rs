//! Overwrite a record range with a copy of another range
//!
//! The trace keeps its length. The source range is read into memory before
//! any output is written, so overlapping source and destination ranges give
//! the same result as disjoint ones.

use anyhow::Context;
use serde::Serialize;
use std::io::{Read, Seek, Write};
use trace_format::{RawRecord, TraceError, TraceReader, TraceWriter};

use crate::cli::OverwriteArgs;
use crate::{next_record, write_json, Result};

/// Copy `[src_begin, src_end)` over `[dst_begin, dst_begin + len)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverwriteRange {
    pub src_begin: u64,
    pub src_end: u64,
    pub dst_begin: u64,
}

impl OverwriteRange {
    /// Validate against a trace of `total_records` records
    pub fn plan(&self, total_records: u64) -> trace_format::Result<OverwritePlan> {
        if self.src_begin >= self.src_end {
            return Err(TraceError::InvalidRange(format!(
                "src_begin ({}) must be less than src_end ({})",
                self.src_begin, self.src_end
            )));
        }
        if self.src_end > total_records {
            return Err(TraceError::InvalidRange(format!(
                "src_end ({}) exceeds total records ({})",
                self.src_end, total_records
            )));
        }

        let len = self.src_end - self.src_begin;
        let dst_end = self
            .dst_begin
            .checked_add(len)
            .filter(|&end| end <= total_records)
            .ok_or_else(|| {
                TraceError::InvalidRange(format!(
                    "dst range [{}, {}) exceeds total records ({})",
                    self.dst_begin,
                    self.dst_begin.saturating_add(len),
                    total_records
                ))
            })?;

        Ok(OverwritePlan {
            total_records,
            src_begin: self.src_begin,
            src_end: self.src_end,
            dst_begin: self.dst_begin,
            dst_end,
            len,
        })
    }
}

/// A validated overwrite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OverwritePlan {
    pub total_records: u64,
    pub src_begin: u64,
    pub src_end: u64,
    pub dst_begin: u64,
    pub dst_end: u64,
    pub len: u64,
}

impl OverwritePlan {
    pub fn overlaps(&self) -> bool {
        self.src_begin < self.dst_end && self.src_end > self.dst_begin
    }

    pub fn log(&self) {
        tracing::info!(
            "Source range: [{}, {}) ({} records)",
            self.src_begin,
            self.src_end,
            self.len
        );
        tracing::info!("Destination range: [{}, {})", self.dst_begin, self.dst_end);
        if self.overlaps() {
            tracing::warn!(
                "Source and destination ranges overlap; the source is copied before any record is written"
            );
        }
    }
}

/// Copy every input record to `writer`, replacing the destination range with `source`.
pub fn splice_overwrite<R: Read + Seek, W: Write>(
    reader: &mut TraceReader<R>,
    source: &[RawRecord],
    dst_begin: u64,
    writer: &mut TraceWriter<W>,
) -> trace_format::Result<()> {
    let total = reader.total_records();
    let dst = dst_begin..dst_begin + source.len() as u64;
    reader.seek_to(0)?;

    for idx in 0..total {
        let record = next_record(reader)?;
        if dst.contains(&idx) {
            writer.write_record(&source[(idx - dst.start) as usize])?;
        } else {
            writer.write_record(&record)?;
        }
    }
    Ok(())
}

/// Entry point of `trace_overwrite_range`
pub fn run(args: &OverwriteArgs, out: &mut impl Write) -> Result<()> {
    let operation = args.operation();
    let mut reader = TraceReader::open(&args.io.input)?;
    crate::log_input(&reader);

    let plan = operation.plan(reader.total_records())?;
    plan.log();

    if args.io.dry_run {
        tracing::info!("Dry run: range validation passed. No output written.");
        if args.io.json {
            write_json(out, &plan)?;
        }
        return Ok(());
    }
    let output = args.io.output_path()?;

    tracing::info!("Loading source records into memory...");
    let source = reader
        .read_range(plan.src_begin, plan.src_end)
        .context("failed to buffer source range")?;

    let mut writer = TraceWriter::create(output)?;
    tracing::info!("Writing output to: {}", writer.path().display());

    splice_overwrite(&mut reader, &source, plan.dst_begin, &mut writer)
        .with_context(|| format!("partial output left at {}", output.display()))?;
    let written = writer.records_written();
    writer.finish()?;

    tracing::info!("Wrote {} records", written);
    tracing::info!(
        "Overwritten {} records at [{}, {})",
        plan.len,
        plan.dst_begin,
        plan.dst_end
    );
    Ok(())
}
