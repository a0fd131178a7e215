//! Insert a copy of a record range before an index
//!
//! All original records are kept and the trace grows by the length of the
//! copied range. The source range is buffered before the output is created,
//! so inserting inside the source range itself is well defined.

use anyhow::Context;
use serde::Serialize;
use std::io::{Read, Seek, Write};
use std::path::Path;
use trace_format::{RawRecord, TraceError, TraceReader, TraceWriter};

use crate::cli::InsertArgs;
use crate::{next_record, write_json, Result};

/// Copy `[src_begin, src_end)` and insert it before `insert_at`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InsertRange {
    pub src_begin: u64,
    pub src_end: u64,
    pub insert_at: u64,
}

impl InsertRange {
    /// Validate against a trace of `total_records` records
    pub fn plan(&self, total_records: u64) -> trace_format::Result<InsertPlan> {
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
        if self.insert_at > total_records {
            return Err(TraceError::InvalidRange(format!(
                "insert_at ({}) exceeds total records ({})",
                self.insert_at, total_records
            )));
        }

        let len = self.src_end - self.src_begin;
        Ok(InsertPlan {
            total_records,
            src_begin: self.src_begin,
            src_end: self.src_end,
            insert_at: self.insert_at,
            len,
            output_records: total_records + len,
        })
    }
}

/// A validated insertion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InsertPlan {
    pub total_records: u64,
    pub src_begin: u64,
    pub src_end: u64,
    pub insert_at: u64,
    /// Number of inserted records
    pub len: u64,
    pub output_records: u64,
}

/// A contiguous run of output indices and where its records come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MappedSegment {
    pub output_begin: u64,
    pub output_end: u64,
    pub input_begin: u64,
    pub input_end: u64,
    /// True for the inserted copy, false for original records
    pub inserted: bool,
}

impl InsertPlan {
    /// The insertion point lies inside the range being copied
    pub fn insert_within_source(&self) -> bool {
        self.src_begin <= self.insert_at && self.insert_at < self.src_end
    }

    /// Output layout: original prefix, inserted copy, shifted original suffix
    pub fn mapping(&self) -> [MappedSegment; 3] {
        let copy_end = self.insert_at + self.len;
        [
            MappedSegment {
                output_begin: 0,
                output_end: self.insert_at,
                input_begin: 0,
                input_end: self.insert_at,
                inserted: false,
            },
            MappedSegment {
                output_begin: self.insert_at,
                output_end: copy_end,
                input_begin: self.src_begin,
                input_end: self.src_end,
                inserted: true,
            },
            MappedSegment {
                output_begin: copy_end,
                output_end: self.output_records,
                input_begin: self.insert_at,
                input_end: self.total_records,
                inserted: false,
            },
        ]
    }

    pub fn log(&self) {
        tracing::info!(
            "Source range: [{}, {}) ({} records)",
            self.src_begin,
            self.src_end,
            self.len
        );
        tracing::info!("Insert at: {} (records inserted before this index)", self.insert_at);
        tracing::info!("Output records: {} (input + {})", self.output_records, self.len);

        if self.insert_within_source() {
            tracing::warn!(
                "insert_at ({}) is within source range [{}, {}); the copy is taken before insertion",
                self.insert_at,
                self.src_begin,
                self.src_end
            );
        }
    }

    pub fn log_mapping(&self) {
        tracing::info!("Output index mapping:");
        for segment in self.mapping() {
            let origin = if segment.inserted { "inserted from" } else { "original" };
            tracing::info!(
                "  [{}, {}) -> {} [{}, {})",
                segment.output_begin,
                segment.output_end,
                origin,
                segment.input_begin,
                segment.input_end
            );
        }
    }
}

/// Dry-run document for an insertion
#[derive(Debug, Serialize)]
pub struct InsertReport<'a, T: Serialize> {
    pub operation: &'a T,
    pub plan: &'a InsertPlan,
    pub mapping: [MappedSegment; 3],
}

/// Copy every input record to `writer`, emitting `source` before record `insert_at`.
///
/// `insert_at == total_records` appends `source` after the last record.
pub fn splice_insert<R: Read + Seek, W: Write>(
    reader: &mut TraceReader<R>,
    source: &[RawRecord],
    insert_at: u64,
    writer: &mut TraceWriter<W>,
) -> trace_format::Result<()> {
    let total = reader.total_records();
    reader.seek_to(0)?;

    for idx in 0..total {
        if idx == insert_at {
            writer.write_records(source)?;
        }
        let record = next_record(reader)?;
        writer.write_record(&record)?;
    }
    if insert_at == total {
        writer.write_records(source)?;
    }
    Ok(())
}

/// Finish a dry run: print the mapping, and the JSON report when asked for
pub(crate) fn report_dry_run<T: Serialize>(
    operation: &T,
    plan: &InsertPlan,
    json: bool,
    out: &mut impl Write,
) -> Result<()> {
    tracing::info!("Dry run: validation passed. No output written.");
    plan.log_mapping();
    if json {
        write_json(out, &InsertReport { operation, plan, mapping: plan.mapping() })?;
    }
    Ok(())
}

/// Buffer the source range, create `output` and perform the insertion
pub(crate) fn write_insertion<R: Read + Seek>(
    reader: &mut TraceReader<R>,
    plan: &InsertPlan,
    output: &Path,
) -> Result<()> {
    tracing::info!("Loading source records into memory...");
    let source = reader
        .read_range(plan.src_begin, plan.src_end)
        .context("failed to buffer source range")?;

    let mut writer = TraceWriter::create(output)?;
    tracing::info!("Writing output to: {}", writer.path().display());

    splice_insert(reader, &source, plan.insert_at, &mut writer)
        .with_context(|| format!("partial output left at {}", output.display()))?;
    let written = writer.records_written();
    writer.finish()?;

    tracing::info!("Read {} input records", plan.total_records);
    tracing::info!("Wrote {} output records", written);
    tracing::info!("Inserted {} records at position {}", plan.len, plan.insert_at);
    Ok(())
}

/// Entry point of `trace_insert_range`
pub fn run(args: &InsertArgs, out: &mut impl Write) -> Result<()> {
    let operation = args.operation();
    let mut reader = TraceReader::open(&args.io.input)?;
    crate::log_input(&reader);

    let plan = operation.plan(reader.total_records())?;
    plan.log();

    if args.io.dry_run {
        return report_dry_run(&operation, &plan, args.io.json, out);
    }
    write_insertion(&mut reader, &plan, args.io.output_path()?)
}
