//! Trace Tools - Record-level surgery on instruction traces
//!
//! This crate builds the trace editing operations on top of `trace-format`:
//! dumping records, locating accesses to an address region, and splicing one
//! region of a trace into another location.
//!
//! Every editing operation follows the same life cycle. Parameters are turned
//! into a plan that is validated against the input's record count. Dry runs
//! stop there. Otherwise the spliced range is buffered, the output file is
//! created and one sequential pass over the input produces the result.
//!
//! Structured output (record dumps, CSV hits, JSON plans) goes to the writer
//! handed to each `run` function, normally stdout. Diagnostics go through
//! `tracing`, which [`logging::setup_logger`] routes to stderr.

pub mod bulk;
pub mod cli;
pub mod insert;
pub mod inspect;
pub mod logging;
pub mod overwrite;
pub mod parametric;
pub mod scan;

pub use bulk::{BulkInsert, BulkPlan, BulkSplicer, IterationSplice};
pub use insert::{InsertPlan, InsertRange, MappedSegment};
pub use overwrite::{OverwritePlan, OverwriteRange};
pub use parametric::{ParametricInsert, ParametricPlan};
pub use scan::{Region, ScanHit, ScanSummary};

/// Records between two progress lines of a long pass
pub const PROGRESS_INTERVAL: u64 = 50_000_000;

/// Result type for trace tool operations
pub type Result<T> = anyhow::Result<T>;

/// Write `value` as one pretty-printed JSON document followed by a newline
pub fn write_json<T: serde::Serialize>(out: &mut impl std::io::Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Whether two paths name the same existing file
pub(crate) fn same_file(a: &std::path::Path, b: &std::path::Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        match (std::fs::metadata(a), std::fs::metadata(b)) {
            (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
            _ => false,
        }
    }
    #[cfg(not(unix))]
    {
        match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

/// Log the input file facts every editing tool starts with
pub(crate) fn log_input<R: std::io::Read + std::io::Seek>(reader: &trace_format::TraceReader<R>) {
    tracing::info!("Input file: {}", reader.path().display());
    tracing::info!("Total input records: {}", reader.total_records());
    tracing::info!("Record size: {} bytes", trace_format::RECORD_SIZE);
}

/// Read the record under the cursor of a pass that must not hit end of file
pub(crate) fn next_record<R: std::io::Read + std::io::Seek>(
    reader: &mut trace_format::TraceReader<R>,
) -> trace_format::Result<trace_format::RawRecord> {
    let position = reader.position();
    reader.read_one()?.ok_or(trace_format::TraceError::ShortRead {
        expected: reader.total_records(),
        got: position,
    })
}
