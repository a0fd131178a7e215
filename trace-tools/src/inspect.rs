//! Sequential record dump

use serde::Serialize;
use std::io::{Read, Seek, Write};
use trace_format::{RawRecord, Record, TraceReader, RECORD_SIZE};

use crate::cli::InspectArgs;
use crate::Result;

/// How each record is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpFormat {
    /// `idx=.. ip=.. src_mem=[..] dst_mem=[..]`
    Text,
    /// Text line followed by the raw bytes in hex
    TextWithRaw,
    /// One JSON object per line
    Json,
}

/// Why a dump stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpStop {
    EndOfFile,
    Limit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpSummary {
    pub start: u64,
    pub records_read: u64,
    pub stop: DumpStop,
}

#[derive(Serialize)]
struct JsonLine<'a> {
    idx: u64,
    #[serde(flatten)]
    record: &'a Record,
}

fn hex_list(addrs: impl Iterator<Item = u64>) -> String {
    let items: Vec<String> = addrs.map(|a| format!("0x{a:x}")).collect();
    format!("[{}]", items.join(","))
}

/// Text rendering of one record. Unused memory slots are omitted.
pub fn format_line(idx: u64, record: &Record) -> String {
    format!(
        "idx={} ip=0x{:x} src_mem={} dst_mem={}",
        idx,
        record.ip,
        hex_list(record.loads()),
        hex_list(record.stores())
    )
}

fn write_record(out: &mut impl Write, idx: u64, raw: &RawRecord, format: DumpFormat) -> Result<()> {
    let record = raw.decode();
    match format {
        DumpFormat::Text => writeln!(out, "{}", format_line(idx, &record))?,
        DumpFormat::TextWithRaw => {
            writeln!(out, "{} raw={}", format_line(idx, &record), raw.to_hex())?
        }
        DumpFormat::Json => {
            serde_json::to_writer(&mut *out, &JsonLine { idx, record: &record })?;
            writeln!(out)?;
        }
    }
    Ok(())
}

/// Print up to `max` records starting at `start`.
///
/// A `start` at or past the end prints nothing.
pub fn dump_records<R: Read + Seek>(
    reader: &mut TraceReader<R>,
    start: u64,
    max: u64,
    format: DumpFormat,
    out: &mut impl Write,
) -> Result<DumpSummary> {
    let total = reader.total_records();
    let start = start.min(total);
    reader.seek_to(start)?;

    let mut records_read = 0;
    while records_read < max {
        let Some(raw) = reader.read_one()? else { break };
        write_record(out, start + records_read, &raw, format)?;
        records_read += 1;
    }
    out.flush()?;

    let stop = if reader.position() >= total { DumpStop::EndOfFile } else { DumpStop::Limit };
    Ok(DumpSummary { start, records_read, stop })
}

/// Entry point of `trace_inspect`
pub fn run(args: &InspectArgs, out: &mut impl Write) -> Result<()> {
    let mut reader = TraceReader::open(&args.trace)?;
    tracing::info!("Trace file: {}", reader.path().display());
    tracing::info!("Record size: {} bytes", RECORD_SIZE);
    tracing::info!(
        "Total records: {}, displaying up to {} from index {}",
        reader.total_records(),
        args.max,
        args.start
    );

    let format = if args.json {
        DumpFormat::Json
    } else if args.raw {
        DumpFormat::TextWithRaw
    } else {
        DumpFormat::Text
    };
    let summary = dump_records(&mut reader, args.start, args.max, format, out)?;

    tracing::info!("Read {} records", summary.records_read);
    match summary.stop {
        DumpStop::EndOfFile => tracing::info!("Reached end of file"),
        DumpStop::Limit => tracing::info!("Stopped at --max limit"),
    }
    Ok(())
}
