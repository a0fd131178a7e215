//! Locate memory accesses that fall inside an address region
//!
//! Hits are emitted in record order. Within a record, load slots come before
//! store slots, each in slot order, so the first and last hit of a run bound
//! the records that touch the region.

use std::fmt;
use std::io::{Read, Seek, Write};
use trace_format::{AccessKind, TraceError, TraceReader};

use crate::cli::ScanArgs;
use crate::{Result, PROGRESS_INTERVAL};

/// Header row of the CSV output
pub const CSV_HEADER: &str = "idx,kind,ip,addr,offset";

/// Byte addresses `[base, base + size)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub base: u64,
    pub size: u64,
}

impl Region {
    pub fn new(base: u64, size: u64) -> Self {
        Self { base, size }
    }

    pub fn validate(&self) -> trace_format::Result<()> {
        if self.size == 0 {
            return Err(TraceError::InvalidParameter(format!(
                "region size must be positive (base 0x{:x}, size 0)",
                self.base
            )));
        }
        Ok(())
    }

    /// Membership test that cannot overflow near the top of the address space
    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.base && addr - self.base < self.size
    }

    /// Offset of `addr` from the base if it lies inside the region
    pub fn offset_of(&self, addr: u64) -> Option<u64> {
        self.contains(addr).then(|| addr - self.base)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let end = u128::from(self.base) + u128::from(self.size);
        write!(f, "[0x{:x}, 0x{:x}) ({} bytes)", self.base, end, self.size)
    }
}

/// One memory access inside the region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanHit {
    pub idx: u64,
    pub kind: AccessKind,
    pub ip: u64,
    pub addr: u64,
    pub offset: u64,
}

impl ScanHit {
    pub fn csv_row(&self) -> String {
        format!(
            "{},{},0x{:x},0x{:x},0x{:x}",
            self.idx, self.kind, self.ip, self.addr, self.offset
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub records_scanned: u64,
    pub hits: u64,
    pub first_hit: Option<u64>,
    pub last_hit: Option<u64>,
}

/// Scan every record and pass each hit to `on_hit`.
///
/// With a nonzero `max_hits` the scan stops right after that many hits.
pub fn scan_region<R, F>(
    reader: &mut TraceReader<R>,
    region: Region,
    max_hits: u64,
    mut on_hit: F,
) -> Result<ScanSummary>
where
    R: Read + Seek,
    F: FnMut(&ScanHit) -> std::io::Result<()>,
{
    region.validate()?;
    reader.seek_to(0)?;
    let mut summary = ScanSummary::default();

    'records: while let Some(raw) = reader.read_one()? {
        let idx = summary.records_scanned;
        summary.records_scanned += 1;
        let record = raw.decode();

        for access in record.memory_accesses() {
            let Some(offset) = region.offset_of(access.addr) else { continue };
            on_hit(&ScanHit { idx, kind: access.kind, ip: record.ip, addr: access.addr, offset })?;

            summary.hits += 1;
            summary.first_hit.get_or_insert(idx);
            summary.last_hit = Some(idx);
            if max_hits > 0 && summary.hits >= max_hits {
                break 'records;
            }
        }

        if summary.records_scanned % PROGRESS_INTERVAL == 0 {
            tracing::info!(
                "Scanned {} M records, {} hits...",
                summary.records_scanned / 1_000_000,
                summary.hits
            );
        }
    }
    Ok(summary)
}

/// Entry point of `find_b_accesses`
pub fn run(args: &ScanArgs, out: &mut impl Write) -> Result<()> {
    let region = args.region();
    region.validate()?;

    let mut reader = TraceReader::open(&args.trace)?;
    tracing::info!("Trace file: {}", reader.path().display());
    tracing::info!("Total records: {}", reader.total_records());
    tracing::info!("Region: {}", region);
    if args.max_hits > 0 {
        tracing::info!("Max hits: {}", args.max_hits);
    }

    writeln!(out, "{CSV_HEADER}")?;
    let summary = scan_region(&mut reader, region, args.max_hits, |hit| {
        writeln!(out, "{}", hit.csv_row())
    })?;
    out.flush()?;

    tracing::info!("Scanned {} records", summary.records_scanned);
    tracing::info!("Found {} accesses", summary.hits);
    if let (Some(first), Some(last)) = (summary.first_hit, summary.last_hit) {
        tracing::info!("First hit at record {}, last hit at record {}", first, last);
    }
    Ok(())
}
