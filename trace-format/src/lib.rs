//! Trace Format - Fixed-length instruction trace records
//!
//! This crate owns the binary contract shared by every trace editing tool:
//! the 64-byte instruction record emitted by the external CPU tracer, and
//! record-indexed access to files made of those records.
//!
//! # Overview
//!
//! * [`RawRecord`] holds one record exactly as it appears on disk. Editing
//!   tools move raw records around so that every byte is preserved.
//! * [`Record`] is the decoded view, with unused memory slots modelled as
//!   `None` instead of the on-disk zero.
//! * [`TraceReader`] validates the file size against [`RECORD_SIZE`] and
//!   offers sequential reads, bounds-checked seeks and resumable positions.
//! * [`TraceWriter`] appends records to a new output trace and reports the
//!   output index reached when a write fails.
//!
//! # Usage
//!
//! ```no_run
//! use trace_format::TraceReader;
//!
//! let mut reader = TraceReader::open("trace.bin").unwrap();
//! println!("{} records", reader.total_records());
//! while let Some(raw) = reader.read_one().unwrap() {
//!     let record = raw.decode();
//!     println!("ip=0x{:x}", record.ip);
//! }
//! ```

pub mod error;
pub mod reader;
pub mod record;
pub mod writer;

pub use error::TraceError;
pub use reader::{allocate_records, SavedPosition, TraceReader};
pub use record::{
    AccessKind, MemoryAccess, RawRecord, Record, NUM_INSTR_DESTINATIONS, NUM_INSTR_SOURCES,
    RECORD_SIZE,
};
pub use writer::TraceWriter;

/// Result type for trace format operations
pub type Result<T> = std::result::Result<T, TraceError>;
