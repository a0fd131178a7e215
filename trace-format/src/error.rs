//! Error taxonomy for trace files

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong while reading, validating or writing a trace.
///
/// Messages carry the offending values so that a failing stage of an
/// experiment pipeline can be diagnosed from its log alone.
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("cannot open trace file {}: {source}", .path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("cannot create output file {}: {source}", .path.display())]
    Create { path: PathBuf, source: io::Error },

    #[error("io error while {context}: {source}")]
    Io { context: String, source: io::Error },

    #[error(
        "file size of {} ({byte_len} bytes) is not a multiple of the record size ({record_size} bytes, {trailing} trailing bytes)",
        .path.display()
    )]
    Format { path: PathBuf, byte_len: u64, record_size: u64, trailing: u64 },

    #[error("{0}")]
    InvalidRange(String),

    #[error("{0}")]
    InvalidParameter(String),

    #[error("cannot allocate memory for {records} records ({bytes} bytes)")]
    Allocation { records: u64, bytes: u64 },

    #[error("write failed at output index {index}: {source}")]
    Write { index: u64, source: io::Error },

    #[error("expected to read {expected} records, got {got}")]
    ShortRead { expected: u64, got: u64 },
}

impl TraceError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io { context: context.into(), source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_reports_sizes() {
        let err = TraceError::Format {
            path: PathBuf::from("/tmp/t.bin"),
            byte_len: 130,
            record_size: 64,
            trailing: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("130 bytes"), "{msg}");
        assert!(msg.contains("64 bytes"), "{msg}");
        assert!(msg.contains("2 trailing bytes"), "{msg}");
    }

    #[test]
    fn test_write_error_reports_index() {
        let err = TraceError::Write {
            index: 42,
            source: io::Error::new(io::ErrorKind::Other, "disk full"),
        };
        assert_eq!(err.to_string(), "write failed at output index 42: disk full");
    }
}
