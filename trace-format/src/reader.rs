//! Record-indexed access to trace files
//!
//! [`TraceReader`] checks that the file length is a whole number of records
//! before anything is read, then hands out records by index. Bulk editing
//! pauses a sequential scan to fetch a side range and resumes it through
//! [`TraceReader::save_position`] and [`TraceReader::restore_position`].

use crate::record::{RawRecord, RECORD_SIZE};
use crate::{Result, TraceError};
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// A paused read cursor, produced by [`TraceReader::save_position`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedPosition(u64);

impl SavedPosition {
    /// Record index the cursor will resume at
    pub fn index(&self) -> u64 {
        self.0
    }
}

/// Reader over a trace file of fixed-size records
#[derive(Debug)]
pub struct TraceReader<R = BufReader<File>> {
    inner: R,
    path: PathBuf,
    total_records: u64,
    /// Index of the record the next `read_one` returns
    cursor: u64,
}

impl TraceReader<BufReader<File>> {
    /// Open a trace file and validate its size.
    ///
    /// # Returns
    /// * `Err(TraceError::Open)` - if the file cannot be opened
    /// * `Err(TraceError::Format)` - if its size is not a multiple of [`RECORD_SIZE`]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let open_err = |source| TraceError::Open { path: path.to_path_buf(), source };

        let file = File::open(path).map_err(open_err)?;
        let byte_len = file.metadata().map_err(open_err)?.len();

        let reader = Self::with_len(BufReader::new(file), byte_len, path)?;
        tracing::debug!(
            "Opened trace {}: {} records of {} bytes",
            path.display(),
            reader.total_records,
            RECORD_SIZE
        );
        Ok(reader)
    }
}

impl<R: Read + Seek> TraceReader<R> {
    /// Wrap any seekable byte source. The length is taken from the stream itself.
    pub fn from_reader(mut inner: R, path: impl Into<PathBuf>) -> Result<Self> {
        let byte_len = inner
            .seek(SeekFrom::End(0))
            .and_then(|len| inner.seek(SeekFrom::Start(0)).map(|_| len))
            .map_err(|e| TraceError::io("measuring trace length", e))?;
        Self::with_len(inner, byte_len, path)
    }

    fn with_len(inner: R, byte_len: u64, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let record_size = RECORD_SIZE as u64;
        if byte_len % record_size != 0 {
            return Err(TraceError::Format {
                path,
                byte_len,
                record_size,
                trailing: byte_len % record_size,
            });
        }

        Ok(Self {
            inner,
            path,
            total_records: byte_len / record_size,
            cursor: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records in the file
    pub fn total_records(&self) -> u64 {
        self.total_records
    }

    /// Index of the next record `read_one` will return
    pub fn position(&self) -> u64 {
        self.cursor
    }

    /// Move the cursor to record `index`.
    ///
    /// `index == total_records()` is allowed and positions at end of file.
    pub fn seek_to(&mut self, index: u64) -> Result<()> {
        if index > self.total_records {
            return Err(TraceError::InvalidRange(format!(
                "seek to record {} beyond end of trace ({} records)",
                index, self.total_records
            )));
        }
        self.inner
            .seek(SeekFrom::Start(index * RECORD_SIZE as u64))
            .map_err(|e| TraceError::io(format!("seeking to record {index}"), e))?;
        self.cursor = index;
        Ok(())
    }

    /// Read the record under the cursor, or `None` at end of file.
    pub fn read_one(&mut self) -> Result<Option<RawRecord>> {
        if self.cursor >= self.total_records {
            return Ok(None);
        }
        let mut raw = RawRecord::ZERO;
        self.inner.read_exact(&mut raw.0).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => TraceError::ShortRead {
                expected: self.total_records,
                got: self.cursor,
            },
            _ => TraceError::io(format!("reading record {}", self.cursor), e),
        })?;
        self.cursor += 1;
        Ok(Some(raw))
    }

    /// Fill `buf` with the records starting at the cursor.
    pub fn read_into(&mut self, buf: &mut [RawRecord]) -> Result<()> {
        let buf_len = buf.len() as u64;
        let available = self.total_records - self.cursor;
        if buf_len > available {
            return Err(TraceError::ShortRead { expected: buf_len, got: available });
        }
        for (read, slot) in buf.iter_mut().enumerate() {
            *slot = self.read_one()?.ok_or(TraceError::ShortRead {
                expected: buf_len,
                got: read as u64,
            })?;
        }
        Ok(())
    }

    /// Read records `[begin, end)` into a freshly allocated buffer.
    ///
    /// The cursor is left at `end`.
    pub fn read_range(&mut self, begin: u64, end: u64) -> Result<Vec<RawRecord>> {
        if begin > end || end > self.total_records {
            return Err(TraceError::InvalidRange(format!(
                "range [{}, {}) is not within trace of {} records",
                begin, end, self.total_records
            )));
        }
        let mut buf = allocate_records(end - begin)?;
        self.seek_to(begin)?;
        self.read_into(&mut buf)?;
        Ok(buf)
    }

    /// Remember the cursor so a side read can be undone later
    pub fn save_position(&self) -> SavedPosition {
        SavedPosition(self.cursor)
    }

    /// Return to a cursor produced by [`Self::save_position`]
    pub fn restore_position(&mut self, saved: SavedPosition) -> Result<()> {
        self.seek_to(saved.0)
    }
}

/// Allocate a zeroed buffer of `records` records, reporting failure instead of aborting.
pub fn allocate_records(records: u64) -> Result<Vec<RawRecord>> {
    let bytes = records.saturating_mul(RECORD_SIZE as u64);
    let alloc_err = || TraceError::Allocation { records, bytes };

    let len = usize::try_from(records).map_err(|_| alloc_err())?;
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| alloc_err())?;
    buf.resize(len, RawRecord::ZERO);
    Ok(buf)
}
