//! Sequential output of trace records

use crate::record::RawRecord;
use crate::{Result, TraceError};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes records back to back into a new trace.
///
/// Failures report the output index reached. A partially written file is
/// left in place.
#[derive(Debug)]
pub struct TraceWriter<W: Write = BufWriter<File>> {
    inner: W,
    path: PathBuf,
    records_written: u64,
}

impl TraceWriter<BufWriter<File>> {
    /// Create (or truncate) the output file
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)
            .map_err(|source| TraceError::Create { path: path.to_path_buf(), source })?;
        tracing::debug!("Created output trace {}", path.display());
        Ok(Self::new(BufWriter::new(file), path))
    }
}

impl<W: Write> TraceWriter<W> {
    pub fn new(inner: W, path: impl Into<PathBuf>) -> Self {
        Self { inner, path: path.into(), records_written: 0 }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records written so far, i.e. the next output index
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    pub fn write_record(&mut self, record: &RawRecord) -> Result<()> {
        self.inner
            .write_all(record.as_bytes())
            .map_err(|source| TraceError::Write { index: self.records_written, source })?;
        self.records_written += 1;
        Ok(())
    }

    pub fn write_records(&mut self, records: &[RawRecord]) -> Result<()> {
        records.iter().try_for_each(|record| self.write_record(record))
    }

    /// Flush buffered output and hand back the underlying writer
    pub fn finish(mut self) -> Result<W> {
        self.inner
            .flush()
            .map_err(|source| TraceError::Write { index: self.records_written, source })?;
        Ok(self.inner)
    }
}
