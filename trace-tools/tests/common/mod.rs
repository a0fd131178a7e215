#![allow(dead_code)]

use std::path::{Path, PathBuf};
use trace_format::{RawRecord, Record, RECORD_SIZE};

/// Write `n` records with `ip == 100 + index` to `dir/name`
pub fn write_numbered(dir: &Path, name: &str, n: u64) -> PathBuf {
    let records: Vec<RawRecord> = (0..n).map(|i| Record::with_ip(100 + i).encode()).collect();
    write_records(dir, name, &records)
}

pub fn write_records(dir: &Path, name: &str, records: &[RawRecord]) -> PathBuf {
    let path = dir.join(name);
    let bytes: Vec<u8> = records.iter().flat_map(|r| r.0).collect();
    std::fs::write(&path, bytes).unwrap();
    path
}

pub fn read_records(path: &Path) -> Vec<RawRecord> {
    let bytes = std::fs::read(path).unwrap();
    assert_eq!(bytes.len() % RECORD_SIZE, 0, "{} is not record aligned", path.display());
    bytes
        .chunks_exact(RECORD_SIZE)
        .map(|chunk| RawRecord::from_bytes(chunk.try_into().unwrap()))
        .collect()
}

pub fn read_ips(path: &Path) -> Vec<u64> {
    read_records(path).iter().map(RawRecord::ip).collect()
}

pub fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}
