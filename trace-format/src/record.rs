//! Record layout and codec
//!
//! One record is one traced instruction, laid out exactly as the external
//! tracer writes it (little-endian, no padding):
//!
//! | offset | size | field                          |
//! |--------|------|--------------------------------|
//! | 0      | 8    | instruction pointer            |
//! | 8      | 1    | branch flag                    |
//! | 9      | 1    | branch taken flag              |
//! | 10     | 2    | destination register ids       |
//! | 12     | 4    | source register ids            |
//! | 16     | 16   | destination memory addresses   |
//! | 32     | 32   | source memory addresses        |

use serde::Serialize;
use std::fmt;
use std::num::NonZeroU64;

/// Number of destination register / memory slots per record
pub const NUM_INSTR_DESTINATIONS: usize = 2;

/// Number of source register / memory slots per record
pub const NUM_INSTR_SOURCES: usize = 4;

/// Size of one record on disk. Fixed by the tracer's ABI.
pub const RECORD_SIZE: usize = 64;

const IP_OFFSET: usize = 0;
const IS_BRANCH_OFFSET: usize = 8;
const BRANCH_TAKEN_OFFSET: usize = 9;
const DST_REGS_OFFSET: usize = 10;
const SRC_REGS_OFFSET: usize = DST_REGS_OFFSET + NUM_INSTR_DESTINATIONS;
const DST_MEM_OFFSET: usize = 16;
const SRC_MEM_OFFSET: usize = DST_MEM_OFFSET + 8 * NUM_INSTR_DESTINATIONS;

const _: () = assert!(SRC_REGS_OFFSET + NUM_INSTR_SOURCES == DST_MEM_OFFSET);
const _: () = assert!(SRC_MEM_OFFSET + 8 * NUM_INSTR_SOURCES == RECORD_SIZE);

/// A record exactly as stored in the trace file.
///
/// Editing tools copy these verbatim, so every field survives a splice
/// bit-for-bit whether or not this crate knows how to interpret it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct RawRecord(pub [u8; RECORD_SIZE]);

impl RawRecord {
    /// A record of all zero bytes
    pub const ZERO: Self = Self([0; RECORD_SIZE]);

    pub fn from_bytes(bytes: [u8; RECORD_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; RECORD_SIZE] {
        &self.0
    }

    /// Instruction pointer, read without decoding the whole record
    pub fn ip(&self) -> u64 {
        read_u64(&self.0, IP_OFFSET)
    }

    /// Decode into the structured view
    pub fn decode(&self) -> Record {
        let b = &self.0;

        let mut destination_registers = [0u8; NUM_INSTR_DESTINATIONS];
        destination_registers
            .copy_from_slice(&b[DST_REGS_OFFSET..DST_REGS_OFFSET + NUM_INSTR_DESTINATIONS]);
        let mut source_registers = [0u8; NUM_INSTR_SOURCES];
        source_registers.copy_from_slice(&b[SRC_REGS_OFFSET..SRC_REGS_OFFSET + NUM_INSTR_SOURCES]);

        let destination_memory: [Option<NonZeroU64>; NUM_INSTR_DESTINATIONS] =
            std::array::from_fn(|i| NonZeroU64::new(read_u64(b, DST_MEM_OFFSET + 8 * i)));
        let source_memory: [Option<NonZeroU64>; NUM_INSTR_SOURCES] =
            std::array::from_fn(|i| NonZeroU64::new(read_u64(b, SRC_MEM_OFFSET + 8 * i)));

        Record {
            ip: read_u64(b, IP_OFFSET),
            is_branch: b[IS_BRANCH_OFFSET],
            branch_taken: b[BRANCH_TAKEN_OFFSET],
            destination_registers,
            source_registers,
            destination_memory,
            source_memory,
        }
    }

    /// Lowercase hex rendering of the raw bytes
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl Default for RawRecord {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Debug for RawRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawRecord({})", self.to_hex())
    }
}

impl From<Record> for RawRecord {
    fn from(record: Record) -> Self {
        record.encode()
    }
}

/// Decoded instruction record.
///
/// Memory slots holding zero on disk are unused and decode to `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Record {
    /// Instruction pointer
    pub ip: u64,
    /// Non-zero if the instruction is a branch
    pub is_branch: u8,
    /// Non-zero if the branch was taken
    pub branch_taken: u8,
    pub destination_registers: [u8; NUM_INSTR_DESTINATIONS],
    pub source_registers: [u8; NUM_INSTR_SOURCES],
    /// Store addresses
    pub destination_memory: [Option<NonZeroU64>; NUM_INSTR_DESTINATIONS],
    /// Load addresses
    pub source_memory: [Option<NonZeroU64>; NUM_INSTR_SOURCES],
}

impl Record {
    /// A record with the given instruction pointer and no operands
    pub fn with_ip(ip: u64) -> Self {
        Self { ip, ..Self::default() }
    }

    /// Encode into the on-disk layout. Absent slots are written as zero.
    pub fn encode(&self) -> RawRecord {
        let mut b = [0u8; RECORD_SIZE];
        b[IP_OFFSET..IP_OFFSET + 8].copy_from_slice(&self.ip.to_le_bytes());
        b[IS_BRANCH_OFFSET] = self.is_branch;
        b[BRANCH_TAKEN_OFFSET] = self.branch_taken;
        b[DST_REGS_OFFSET..DST_REGS_OFFSET + NUM_INSTR_DESTINATIONS]
            .copy_from_slice(&self.destination_registers);
        b[SRC_REGS_OFFSET..SRC_REGS_OFFSET + NUM_INSTR_SOURCES]
            .copy_from_slice(&self.source_registers);
        for (i, slot) in self.destination_memory.iter().enumerate() {
            write_u64(&mut b, DST_MEM_OFFSET + 8 * i, slot.map_or(0, NonZeroU64::get));
        }
        for (i, slot) in self.source_memory.iter().enumerate() {
            write_u64(&mut b, SRC_MEM_OFFSET + 8 * i, slot.map_or(0, NonZeroU64::get));
        }
        RawRecord(b)
    }

    /// Present load addresses, in slot order
    pub fn loads(&self) -> impl Iterator<Item = u64> + '_ {
        self.source_memory.iter().flatten().map(|a| a.get())
    }

    /// Present store addresses, in slot order
    pub fn stores(&self) -> impl Iterator<Item = u64> + '_ {
        self.destination_memory.iter().flatten().map(|a| a.get())
    }

    /// Every memory operand of this record: loads first, then stores,
    /// each in slot order. Absent slots are skipped.
    pub fn memory_accesses(&self) -> impl Iterator<Item = MemoryAccess> + '_ {
        let loads = self.source_memory.iter().enumerate().filter_map(|(slot, addr)| {
            addr.map(|a| MemoryAccess { kind: AccessKind::Load, slot, addr: a.get() })
        });
        let stores = self.destination_memory.iter().enumerate().filter_map(|(slot, addr)| {
            addr.map(|a| MemoryAccess { kind: AccessKind::Store, slot, addr: a.get() })
        });
        loads.chain(stores)
    }
}

/// Whether a memory operand was read or written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessKind {
    Load,
    Store,
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load => f.write_str("load"),
            Self::Store => f.write_str("store"),
        }
    }
}

/// One occupied memory slot of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryAccess {
    pub kind: AccessKind,
    /// Slot position within the source or destination list
    pub slot: usize,
    pub addr: u64,
}

fn read_u64(b: &[u8; RECORD_SIZE], offset: usize) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&b[offset..offset + 8]);
    u64::from_le_bytes(word)
}

fn write_u64(b: &mut [u8; RECORD_SIZE], offset: usize, value: u64) {
    b[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(a: u64) -> Option<NonZeroU64> {
        NonZeroU64::new(a)
    }

    #[test]
    fn test_field_offsets() {
        let record = Record {
            ip: 0x0102_0304_0506_0708,
            is_branch: 1,
            branch_taken: 1,
            destination_registers: [0x11, 0x12],
            source_registers: [0x21, 0x22, 0x23, 0x24],
            destination_memory: [addr(0xaa), None],
            source_memory: [None, addr(0xbb), None, None],
        };
        let raw = record.encode();
        let b = raw.as_bytes();

        assert_eq!(&b[0..8], &0x0102_0304_0506_0708u64.to_le_bytes());
        assert_eq!(b[8], 1);
        assert_eq!(b[9], 1);
        assert_eq!(&b[10..12], &[0x11, 0x12]);
        assert_eq!(&b[12..16], &[0x21, 0x22, 0x23, 0x24]);
        assert_eq!(&b[16..24], &0xaau64.to_le_bytes());
        assert_eq!(&b[24..32], &[0; 8]);
        assert_eq!(&b[32..40], &[0; 8]);
        assert_eq!(&b[40..48], &0xbbu64.to_le_bytes());
        assert_eq!(raw.ip(), 0x0102_0304_0506_0708);
    }

    #[test]
    fn test_zero_slots_decode_as_absent() {
        let mut bytes = [0u8; RECORD_SIZE];
        bytes[32..40].copy_from_slice(&0x1000u64.to_le_bytes());
        let record = RawRecord::from_bytes(bytes).decode();

        assert_eq!(record.source_memory, [addr(0x1000), None, None, None]);
        assert_eq!(record.destination_memory, [None, None]);
        assert_eq!(record.loads().collect::<Vec<_>>(), vec![0x1000]);
        assert_eq!(record.stores().count(), 0);
    }

    #[test]
    fn test_decode_preserves_unknown_bits() {
        let bytes: [u8; RECORD_SIZE] = std::array::from_fn(|i| (i as u8).wrapping_mul(37) | 1);
        let raw = RawRecord::from_bytes(bytes);
        assert_eq!(raw.decode().encode(), raw);
    }

    #[test]
    fn test_memory_accesses_order() {
        let record = Record {
            ip: 0x400000,
            destination_memory: [addr(0x30), addr(0x40)],
            source_memory: [addr(0x10), None, addr(0x20), None],
            ..Record::default()
        };
        let accesses: Vec<_> = record.memory_accesses().collect();

        assert_eq!(
            accesses,
            vec![
                MemoryAccess { kind: AccessKind::Load, slot: 0, addr: 0x10 },
                MemoryAccess { kind: AccessKind::Load, slot: 2, addr: 0x20 },
                MemoryAccess { kind: AccessKind::Store, slot: 0, addr: 0x30 },
                MemoryAccess { kind: AccessKind::Store, slot: 1, addr: 0x40 },
            ]
        );
    }

    #[test]
    fn test_raw_record_hex() {
        let raw = Record::with_ip(0xff).encode();
        let hex = raw.to_hex();
        assert_eq!(hex.len(), RECORD_SIZE * 2);
        assert!(hex.starts_with("ff00000000000000"));
    }

    #[test]
    fn test_record_serializes_absent_slots_as_null() {
        let record = Record {
            ip: 7,
            source_memory: [addr(0x10), None, None, None],
            ..Record::default()
        };
        let value = serde_json::to_value(record).unwrap();
        assert_eq!(value["ip"], 7);
        assert_eq!(value["source_memory"][0], 0x10);
        assert!(value["source_memory"][1].is_null());
    }
}
