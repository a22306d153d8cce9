//! Flat 16-bit cell memory shared by code and data.
//!
//! Both the program and its working data live in the same address space;
//! `WMEM` may overwrite code cells and the engine has no instruction cache,
//! so self-modifying programs are observed exactly as they execute.

use serde::{Deserialize, Serialize};

/// Number of addressable cells (2^15).
pub const MEMORY_SIZE: usize = 32_768;

/// Flat 16-bit cell memory, exactly [`MEMORY_SIZE`] cells wide.
///
/// Cells may briefly hold raw values outside `0..32768` right after
/// loading a binary; nothing in the engine ever reads such a cell as an
/// operand without first decoding it, so the out-of-range bits are only
/// ever visible via a raw `RMEM`/peek.
#[derive(Clone)]
pub struct Memory {
    cells: Box<[u16]>,
}

impl Memory {
    /// A zero-filled memory image.
    pub fn zeroed() -> Self {
        Self {
            cells: vec![0u16; MEMORY_SIZE].into_boxed_slice(),
        }
    }

    pub fn read(&self, address: u16) -> u16 {
        self.cells[address as usize]
    }

    pub fn write(&mut self, address: u16, value: u16) {
        self.cells[address as usize] = value;
    }
}

// Hand-written rather than derived: `Box<[u16]>` of a fixed, known length
// serializes more naturally as a plain sequence than the default impl a
// derive would pick, and this mirrors the save-state module this crate's
// snapshot support is grounded on.
impl Serialize for Memory {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.cells.iter())
    }
}

impl<'de> Deserialize<'de> for Memory {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let cells: Vec<u16> = Vec::deserialize(deserializer)?;
        if cells.len() != MEMORY_SIZE {
            return Err(serde::de::Error::invalid_length(
                cells.len(),
                &"32768 sixteen-bit cells",
            ));
        }
        Ok(Self {
            cells: cells.into_boxed_slice(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeroed_memory_reads_back_zero() {
        let mem = Memory::zeroed();
        assert_eq!(mem.read(0), 0);
        assert_eq!(mem.read(32_767), 0);
    }

    #[test]
    fn write_then_read_round_trips() {
        let mut mem = Memory::zeroed();
        mem.write(100, 0xBEEF);
        assert_eq!(mem.read(100), 0xBEEF);
    }

    #[test]
    fn serde_round_trip_preserves_cells() {
        let mut mem = Memory::zeroed();
        mem.write(5, 42);
        mem.write(32_767, 7);
        let json = serde_json::to_string(&mem).unwrap();
        let restored: Memory = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.read(5), 42);
        assert_eq!(restored.read(32_767), 7);
    }
}
