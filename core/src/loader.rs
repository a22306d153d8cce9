//! Turns a raw byte stream into loaded [`Memory`] (C1).
//!
//! This module never touches the filesystem; reading the binary off
//! disk is the caller's job; this pure function only has to trust that
//! the bytes it's handed form a stream of 16-bit little-endian words.

use crate::error::LoadError;
use crate::memory::{Memory, MEMORY_SIZE};

/// Loads a program image from a stream of little-endian 16-bit words.
pub fn from_bytes(bytes: &[u8]) -> Result<Memory, LoadError> {
    if bytes.len() % 2 != 0 {
        return Err(LoadError::OddLength(bytes.len()));
    }

    let word_count = bytes.len() / 2;
    if word_count > MEMORY_SIZE {
        return Err(LoadError::TooLarge(word_count));
    }

    let mut memory = Memory::zeroed();
    for (i, chunk) in bytes.chunks_exact(2).enumerate() {
        memory.write(i as u16, u16::from_le_bytes([chunk[0], chunk[1]]));
    }
    Ok(memory)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_words_in_little_endian_order() {
        let memory = from_bytes(&[0x01, 0x00, 0xFF, 0x7F]).unwrap();
        assert_eq!(memory.read(0), 1);
        assert_eq!(memory.read(1), 0x7FFF);
    }

    #[test]
    fn rejects_odd_length_streams() {
        let err = from_bytes(&[0x01]).unwrap_err();
        assert_eq!(err, LoadError::OddLength(1));
    }

    #[test]
    fn rejects_streams_that_overflow_memory() {
        let bytes = vec![0u8; (MEMORY_SIZE + 1) * 2];
        let err = from_bytes(&bytes).unwrap_err();
        assert_eq!(err, LoadError::TooLarge(MEMORY_SIZE + 1));
    }

    #[test]
    fn cells_past_the_program_are_zero_filled() {
        let memory = from_bytes(&[0x2A, 0x00]).unwrap();
        assert_eq!(memory.read(0), 0x2A);
        assert_eq!(memory.read(1), 0);
        assert_eq!(memory.read(32_767), 0);
    }
}
