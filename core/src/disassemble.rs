//! The disassembler (C6): a best-effort reading of memory as code.
//!
//! Unlike [`crate::instruction::Instruction::decode_at`], this module
//! never errors. An opcode outside `0..=21` is rendered as a single
//! data word rather than aborting the sweep, and operand words are
//! shown raw rather than validated as registers — a disassembly is a
//! guess about what the programmer meant, not a claim that the bytes
//! will execute.

use crate::instruction;
use crate::memory::{Memory, MEMORY_SIZE};

/// One line of a disassembly: the address it starts at, the raw
/// opcode word, its mnemonic if recognized, and its raw operand words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisassembledLine {
    pub address: u16,
    pub opcode: u16,
    pub mnemonic: Option<&'static str>,
    pub operands: Vec<u16>,
}

impl DisassembledLine {
    /// Number of memory cells this line occupies (1 for the opcode,
    /// plus one per operand).
    pub fn width(&self) -> u16 {
        1 + self.operands.len() as u16
    }
}

/// Disassembles one instruction (or data word) starting at `address`.
pub fn disassemble_next(memory: &Memory, address: u16) -> DisassembledLine {
    let opcode = memory.read(address);
    let arity = instruction::arity(opcode).unwrap_or(0);
    let mnemonic = instruction::mnemonic(opcode);

    let mut operands = Vec::with_capacity(arity as usize);
    for i in 0..arity {
        operands.push(memory.read(address.wrapping_add(1 + i as u16)));
    }

    DisassembledLine {
        address,
        opcode,
        mnemonic,
        operands,
    }
}

/// Walks backward from `address` looking for the start of the
/// instruction that precedes it.
///
/// This is necessarily a heuristic: without re-sweeping from the start
/// of memory there's no way to know where an earlier instruction
/// actually began, so this scans backward for the nearest byte in
/// `0..=21` and assumes it's an opcode. A data word or operand that
/// happens to fall in that range will be misread; the disassembler
/// makes no stronger guarantee going backward than going forward.
pub fn disassemble_prev(memory: &Memory, address: u16) -> DisassembledLine {
    let mut back: u16 = 1;
    while back <= address && !(0..=21).contains(&memory.read(address - back)) {
        back += 1;
    }
    let start = address.saturating_sub(back.min(address));
    disassemble_next(memory, start)
}

/// A full linear sweep of memory from address 0, exactly as a static
/// disassembly view would render it.
pub fn disassemble(memory: &Memory) -> Vec<DisassembledLine> {
    let mut lines = Vec::new();
    let mut pos: u32 = 0;
    while (pos as usize) < MEMORY_SIZE {
        let line = disassemble_next(memory, pos as u16);
        pos += line.width() as u32;
        lines.push(line);
    }
    lines
}
