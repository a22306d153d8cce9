//! The instruction table: opcode arities, operand decoding, and the
//! tagged [`Instruction`] enum the engine dispatches on.
//!
//! Decoding is centralized here rather than left to raw-integer
//! `match`es scattered through the engine, so every opcode's arity and
//! operand shape is declared exactly once.

use std::fmt;

use crate::error::EngineError;

/// A register index, always in `0..8`.
pub type Reg = u8;

pub const REGISTER_COUNT: usize = 8;

/// Mnemonics in opcode order, used by both [`Instruction::fmt`] and the
/// disassembler's lenient sweep.
pub const OPCODE_NAMES: [&str; 22] = [
    "halt", "set", "push", "pop", "eq", "gt", "jmp", "jt", "jf", "add", "mult", "mod", "and",
    "or", "not", "rmem", "wmem", "call", "ret", "out", "in", "noop",
];

/// Number of operand words following an opcode, or `None` if the opcode
/// is not one of the 22 this machine understands.
pub fn arity(opcode: u16) -> Option<u8> {
    match opcode {
        0 | 18 | 21 => Some(0),
        2 | 3 | 6 | 17 | 19 | 20 => Some(1),
        1 | 7 | 8 | 14 | 15 | 16 => Some(2),
        4 | 5 | 9 | 10 | 11 | 12 | 13 => Some(3),
        _ => None,
    }
}

/// The mnemonic for a known opcode.
pub fn mnemonic(opcode: u16) -> Option<&'static str> {
    OPCODE_NAMES.get(opcode as usize).copied()
}

/// A raw 16-bit operand cell, classified as a literal or a register
/// reference. `0..=32767` is a literal, `32768..=32775` addresses
/// registers 0–7, and `32776..=65535` is never valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Literal(u16),
    Register(Reg),
}

impl Operand {
    pub fn decode(raw: u16) -> Result<Self, EngineError> {
        match raw {
            0..=32_767 => Ok(Operand::Literal(raw)),
            32_768..=32_775 => Ok(Operand::Register((raw - 32_768) as Reg)),
            _ => Err(EngineError::BadOperand { raw }),
        }
    }

    /// Used for operands the instruction table requires to name a
    /// register outright (e.g. `SET`'s destination): a literal here is
    /// a malformed program, not a value to fall back on.
    fn into_register(self) -> Result<Reg, EngineError> {
        match self {
            Operand::Register(r) => Ok(r),
            Operand::Literal(raw) => Err(EngineError::BadOperand { raw }),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Literal(v) => write!(f, "{v}"),
            Operand::Register(r) => write!(f, "r{r}"),
        }
    }
}

fn decode_register(raw: u16) -> Result<Reg, EngineError> {
    Operand::decode(raw)?.into_register()
}

fn decode_operand(raw: u16) -> Result<Operand, EngineError> {
    Operand::decode(raw)
}

/// A fully decoded instruction: opcode plus typed operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Halt,
    Set { dst: Reg, src: Operand },
    Push { value: Operand },
    Pop { dst: Reg },
    Eq { dst: Reg, a: Operand, b: Operand },
    Gt { dst: Reg, a: Operand, b: Operand },
    Jmp { target: Operand },
    Jt { cond: Operand, target: Operand },
    Jf { cond: Operand, target: Operand },
    Add { dst: Reg, a: Operand, b: Operand },
    Mult { dst: Reg, a: Operand, b: Operand },
    Mod { dst: Reg, a: Operand, b: Operand },
    And { dst: Reg, a: Operand, b: Operand },
    Or { dst: Reg, a: Operand, b: Operand },
    Not { dst: Reg, src: Operand },
    ReadMem { dst: Reg, addr: Operand },
    WriteMem { addr: Operand, value: Operand },
    Call { target: Operand },
    Ret,
    Out { value: Operand },
    In { dst: Reg },
    Noop,
}

impl Instruction {
    /// Decodes the instruction starting at `pc`, returning it along with
    /// the address of the instruction that follows. Fails closed: any
    /// operand that isn't a valid literal or register, or a
    /// register-required slot holding a literal, is a [`EngineError`]
    /// rather than a best-effort guess.
    pub fn decode_at(
        read: impl Fn(u16) -> u16,
        pc: u16,
    ) -> Result<(Instruction, u16), EngineError> {
        let opcode = read(pc);
        let arity = arity(opcode).ok_or(EngineError::BadOpcode { at: pc, opcode })?;

        let mut words = [0u16; 3];
        for (i, word) in words.iter_mut().enumerate().take(arity as usize) {
            *word = read(pc.wrapping_add(1 + i as u16));
        }
        let next_pc = pc.wrapping_add(1 + arity as u16);

        let instruction = match opcode {
            0 => Instruction::Halt,
            1 => Instruction::Set {
                dst: decode_register(words[0])?,
                src: decode_operand(words[1])?,
            },
            2 => Instruction::Push {
                value: decode_operand(words[0])?,
            },
            3 => Instruction::Pop {
                dst: decode_register(words[0])?,
            },
            4 => Instruction::Eq {
                dst: decode_register(words[0])?,
                a: decode_operand(words[1])?,
                b: decode_operand(words[2])?,
            },
            5 => Instruction::Gt {
                dst: decode_register(words[0])?,
                a: decode_operand(words[1])?,
                b: decode_operand(words[2])?,
            },
            6 => Instruction::Jmp {
                target: decode_operand(words[0])?,
            },
            7 => Instruction::Jt {
                cond: decode_operand(words[0])?,
                target: decode_operand(words[1])?,
            },
            8 => Instruction::Jf {
                cond: decode_operand(words[0])?,
                target: decode_operand(words[1])?,
            },
            9 => Instruction::Add {
                dst: decode_register(words[0])?,
                a: decode_operand(words[1])?,
                b: decode_operand(words[2])?,
            },
            10 => Instruction::Mult {
                dst: decode_register(words[0])?,
                a: decode_operand(words[1])?,
                b: decode_operand(words[2])?,
            },
            11 => Instruction::Mod {
                dst: decode_register(words[0])?,
                a: decode_operand(words[1])?,
                b: decode_operand(words[2])?,
            },
            12 => Instruction::And {
                dst: decode_register(words[0])?,
                a: decode_operand(words[1])?,
                b: decode_operand(words[2])?,
            },
            13 => Instruction::Or {
                dst: decode_register(words[0])?,
                a: decode_operand(words[1])?,
                b: decode_operand(words[2])?,
            },
            14 => Instruction::Not {
                dst: decode_register(words[0])?,
                src: decode_operand(words[1])?,
            },
            15 => Instruction::ReadMem {
                dst: decode_register(words[0])?,
                addr: decode_operand(words[1])?,
            },
            16 => Instruction::WriteMem {
                addr: decode_operand(words[0])?,
                value: decode_operand(words[1])?,
            },
            17 => Instruction::Call {
                target: decode_operand(words[0])?,
            },
            18 => Instruction::Ret,
            19 => Instruction::Out {
                value: decode_operand(words[0])?,
            },
            20 => Instruction::In {
                dst: decode_register(words[0])?,
            },
            21 => Instruction::Noop,
            _ => unreachable!("arity() already rejected opcode {opcode}"),
        };

        Ok((instruction, next_pc))
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Halt => write!(f, "halt"),
            Instruction::Set { dst, src } => write!(f, "set   r{dst} {src}"),
            Instruction::Push { value } => write!(f, "push  {value}"),
            Instruction::Pop { dst } => write!(f, "pop   r{dst}"),
            Instruction::Eq { dst, a, b } => write!(f, "eq    r{dst} {a} {b}"),
            Instruction::Gt { dst, a, b } => write!(f, "gt    r{dst} {a} {b}"),
            Instruction::Jmp { target } => write!(f, "jmp   {target}"),
            Instruction::Jt { cond, target } => write!(f, "jt    {cond} {target}"),
            Instruction::Jf { cond, target } => write!(f, "jf    {cond} {target}"),
            Instruction::Add { dst, a, b } => write!(f, "add   r{dst} {a} {b}"),
            Instruction::Mult { dst, a, b } => write!(f, "mult  r{dst} {a} {b}"),
            Instruction::Mod { dst, a, b } => write!(f, "mod   r{dst} {a} {b}"),
            Instruction::And { dst, a, b } => write!(f, "and   r{dst} {a} {b}"),
            Instruction::Or { dst, a, b } => write!(f, "or    r{dst} {a} {b}"),
            Instruction::Not { dst, src } => write!(f, "not   r{dst} {src}"),
            Instruction::ReadMem { dst, addr } => write!(f, "rmem  r{dst} {addr}"),
            Instruction::WriteMem { addr, value } => write!(f, "wmem  {addr} {value}"),
            Instruction::Call { target } => write!(f, "call  {target}"),
            Instruction::Ret => write!(f, "ret"),
            Instruction::Out { value } => write!(f, "out   {value}"),
            Instruction::In { dst } => write!(f, "in    r{dst}"),
            Instruction::Noop => write!(f, "noop"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_from(words: &[u16], pc: u16) -> Result<(Instruction, u16), EngineError> {
        Instruction::decode_at(|addr| words.get(addr as usize).copied().unwrap_or(0), pc)
    }

    #[test]
    fn decodes_halt_with_no_operands() {
        let (instr, next) = decode_from(&[0], 0).unwrap();
        assert_eq!(instr, Instruction::Halt);
        assert_eq!(next, 1);
    }

    #[test]
    fn decodes_set_with_register_destination() {
        let (instr, next) = decode_from(&[1, 32_768, 4], 0).unwrap();
        assert_eq!(
            instr,
            Instruction::Set {
                dst: 0,
                src: Operand::Literal(4)
            }
        );
        assert_eq!(next, 3);
    }

    #[test]
    fn rejects_literal_in_a_register_only_slot() {
        let err = decode_from(&[1, 4, 4], 0).unwrap_err();
        assert_eq!(err, EngineError::BadOperand { raw: 4 });
    }

    #[test]
    fn rejects_unknown_opcode() {
        let err = decode_from(&[22], 0).unwrap_err();
        assert_eq!(err, EngineError::BadOpcode { at: 0, opcode: 22 });
    }

    #[test]
    fn rejects_operand_past_the_register_range() {
        let err = decode_from(&[19, 32_776], 0).unwrap_err();
        assert_eq!(err, EngineError::BadOperand { raw: 32_776 });
    }
}
