//! Error types surfaced by the loader and the execution engine.

use thiserror::Error;

use crate::memory::MEMORY_SIZE;

/// Failure to turn a raw byte stream into a loaded [`crate::memory::Memory`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LoadError {
    #[error("program is {0} bytes long; binaries are a stream of 16-bit little-endian words")]
    OddLength(usize),
    #[error("program has {0} words, which does not fit in the {MEMORY_SIZE}-word memory")]
    TooLarge(usize),
}

/// A fault raised while decoding or executing a single instruction.
///
/// Every variant corresponds to a precondition violation the engine
/// refuses to paper over; on any of these the step that triggered it is
/// abandoned and engine state is left exactly as it was before the step
/// began (aside from output already flushed to the sink).
///
/// There is no `BadAddress` variant: `RMEM`/`WMEM`/`JMP` targets are
/// always resolved operand values, which are either a decoded literal
/// (`Operand::decode` rejects anything outside `0..32768`) or a
/// register value (masked to 15 bits on every write). An out-of-range
/// memory address is therefore unreachable by construction, not merely
/// unchecked.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    #[error("unknown opcode {opcode} at address {at:#06x}")]
    BadOpcode { at: u16, opcode: u16 },
    #[error("operand value {raw} is neither a valid literal nor a register reference")]
    BadOperand { raw: u16 },
    #[error("stack underflow executing POP at address {at:#06x}")]
    StackUnderflow { at: u16 },
    #[error("division by zero executing MOD at address {at:#06x}")]
    DivByZero { at: u16 },
    #[error("input source reached end of stream without delivering a line")]
    InputEof,
}
