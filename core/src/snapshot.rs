//! Point-in-time capture and restore of machine state (C5).
//!
//! A [`Snapshot`] is an ordinary value: cloning, serializing, and
//! restoring it never touches the engine it was taken from. That's
//! what lets a caller try something destructive — feed a guess at the
//! coin puzzle, run until it either halts or errors — and throw the
//! attempt away by simply dropping the snapshot's clone and restoring
//! the original.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::engine::{Engine, Status};
use crate::instruction::REGISTER_COUNT;
use crate::io::{InputSource, OutputSink};
use crate::memory::Memory;

/// An immutable, serializable copy of everything that makes a machine's
/// observable state what it is: memory, registers, stack, program
/// counter, status, cycle count, and any output or input bytes that
/// haven't yet been drained.
///
/// The character source and sink are deliberately not part of this —
/// they're handed back in on [`Snapshot::restore`], so a snapshot taken
/// against one sink can be replayed against a fresh, silent one for a
/// speculative run.
#[derive(Clone, Serialize, Deserialize)]
pub struct Snapshot {
    memory: Memory,
    registers: [u16; REGISTER_COUNT],
    stack: Vec<u16>,
    pc: u16,
    status: Status,
    cycles: u64,
    input_buffer: VecDeque<u8>,
    output_buffer: Vec<u8>,
    break_on_input: bool,
}

impl Snapshot {
    pub fn capture(engine: &Engine) -> Self {
        Self {
            memory: engine.memory.clone(),
            registers: engine.registers,
            stack: engine.stack.clone(),
            pc: engine.pc,
            status: engine.status,
            cycles: engine.cycles,
            input_buffer: engine.input_buffer.clone(),
            output_buffer: engine.output_buffer.clone(),
            break_on_input: engine.break_on_input,
        }
    }

    /// Rebuilds a live [`Engine`] from this snapshot, attaching the
    /// given source and sink. The source and sink are not part of the
    /// snapshot itself; pass the same ones back in to resume exactly
    /// where capture happened, or fresh ones to explore speculatively.
    pub fn restore(self, source: Box<dyn InputSource>, sink: Box<dyn OutputSink>) -> Engine {
        Engine::from_parts(
            self.memory,
            self.registers,
            self.stack,
            self.pc,
            self.status,
            self.cycles,
            self.input_buffer,
            self.output_buffer,
            self.break_on_input,
            source,
            sink,
        )
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }
}
