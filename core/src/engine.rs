//! The execution engine (C3): fetch/decode/execute for the 22 opcodes,
//! driven one step at a time so a caller — the `run` command, the
//! debugger, or speculative coin-puzzle search — can interleave its own
//! control flow between steps.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::instruction::{Instruction, Operand, Reg, REGISTER_COUNT};
use crate::io::{InputSource, OutputSink};
use crate::memory::Memory;

const WORD_MASK: u16 = 0x7FFF;
const MOD: u32 = 32_768;

/// Lifecycle state of a running machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Running,
    Finished,
    ExpectingInput,
}

/// What a single [`Engine::step`] accomplished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The instruction completed and the engine is still running.
    Continue,
    /// The engine suspended; the carried [`Status`] is always
    /// [`Status::Finished`] or [`Status::ExpectingInput`].
    Suspended(Status),
}

impl StepOutcome {
    /// Mirrors the boolean "still running?" contract: `true` unless the
    /// engine just suspended.
    pub fn is_running(self) -> bool {
        matches!(self, StepOutcome::Continue)
    }
}

/// The Synacor Challenge virtual machine: memory, registers, stack, and
/// the two character streams it talks to.
pub struct Engine {
    pub(crate) memory: Memory,
    pub(crate) registers: [u16; REGISTER_COUNT],
    pub(crate) stack: Vec<u16>,
    pub(crate) pc: u16,
    pub(crate) status: Status,
    pub(crate) cycles: u64,
    pub(crate) input_buffer: VecDeque<u8>,
    pub(crate) output_buffer: Vec<u8>,
    pub(crate) break_on_input: bool,
    source: Box<dyn InputSource>,
    sink: Box<dyn OutputSink>,
}

impl Engine {
    pub fn new(memory: Memory, source: Box<dyn InputSource>, sink: Box<dyn OutputSink>) -> Self {
        Self {
            memory,
            registers: [0; REGISTER_COUNT],
            stack: Vec::new(),
            pc: 0,
            status: Status::Running,
            cycles: 0,
            input_buffer: VecDeque::new(),
            output_buffer: Vec::new(),
            break_on_input: false,
            source,
            sink,
        }
    }

    /// Reassembles an engine from its constituent state plus a fresh
    /// source and sink. Used by [`crate::snapshot::Snapshot::restore`];
    /// not exposed outside the crate since the field list is an
    /// implementation detail of the snapshot format, not public API.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        memory: Memory,
        registers: [u16; REGISTER_COUNT],
        stack: Vec<u16>,
        pc: u16,
        status: Status,
        cycles: u64,
        input_buffer: VecDeque<u8>,
        output_buffer: Vec<u8>,
        break_on_input: bool,
        source: Box<dyn InputSource>,
        sink: Box<dyn OutputSink>,
    ) -> Self {
        Self {
            memory,
            registers,
            stack,
            pc,
            status,
            cycles,
            input_buffer,
            output_buffer,
            break_on_input,
            source,
            sink,
        }
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn registers(&self) -> &[u16; REGISTER_COUNT] {
        &self.registers
    }

    pub fn stack(&self) -> &[u16] {
        &self.stack
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

    pub fn break_on_input(&self) -> bool {
        self.break_on_input
    }

    /// When set, `IN` on an empty input buffer suspends the engine
    /// instead of blocking on the input source. The debugger always
    /// sets this; the non-interactive `run` command leaves it clear.
    pub fn set_break_on_input(&mut self, value: bool) {
        self.break_on_input = value;
    }

    /// Appends a line directly to the input buffer, as if the source
    /// had delivered it. Used by the debugger's `input` command to
    /// resume a machine suspended on `IN`.
    ///
    /// If the engine was suspended expecting input, this also flips it
    /// back to running: PC is already rewound to the `IN` instruction,
    /// so the next `step()`/`run()` re-executes it against the
    /// newly-filled buffer instead of suspending again.
    pub fn feed_input(&mut self, line: &str) {
        let mut line = line.to_string();
        if !line.ends_with('\n') {
            line.push('\n');
        }
        self.input_buffer.extend(line.bytes());
        if self.status == Status::ExpectingInput {
            self.status = Status::Running;
        }
    }

    /// Executes exactly one instruction.
    ///
    /// Preconditions the decoded instruction violates (bad opcode, bad
    /// operand, stack underflow, division by zero) abort the step with
    /// an [`EngineError`] and leave engine state exactly as it was
    /// before the call, other than output already flushed to the sink.
    pub fn step(&mut self) -> Result<StepOutcome, EngineError> {
        if self.status != Status::Running {
            return Ok(StepOutcome::Suspended(self.status));
        }

        let start_pc = self.pc;
        let memory = &self.memory;
        let (instruction, fetched_pc) =
            Instruction::decode_at(|addr| memory.read(addr), start_pc)?;
        log::trace!("{start_pc:#06x}: {instruction}");

        // An IN with nothing buffered and break_on_input set suspends
        // before touching any state, rather than blocking on the
        // source or consuming a character.
        if matches!(instruction, Instruction::In { .. })
            && self.input_buffer.is_empty()
            && self.break_on_input
        {
            self.status = Status::ExpectingInput;
            self.flush();
            return Ok(StepOutcome::Suspended(Status::ExpectingInput));
        }

        match self.execute(instruction, start_pc, fetched_pc) {
            Ok(outcome) => {
                self.cycles += 1;
                if !matches!(outcome, StepOutcome::Continue) {
                    self.flush();
                }
                Ok(outcome)
            }
            Err(err) => {
                self.flush();
                Err(err)
            }
        }
    }

    /// Repeatedly steps until the engine suspends or errors.
    pub fn run(&mut self) -> Result<StepOutcome, EngineError> {
        loop {
            match self.step()? {
                StepOutcome::Continue => continue,
                suspended => return Ok(suspended),
            }
        }
    }

    fn execute(
        &mut self,
        instruction: Instruction,
        start_pc: u16,
        fetched_pc: u16,
    ) -> Result<StepOutcome, EngineError> {
        use Instruction::*;

        match instruction {
            Halt => {
                self.status = Status::Finished;
                self.pc = fetched_pc;
                Ok(StepOutcome::Suspended(Status::Finished))
            }
            Set { dst, src } => {
                let value = self.value_of(src);
                self.set_register(dst, value);
                self.pc = fetched_pc;
                Ok(StepOutcome::Continue)
            }
            Push { value } => {
                let value = self.value_of(value);
                self.stack.push(value);
                self.pc = fetched_pc;
                Ok(StepOutcome::Continue)
            }
            Pop { dst } => {
                let value = self
                    .stack
                    .pop()
                    .ok_or(EngineError::StackUnderflow { at: start_pc })?;
                self.set_register(dst, value);
                self.pc = fetched_pc;
                Ok(StepOutcome::Continue)
            }
            Eq { dst, a, b } => {
                let result = (self.value_of(a) == self.value_of(b)) as u16;
                self.set_register(dst, result);
                self.pc = fetched_pc;
                Ok(StepOutcome::Continue)
            }
            Gt { dst, a, b } => {
                let result = (self.value_of(a) > self.value_of(b)) as u16;
                self.set_register(dst, result);
                self.pc = fetched_pc;
                Ok(StepOutcome::Continue)
            }
            Jmp { target } => {
                self.pc = self.value_of(target);
                Ok(StepOutcome::Continue)
            }
            Jt { cond, target } => {
                self.pc = if self.value_of(cond) != 0 {
                    self.value_of(target)
                } else {
                    fetched_pc
                };
                Ok(StepOutcome::Continue)
            }
            Jf { cond, target } => {
                self.pc = if self.value_of(cond) == 0 {
                    self.value_of(target)
                } else {
                    fetched_pc
                };
                Ok(StepOutcome::Continue)
            }
            Add { dst, a, b } => {
                let sum = self.value_of(a) as u32 + self.value_of(b) as u32;
                self.set_register(dst, (sum % MOD) as u16);
                self.pc = fetched_pc;
                Ok(StepOutcome::Continue)
            }
            Mult { dst, a, b } => {
                let product = self.value_of(a) as u32 * self.value_of(b) as u32;
                self.set_register(dst, (product % MOD) as u16);
                self.pc = fetched_pc;
                Ok(StepOutcome::Continue)
            }
            Mod { dst, a, b } => {
                let divisor = self.value_of(b);
                if divisor == 0 {
                    return Err(EngineError::DivByZero { at: start_pc });
                }
                let dividend = self.value_of(a);
                self.set_register(dst, dividend % divisor);
                self.pc = fetched_pc;
                Ok(StepOutcome::Continue)
            }
            And { dst, a, b } => {
                let result = self.value_of(a) & self.value_of(b);
                self.set_register(dst, result);
                self.pc = fetched_pc;
                Ok(StepOutcome::Continue)
            }
            Or { dst, a, b } => {
                let result = self.value_of(a) | self.value_of(b);
                self.set_register(dst, result);
                self.pc = fetched_pc;
                Ok(StepOutcome::Continue)
            }
            Not { dst, src } => {
                let result = self.value_of(src) ^ WORD_MASK;
                self.set_register(dst, result);
                self.pc = fetched_pc;
                Ok(StepOutcome::Continue)
            }
            ReadMem { dst, addr } => {
                let address = self.value_of(addr);
                let value = self.memory.read(address);
                self.set_register(dst, value);
                self.pc = fetched_pc;
                Ok(StepOutcome::Continue)
            }
            WriteMem { addr, value } => {
                let address = self.value_of(addr);
                let value = self.value_of(value);
                self.memory.write(address, value);
                self.pc = fetched_pc;
                Ok(StepOutcome::Continue)
            }
            Call { target } => {
                self.stack.push(fetched_pc);
                self.pc = self.value_of(target);
                Ok(StepOutcome::Continue)
            }
            Ret => match self.stack.pop() {
                Some(return_address) => {
                    self.pc = return_address;
                    Ok(StepOutcome::Continue)
                }
                None => {
                    self.status = Status::Finished;
                    self.pc = fetched_pc;
                    Ok(StepOutcome::Suspended(Status::Finished))
                }
            },
            Out { value } => {
                let byte = (self.value_of(value) & 0xFF) as u8;
                self.emit(byte);
                self.pc = fetched_pc;
                Ok(StepOutcome::Continue)
            }
            In { dst } => {
                if self.input_buffer.is_empty() {
                    let line = self.source.read_line();
                    if line.is_empty() {
                        return Err(EngineError::InputEof);
                    }
                    self.input_buffer.extend(line.bytes());
                }
                let byte = self
                    .input_buffer
                    .pop_front()
                    .expect("input buffer just filled");
                self.set_register(dst, byte as u16);
                self.pc = fetched_pc;
                Ok(StepOutcome::Continue)
            }
            Noop => {
                self.pc = fetched_pc;
                Ok(StepOutcome::Continue)
            }
        }
    }

    fn value_of(&self, operand: Operand) -> u16 {
        match operand {
            Operand::Literal(value) => value,
            Operand::Register(r) => self.registers[r as usize],
        }
    }

    fn set_register(&mut self, reg: Reg, value: u16) {
        self.registers[reg as usize] = value & WORD_MASK;
    }

    fn emit(&mut self, byte: u8) {
        self.output_buffer.push(byte);
        if byte == b'\n' {
            self.flush();
        }
    }

    /// Hands any buffered output to the sink. Called on newline and on
    /// every status transition, so a caller polling between steps never
    /// sees output sitting in the engine unobserved.
    pub fn flush(&mut self) {
        if self.output_buffer.is_empty() {
            return;
        }
        // Bytes, not text: OUT emits whatever low byte the guest
        // computes, and a value >= 128 is not valid UTF-8 on its own.
        // Decoding it here would corrupt it before the sink ever sees it.
        self.sink.write(&self.output_buffer);
        self.output_buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{BufferedSink, BufferedSource};
    use crate::loader;

    fn engine_from_words(words: &[u16]) -> Engine {
        let mut bytes = Vec::with_capacity(words.len() * 2);
        for word in words {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        let memory = loader::from_bytes(&bytes).unwrap();
        Engine::new(
            memory,
            Box::new(BufferedSource::new()),
            Box::new(BufferedSink::new()),
        )
    }

    #[test]
    fn halt_suspends_as_finished() {
        let mut engine = engine_from_words(&[0]);
        let outcome = engine.step().unwrap();
        assert_eq!(outcome, StepOutcome::Suspended(Status::Finished));
        assert_eq!(engine.status(), Status::Finished);
    }

    #[test]
    fn add_wraps_modulo_32768() {
        // add r0 32767 10; halt
        let mut engine = engine_from_words(&[9, 32_768, 32_767, 10, 0]);
        engine.run().unwrap();
        assert_eq!(engine.registers()[0], 9);
    }

    #[test]
    fn not_complements_fifteen_bits() {
        // not r0 1; halt
        let mut engine = engine_from_words(&[14, 32_768, 1, 0]);
        engine.run().unwrap();
        assert_eq!(engine.registers()[0], 32_766);
    }

    #[test]
    fn out_emits_low_byte_and_flushes_on_newline() {
        use std::cell::RefCell;
        use std::rc::Rc;

        struct SharedSink(Rc<RefCell<Vec<u8>>>);
        impl OutputSink for SharedSink {
            fn write(&mut self, bytes: &[u8]) {
                self.0.borrow_mut().extend_from_slice(bytes);
            }
        }

        let mut bytes = Vec::new();
        for word in [19u16, 65, 19, 10, 0] {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        let memory = loader::from_bytes(&bytes).unwrap();
        let captured = Rc::new(RefCell::new(Vec::new()));
        let mut engine = Engine::new(
            memory,
            Box::new(BufferedSource::new()),
            Box::new(SharedSink(captured.clone())),
        );
        engine.run().unwrap();
        assert_eq!(captured.borrow().as_slice(), b"A\n");
    }

    #[test]
    fn pop_on_empty_stack_is_stack_underflow() {
        // pop r0
        let mut engine = engine_from_words(&[3, 32_768]);
        let err = engine.step().unwrap_err();
        assert_eq!(err, EngineError::StackUnderflow { at: 0 });
        assert_eq!(engine.pc(), 0, "pc must not advance on a failed step");
    }

    #[test]
    fn ret_on_empty_stack_halts_instead_of_erroring() {
        let mut engine = engine_from_words(&[18]);
        let outcome = engine.step().unwrap();
        assert_eq!(outcome, StepOutcome::Suspended(Status::Finished));
    }

    #[test]
    fn mod_by_zero_is_an_error_and_does_not_mutate_registers() {
        // mod r0 5 0; halt
        let mut engine = engine_from_words(&[11, 32_768, 5, 0, 0]);
        let err = engine.step().unwrap_err();
        assert_eq!(err, EngineError::DivByZero { at: 0 });
        assert_eq!(engine.registers()[0], 0);
    }

    #[test]
    fn in_without_break_on_input_blocks_on_the_source() {
        let mut bytes = Vec::new();
        for word in [20u16, 32_768, 0] {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        let memory = loader::from_bytes(&bytes).unwrap();
        let mut source = BufferedSource::new();
        source.push_line("A");
        let mut engine = Engine::new(memory, Box::new(source), Box::new(BufferedSink::new()));
        engine.step().unwrap();
        assert_eq!(engine.registers()[0], b'A' as u16);
    }

    #[test]
    fn in_with_break_on_input_suspends_without_consuming() {
        let mut bytes = Vec::new();
        for word in [20u16, 32_768, 0] {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        let memory = loader::from_bytes(&bytes).unwrap();
        let mut engine = Engine::new(
            memory,
            Box::new(BufferedSource::new()),
            Box::new(BufferedSink::new()),
        );
        engine.set_break_on_input(true);
        let outcome = engine.step().unwrap();
        assert_eq!(outcome, StepOutcome::Suspended(Status::ExpectingInput));
        assert_eq!(engine.pc(), 0);
        assert_eq!(engine.cycles(), 0);

        engine.feed_input("A");
        assert_eq!(engine.status(), Status::Running, "feed_input resumes a suspended engine");
        engine.step().unwrap();
        assert_eq!(engine.registers()[0], b'A' as u16);
    }
}
