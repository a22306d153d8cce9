//! End-to-end scenarios exercising the loader, engine, and snapshot
//! together on small hand-assembled programs.

use std::cell::RefCell;
use std::rc::Rc;

use synacor_core::engine::{Engine, Status, StepOutcome};
use synacor_core::io::{BufferedSource, OutputSink};
use synacor_core::loader;
use synacor_core::snapshot::Snapshot;

fn assemble(words: &[u16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(words.len() * 2);
    for word in words {
        bytes.extend_from_slice(&word.to_le_bytes());
    }
    bytes
}

#[derive(Clone, Default)]
struct CapturedSink(Rc<RefCell<Vec<u8>>>);

impl OutputSink for CapturedSink {
    fn write(&mut self, bytes: &[u8]) {
        self.0.borrow_mut().extend_from_slice(bytes);
    }
}

fn new_engine(words: &[u16]) -> (Engine, CapturedSink) {
    let memory = loader::from_bytes(&assemble(words)).unwrap();
    let sink = CapturedSink::default();
    let engine = Engine::new(memory, Box::new(BufferedSource::new()), Box::new(sink.clone()));
    (engine, sink)
}

#[test]
fn s1_self_test_sequence_emits_byte_two() {
    // add r0 1 1; out r0; halt
    let (mut engine, sink) = new_engine(&[9, 32_768, 1, 1, 19, 32_768, 0]);
    let outcome = engine.run().unwrap();
    assert_eq!(outcome, StepOutcome::Suspended(Status::Finished));
    assert_eq!(sink.0.borrow().as_slice(), &[0x02]);
}

#[test]
fn s2_echo_one_line_then_suspends_on_empty_input() {
    // in r0; out r0; jmp 0
    let memory = loader::from_bytes(&assemble(&[20, 32_768, 19, 32_768, 6, 0])).unwrap();
    let mut source = BufferedSource::new();
    source.push_line("Hi");
    let sink = CapturedSink::default();
    let mut engine = Engine::new(memory, Box::new(source), Box::new(sink.clone()));
    engine.set_break_on_input(true);

    let outcome = engine.run().unwrap();
    assert_eq!(outcome, StepOutcome::Suspended(Status::ExpectingInput));
    assert_eq!(sink.0.borrow().as_slice(), b"Hi\n");
}

#[test]
fn s3_stack_discipline() {
    // push 7; push 8; pop r0; pop r1; halt
    let (mut engine, _sink) = new_engine(&[2, 7, 2, 8, 3, 32_768, 3, 32_769, 0]);
    engine.run().unwrap();
    assert_eq!(engine.registers()[0], 8);
    assert_eq!(engine.registers()[1], 7);
    assert!(engine.stack().is_empty());
}

#[test]
fn s4_not_emits_low_byte_of_complement() {
    // not r0 1; out r0; halt
    let (mut engine, sink) = new_engine(&[14, 32_768, 1, 19, 32_768, 0]);
    engine.run().unwrap();
    assert_eq!(engine.registers()[0], 32_766);
    assert_eq!(sink.0.borrow()[0], 0xFE);
}

#[test]
fn s5_input_suspension_rewinds_pc_and_resumes_on_feed() {
    // in r0; halt
    let (mut engine, _sink) = new_engine(&[20, 32_768, 0]);
    engine.set_break_on_input(true);

    let outcome = engine.step().unwrap();
    assert_eq!(outcome, StepOutcome::Suspended(Status::ExpectingInput));
    assert_eq!(engine.pc(), 0, "PC must point back at the IN instruction");
    assert_eq!(engine.status(), Status::ExpectingInput);

    engine.feed_input("A");
    assert_eq!(engine.status(), Status::Running, "feeding input resumes the engine");

    let outcome = engine.run().unwrap();
    assert_eq!(outcome, StepOutcome::Suspended(Status::Finished));
    assert_eq!(engine.registers()[0], b'A' as u16);
}

#[test]
fn s6_snapshot_isolation_over_a_thousand_steps() {
    // A tight loop that never halts on its own: jmp 0.
    let (mut engine, _sink) = new_engine(&[6, 0]);
    let before = Snapshot::capture(&engine);

    for _ in 0..1000 {
        engine.step().unwrap();
    }
    assert_eq!(engine.cycles(), 1000);

    let mut restored = before.restore(Box::new(BufferedSource::new()), Box::new(CapturedSink::default()));
    assert_eq!(restored.cycles(), 0);
    assert_eq!(restored.pc(), engine.pc());
    assert_eq!(restored.registers(), &[0u16; 8]);
    assert!(restored.stack().is_empty());

    restored.step().unwrap();
    assert_eq!(restored.cycles(), 1);
}

#[test]
fn p1_pc_always_stays_in_bounds_across_a_jump_heavy_program() {
    // jmp 2; noop; jmp 0 — bounces between addresses 0 and 2 forever.
    let (mut engine, _sink) = new_engine(&[6, 2, 21, 6, 0]);
    for _ in 0..200 {
        engine.step().unwrap();
        assert!((engine.pc() as usize) < synacor_core::memory::MEMORY_SIZE);
    }
}
