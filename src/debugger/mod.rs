//! The debugger controller (C7): owns an engine and its breakpoint
//! set, and drives a line-oriented REPL over it.
//!
//! The breakpoint bookkeeping mirrors the emulator's own
//! `Debugger { game_boy, breakpoints }` controller; the command
//! vocabulary itself (step, run, break, disasm, regs, ...) is the
//! terminal-REPL counterpart of the original challenge's urwid
//! debugger, which dispatched on single keys instead of words.

use std::collections::BTreeSet;
use std::io::{self, BufRead, Write};

use synacor_core::disassemble;
use synacor_core::engine::{Engine, Status, StepOutcome};
use synacor_core::Snapshot;

use crate::errors::Failure;
use crate::io::{StdinSource, StdoutSink};

pub struct Debugger {
    engine: Engine,
    breakpoints: BTreeSet<u16>,
}

impl Debugger {
    pub fn new(mut engine: Engine) -> Self {
        engine.set_break_on_input(true);
        Self {
            engine,
            breakpoints: BTreeSet::new(),
        }
    }

    pub fn set_breakpoint(&mut self, address: u16) {
        self.breakpoints.insert(address);
    }

    pub fn clear_breakpoint(&mut self, address: u16) {
        self.breakpoints.remove(&address);
    }

    pub fn breakpoints(&self) -> &BTreeSet<u16> {
        &self.breakpoints
    }

    fn step(&mut self) -> Result<StepOutcome, Failure> {
        Ok(self.engine.step()?)
    }

    /// Steps until a breakpoint is hit or the engine suspends on its
    /// own. A breakpoint on the very instruction the engine is already
    /// sitting at is ignored for the first step, otherwise `run` could
    /// never make progress from a breakpoint it just stopped at.
    fn run_to_breakpoint(&mut self) -> Result<StepOutcome, Failure> {
        loop {
            let outcome = self.step()?;
            if !matches!(outcome, StepOutcome::Continue) {
                return Ok(outcome);
            }
            if self.breakpoints.contains(&self.engine.pc()) {
                log::debug!("breakpoint hit at {:#06x}", self.engine.pc());
                return Ok(outcome);
            }
        }
    }

    /// Runs the interactive command loop until `quit` or end of input.
    pub fn run_repl(&mut self) -> Result<(), Failure> {
        println!("synacor-vm debugger. type `help` for commands, `quit` to exit.");
        let stdin = io::stdin();
        loop {
            print!("({:04x})> ", self.engine.pc());
            io::stdout().flush()?;

            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                println!();
                break;
            }
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if !self.dispatch(line)? {
                break;
            }
        }
        Ok(())
    }

    /// Executes one REPL command line; returns `false` to end the session.
    fn dispatch(&mut self, line: &str) -> Result<bool, Failure> {
        let mut words = line.split_whitespace();
        let command = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();

        match command {
            "step" | "s" => {
                let count: u32 = args.first().and_then(|a| a.parse().ok()).unwrap_or(1);
                for _ in 0..count {
                    let outcome = self.step()?;
                    self.report(outcome);
                    if !matches!(outcome, StepOutcome::Continue) {
                        break;
                    }
                }
            }
            "run" | "r" => {
                let outcome = self.run_to_breakpoint()?;
                self.report(outcome);
            }
            "break" | "b" => match args.first().and_then(|a| parse_address(a)) {
                Some(address) => {
                    self.set_breakpoint(address);
                    println!("breakpoint set at {address:#06x}");
                }
                None => println!("usage: break <address>"),
            },
            "delete" => match args.first().and_then(|a| parse_address(a)) {
                Some(address) => {
                    self.clear_breakpoint(address);
                    println!("breakpoint cleared at {address:#06x}");
                }
                None => println!("usage: delete <address>"),
            },
            "disasm" | "d" => {
                let start = args
                    .first()
                    .and_then(|a| parse_address(a))
                    .unwrap_or_else(|| self.engine.pc());
                let count = args.get(1).and_then(|a| a.parse().ok()).unwrap_or(10);
                self.print_disassembly(start, count);
            }
            "regs" => self.print_registers(),
            "stack" => println!("{:?}", self.engine.stack()),
            "status" => println!("{:?}, cycles={}", self.engine.status(), self.engine.cycles()),
            "input" => {
                let text = args.join(" ");
                self.engine.feed_input(&text);
                println!("fed {} bytes to the input buffer", text.len() + 1);
            }
            "snapshot" => match args.first() {
                Some(path) => self.save_snapshot(path)?,
                None => println!("usage: snapshot <path>"),
            },
            "restore" => match args.first() {
                Some(path) => self.load_snapshot(path)?,
                None => println!("usage: restore <path>"),
            },
            "help" | "h" => self.print_help(),
            "quit" | "q" => return Ok(false),
            other => println!("unknown command {other:?}; try `help`"),
        }
        Ok(true)
    }

    fn report(&self, outcome: StepOutcome) {
        match outcome {
            StepOutcome::Continue => {}
            StepOutcome::Suspended(Status::Finished) => println!("halted"),
            StepOutcome::Suspended(Status::ExpectingInput) => {
                println!("expecting input; use `input <text>` then `step` or `run` to resume")
            }
            StepOutcome::Suspended(Status::Running) => {
                unreachable!("Running is never carried as a suspend reason")
            }
        }
    }

    fn print_registers(&self) {
        for (i, value) in self.engine.registers().iter().enumerate() {
            print!("r{i}={value:<6} ");
        }
        println!();
    }

    fn print_disassembly(&self, start: u16, count: u32) {
        let mut address = start;
        for _ in 0..count {
            let line = disassemble::disassemble_next(self.engine.memory(), address);
            let mnemonic = line.mnemonic.unwrap_or("???");
            let operands: Vec<String> = line.operands.iter().map(u16::to_string).collect();
            let marker = if self.breakpoints.contains(&line.address) {
                "*"
            } else {
                " "
            };
            println!(
                "{marker}{:04x}: {mnemonic} {}",
                line.address,
                operands.join(" ")
            );
            address = address.wrapping_add(line.width());
        }
    }

    /// Writes a RON-encoded snapshot of the current machine state to
    /// `path`, mirroring the emulator's own save-state file format.
    fn save_snapshot(&self, path: &str) -> Result<(), Failure> {
        let snapshot = Snapshot::capture(&self.engine);
        let text = ron::ser::to_string_pretty(&snapshot, ron::ser::PrettyConfig::default())
            .map_err(|err| Failure::Snapshot(err.to_string()))?;
        std::fs::write(path, text)?;
        println!("snapshot written to {path}");
        Ok(())
    }

    /// Replaces the running engine with one restored from a RON
    /// snapshot file, reattaching fresh stdio so the session keeps
    /// talking to the same terminal.
    fn load_snapshot(&mut self, path: &str) -> Result<(), Failure> {
        let text = std::fs::read_to_string(path)?;
        let snapshot: Snapshot =
            ron::from_str(&text).map_err(|err| Failure::Snapshot(err.to_string()))?;
        self.engine = snapshot.restore(
            Box::new(StdinSource::default()),
            Box::new(StdoutSink::default()),
        );
        println!("restored snapshot from {path}");
        Ok(())
    }

    fn print_help(&self) {
        println!("commands:");
        println!("  step|s [n]           execute n instructions (default 1)");
        println!("  run|r                run until a breakpoint or suspension");
        println!("  break|b <addr>       set a breakpoint");
        println!("  delete <addr>        clear a breakpoint");
        println!("  disasm|d [addr] [n]  disassemble n instructions from addr (default: here)");
        println!("  regs                 print register contents");
        println!("  stack                print the stack");
        println!("  status               print engine status and cycle count");
        println!("  input <text>         feed a line into the input buffer");
        println!("  snapshot <path>      save machine state to a RON file");
        println!("  restore <path>       load machine state from a RON file");
        println!("  quit|q               exit the debugger");
    }
}

fn parse_address(text: &str) -> Option<u16> {
    match text.strip_prefix("0x") {
        Some(hex) => u16::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_and_decimal_addresses() {
        assert_eq!(parse_address("0x1A"), Some(0x1A));
        assert_eq!(parse_address("26"), Some(26));
        assert_eq!(parse_address("not-a-number"), None);
    }
}
