//! CLI entry point: load a Synacor Challenge binary and either run it
//! to completion or hand it to the interactive debugger.

mod debugger;
mod errors;
mod io;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use synacor_core::engine::{Engine, Status, StepOutcome};
use synacor_core::{loader, Memory};

use errors::Failure;

#[derive(Parser)]
#[command(
    name = "synacor-vm",
    version,
    about = "Synacor Challenge virtual machine interpreter and debugger"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a program non-interactively until it halts, errors, or
    /// blocks waiting for input with none available.
    Run {
        /// Path to a binary of 16-bit little-endian words.
        binary: PathBuf,
    },
    /// Run a program under the interactive line debugger.
    Debug {
        /// Path to a binary of 16-bit little-endian words.
        binary: PathBuf,
        /// Address to break at before the session starts. May be
        /// repeated.
        #[arg(long = "breakpoint", value_name = "ADDR")]
        breakpoints: Vec<String>,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Run { binary } => run(&binary),
        Command::Debug {
            binary,
            breakpoints,
        } => debug(&binary, &breakpoints),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            log::error!("{failure}");
            ExitCode::from(errors::exit_code(&failure))
        }
    }
}

fn load_program(path: &PathBuf) -> Result<Memory, Failure> {
    let bytes = std::fs::read(path)?;
    Ok(loader::from_bytes(&bytes)?)
}

fn run(binary: &PathBuf) -> Result<(), Failure> {
    let memory = load_program(binary)?;
    let mut engine = Engine::new(
        memory,
        Box::new(io::StdinSource::default()),
        Box::new(io::StdoutSink::default()),
    );
    engine.set_break_on_input(false);

    match engine.run()? {
        StepOutcome::Suspended(Status::Finished) => Ok(()),
        StepOutcome::Suspended(Status::ExpectingInput) => {
            unreachable!("break_on_input is disabled for `run`")
        }
        StepOutcome::Continue => unreachable!("run() only returns once the engine suspends"),
    }
}

fn debug(binary: &PathBuf, breakpoints: &[String]) -> Result<(), Failure> {
    let memory = load_program(binary)?;
    let engine = Engine::new(
        memory,
        Box::new(io::StdinSource::default()),
        Box::new(io::StdoutSink::default()),
    );
    let mut controller = debugger::Debugger::new(engine);

    for raw in breakpoints {
        let address: u16 = raw
            .strip_prefix("0x")
            .map(|hex| u16::from_str_radix(hex, 16))
            .unwrap_or_else(|| raw.parse())
            .map_err(|_| Failure::BadArgument(raw.clone()))?;
        controller.set_breakpoint(address);
    }

    controller.run_repl()
}
