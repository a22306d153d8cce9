//! Engine, loader, disassembler, and snapshot support for the Synacor
//! Challenge virtual machine.
//!
//! This crate knows nothing about terminals, files, or command lines —
//! that's `synacor-vm`'s job. It exposes a [`Memory`] you build with
//! [`loader::from_bytes`], an [`Engine`] you drive one [`Engine::step`]
//! at a time, and a [`Snapshot`] for speculative execution.

pub mod disassemble;
pub mod engine;
pub mod error;
pub mod instruction;
pub mod io;
pub mod loader;
pub mod memory;
pub mod snapshot;

pub use engine::{Engine, Status, StepOutcome};
pub use error::{EngineError, LoadError};
pub use instruction::{Instruction, Operand, Reg};
pub use memory::Memory;
pub use snapshot::Snapshot;
