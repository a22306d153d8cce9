//! The binary's top-level error type, gluing the core crate's errors to
//! the process-level exit codes in [`crate::exit_code`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Failure {
    #[error(transparent)]
    Engine(#[from] synacor_core::EngineError),
    #[error(transparent)]
    Load(#[from] synacor_core::LoadError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("invalid address {0:?}")]
    BadArgument(String),
    #[error("snapshot serialization failed: {0}")]
    Snapshot(String),
}

/// Exit code mapping: clean halt is handled by the caller returning
/// `Ok`; everything else maps an engine fault to `1` and anything
/// touching the outside world (files, stdio, CLI arguments) to `2`.
pub fn exit_code(failure: &Failure) -> u8 {
    match failure {
        Failure::Engine(_) => 1,
        Failure::Load(_) | Failure::Io(_) | Failure::BadArgument(_) | Failure::Snapshot(_) => 2,
    }
}
