//! The engine's character I/O boundary (C4).
//!
//! The engine is agnostic to where bytes actually come from or go: it
//! talks to an [`InputSource`] and an [`OutputSink`] trait object, never
//! to a terminal or a file directly. That keeps this crate usable both
//! from a non-interactive `run` and from a debugger that wants to
//! inspect output between steps, and lets tests and speculative
//! execution swap in the in-memory implementations below.

use std::collections::VecDeque;

/// Supplies input a line at a time. A line should include its trailing
/// `\n`; an empty string signals end of stream.
pub trait InputSource {
    fn read_line(&mut self) -> String;
}

/// Receives completed chunks of guest output.
///
/// Takes raw bytes rather than `&str`: `OUT` emits whatever low byte
/// the guest computes, including values `>= 128` that are not valid
/// UTF-8 on their own, and the sink must hand those bytes to its
/// destination verbatim rather than losing or replacing them.
pub trait OutputSink {
    fn write(&mut self, bytes: &[u8]);
}

/// An in-memory [`InputSource`] backed by a queue of lines, for tests
/// and for speculative execution that shouldn't touch real stdin.
#[derive(Debug, Default, Clone)]
pub struct BufferedSource {
    lines: VecDeque<String>,
}

impl BufferedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a line of input, appending a trailing newline if missing.
    pub fn push_line(&mut self, line: impl Into<String>) {
        let mut line = line.into();
        if !line.ends_with('\n') {
            line.push('\n');
        }
        self.lines.push_back(line);
    }
}

impl InputSource for BufferedSource {
    fn read_line(&mut self) -> String {
        self.lines.pop_front().unwrap_or_default()
    }
}

/// An in-memory [`OutputSink`] that simply accumulates everything
/// written to it, for tests and speculative execution.
#[derive(Debug, Default, Clone)]
pub struct BufferedSink {
    contents: Vec<u8>,
}

impl BufferedSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> &[u8] {
        &self.contents
    }
}

impl OutputSink for BufferedSink {
    fn write(&mut self, bytes: &[u8]) {
        self.contents.extend_from_slice(bytes);
    }
}
