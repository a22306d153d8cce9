//! Stdio adapters satisfying the core crate's [`InputSource`] and
//! [`OutputSink`] traits. The core crate stays filesystem- and
//! terminal-agnostic; this is the one place that actually touches
//! stdin/stdout.

use std::io::{self, BufRead, Write};

use synacor_core::io::{InputSource, OutputSink};

#[derive(Default)]
pub struct StdinSource;

impl InputSource for StdinSource {
    fn read_line(&mut self) -> String {
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) => String::new(),
            Ok(_) => line,
            Err(err) => {
                log::error!("failed to read stdin: {err}");
                String::new()
            }
        }
    }
}

#[derive(Default)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn write(&mut self, bytes: &[u8]) {
        let mut stdout = io::stdout();
        if let Err(err) = stdout.write_all(bytes).and_then(|()| stdout.flush()) {
            log::error!("failed to write stdout: {err}");
        }
    }
}
