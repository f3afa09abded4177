//! Response framing for the worker's stdout.
//!
//! The worker sends no length header. A response is complete once the count of `{` minus
//! `}` seen since the first `{` drops back to zero. Whole lines are kept, so text before the
//! first `{` on that line and after the closing `}` on the last line is part of the frame.
//!
//! The counter does not know about JSON strings: a `{` or `}` inside a string value shifts
//! the count. This matches what the worker is known to emit today; a string aware reader
//! would change the framing contract with the worker.

use std::io::BufRead;

use log::debug;

use super::error::BridgeError;

/// Accumulates lines until a brace balanced frame is seen
#[derive(Debug, Default)]
pub struct FrameAssembler {
    depth: i64,
    started: bool,
    complete: bool,
    text: String,
}

impl FrameAssembler {
    pub fn new() -> Self {
        FrameAssembler::default()
    }

    /// Feeds one line (with or without its newline). Returns true once the frame is complete.
    /// Lines seen before the first `{` are dropped.
    pub fn push_line(&mut self, line: &str) -> bool {
        if self.complete {
            return true;
        }
        for c in line.chars() {
            match c {
                '{' => {
                    self.depth += 1;
                    self.started = true;
                }
                '}' if self.started => {
                    self.depth -= 1;
                    if self.depth == 0 {
                        self.complete = true;
                        break;
                    }
                }
                _ => {}
            }
        }
        if self.started {
            self.text.push_str(line);
        }
        self.complete
    }

    /// The frame text once the input is exhausted or the frame is complete
    pub fn finish(self) -> Result<String, BridgeError> {
        if self.complete {
            Ok(self.text)
        } else if self.started {
            Err(BridgeError::IncompleteFrame { partial: self.text })
        } else {
            Err(BridgeError::NoResponse)
        }
    }
}

/// Reads lines from `reader` until one complete frame has been seen or the stream ends
pub fn read_frame<R: BufRead>(reader: &mut R) -> Result<String, BridgeError> {
    let mut frame = FrameAssembler::new();
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        if frame.push_line(&line) {
            break;
        }
    }
    let text = frame.finish()?;
    debug!("Read response frame of {} bytes", text.len());
    Ok(text)
}
