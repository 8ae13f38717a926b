//! Memory-mapped UART.
//!
//! Output is line buffered: every byte stored to the UART address extends the
//! current line, and a newline (10) closes it. There is always at least one
//! (possibly empty) open line at the end of [`Uart::lines`].

use std::collections::VecDeque;

const NEWLINE: u8 = 10;

pub struct Uart {
    addr: u32,
    lines: Vec<String>,
    input: VecDeque<u8>,
}

impl Uart {
    pub fn new(addr: u32) -> Self {
        Self {
            addr,
            lines: vec![String::new()],
            input: VecDeque::new(),
        }
    }

    /// Drop all output and pending input, leaving one empty line.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.lines.push(String::new());
        self.input.clear();
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Lines already terminated by a newline (or by a pushed line after them).
    pub fn completed_lines(&self) -> &[String] {
        &self.lines[..self.lines.len() - 1]
    }

    /// The line still being written. Empty right after a newline.
    pub fn open_line(&self) -> &str {
        self.lines.last().map_or("", String::as_str)
    }

    /// Remove and return every completed line, keeping only the open one.
    pub fn take_completed(&mut self) -> Vec<String> {
        let open = self.lines.pop().unwrap_or_default();
        std::mem::replace(&mut self.lines, vec![open])
    }

    /// Append a whole line after the current one, as the trap dump does.
    pub fn push_line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// Queue bytes for the guest to read back from the UART address.
    pub fn push_input(&mut self, bytes: &[u8]) {
        self.input.extend(bytes);
    }

    pub fn load8(&mut self, addr: u32) -> u8 {
        if addr == self.addr {
            self.input.pop_front().unwrap_or(0)
        } else {
            0
        }
    }

    pub fn store8(&mut self, addr: u32, value: u8) {
        if addr != self.addr {
            tracing::debug!("ignored device store 0x{value:02x} to 0x{addr:08x}");
            return;
        }
        match value {
            NEWLINE => self.lines.push(String::new()),
            32..=126 => {
                if let Some(line) = self.lines.last_mut() {
                    line.push(value as char);
                }
            }
            _ => tracing::debug!("dropped unprintable UART byte 0x{value:02x}"),
        }
    }
}
