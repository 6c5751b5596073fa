//! Byte cursor for XML input with line/column tracking

use crate::error::Pos;

/// Cursor for navigating byte input with position tracking
#[derive(Clone, Debug)]
pub struct Cursor<'a> {
    input: &'a [u8],
    pos: usize,
    line: u32,
    col: u32,
}

impl<'a> Cursor<'a> {
    /// Create cursor from byte slice
    pub const fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    /// Get current byte without consuming
    pub fn current(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    /// True when the unread input begins with `pattern`
    pub fn starts_with(&self, pattern: &[u8]) -> bool {
        self.remaining().starts_with(pattern)
    }

    /// Advance cursor by one byte
    pub fn advance(&mut self) {
        if let Some(b) = self.current() {
            self.pos += 1;
            if b == b'\n' {
                self.line += 1;
                self.col = 1;
            } else if b & 0xC0 != 0x80 {
                // continuation bytes of a UTF-8 sequence share a column
                self.col += 1;
            }
        }
    }

    pub fn advance_by(&mut self, count: usize) {
        for _ in 0..count {
            self.advance();
        }
    }

    /// Consume byte if it matches
    pub fn consume(&mut self, expected: u8) -> bool {
        if self.current() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume `pattern` if the input starts with it
    pub fn eat(&mut self, pattern: &[u8]) -> bool {
        if self.starts_with(pattern) {
            self.advance_by(pattern.len());
            true
        } else {
            false
        }
    }

    /// Skip XML whitespace, returning whether anything was skipped
    pub fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while let Some(b) = self.current() {
            if is_whitespace(b) {
                self.advance();
            } else {
                break;
            }
        }
        self.pos != start
    }

    /// Advance past the next occurrence of `pattern`, returning the bytes
    /// before it. `None` (cursor at end of input) when it never occurs.
    pub fn take_until(&mut self, pattern: &[u8]) -> Option<&'a [u8]> {
        let start = self.pos;
        while !self.is_eof() {
            if self.starts_with(pattern) {
                let taken = self.slice_from(start);
                self.advance_by(pattern.len());
                return Some(taken);
            }
            self.advance();
        }
        None
    }

    /// Get current position
    pub const fn position(&self) -> Pos {
        Pos::new(self.pos, self.line, self.col)
    }

    /// Check if at end of input
    pub const fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Get remaining bytes
    pub fn remaining(&self) -> &'a [u8] {
        self.input.get(self.pos..).unwrap_or_default()
    }

    /// Get current position index
    pub const fn pos(&self) -> usize {
        self.pos
    }

    /// Get slice from start to current position
    pub fn slice_from(&self, start: usize) -> &'a [u8] {
        self.input.get(start..self.pos).unwrap_or_default()
    }
}

pub const fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}
