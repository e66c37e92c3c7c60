// This file is part of runny-lsp.
// Copyright (C) 2025 runny-lsp contributors
// SPDX-License-Identifier: Apache-2.0

//! Char-column to LSP position conversion.
//!
//! The lexer counts columns in chars, LSP counts them in UTF-16 code units.

use lsp_types::Position;

use crate::formatter::split_lines;

/// Line texts of a document, for position conversion.
pub struct LineIndex<'a> {
    lines: Vec<&'a str>,
}

impl<'a> LineIndex<'a> {
    pub fn new(content: &'a str) -> Self {
        Self {
            lines: split_lines(content).map(|(text, _)| text).collect(),
        }
    }

    /// Text of a line, empty when out of range.
    pub fn line(&self, line: u32) -> &'a str {
        self.lines.get(line as usize).copied().unwrap_or("")
    }

    /// Convert a 0-based char column on `line` to an LSP position.
    pub fn position(&self, line: u32, column: u32) -> Position {
        let character = self
            .line(line)
            .chars()
            .take(column as usize)
            .map(char::len_utf16)
            .sum::<usize>() as u32;
        Position { line, character }
    }

    /// Position just past the char at `column`.
    pub fn position_after(&self, line: u32, column: u32) -> Position {
        self.position(line, column + 1)
    }

    /// Position at the end of `line`.
    pub fn line_end(&self, line: u32) -> Position {
        Position {
            line,
            character: self.line(line).encode_utf16().count() as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_counts_utf16_units() {
        let index = LineIndex::new("ab\n𝄞x é\n");
        assert_eq!(index.position(0, 1), Position { line: 0, character: 1 });
        assert_eq!(index.position(1, 1), Position { line: 1, character: 2 });
        assert_eq!(index.position_after(1, 3), Position { line: 1, character: 5 });
        assert_eq!(index.line_end(1), Position { line: 1, character: 5 });
    }

    #[test]
    fn test_lone_carriage_return_starts_a_line() {
        let index = LineIndex::new("ab\rcé\r\nd");
        assert_eq!(index.line(0), "ab");
        assert_eq!(index.line(1), "cé");
        assert_eq!(index.line(2), "d");
        assert_eq!(index.position(1, 1), Position { line: 1, character: 1 });
        assert_eq!(index.line_end(1), Position { line: 1, character: 2 });
    }

    #[test]
    fn test_out_of_range_line() {
        let index = LineIndex::new("abc");
        assert_eq!(index.line(4), "");
        assert_eq!(index.position(4, 2), Position { line: 4, character: 0 });
    }
}
