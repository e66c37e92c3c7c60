// This file is part of runny-lsp.
// Copyright (C) 2025 runny-lsp contributors
// SPDX-License-Identifier: Apache-2.0

//! Formatter engine for `.rny` documents.
//!
//! # How it works
//!
//! 1. We receive the document content from the LSP server
//! 2. We walk it line by line, trimming each line
//! 3. Lines starting with `}`, `run` or `var` get their indentation rewritten
//!    as spaces (one space per leading whitespace character)
//! 4. Every other line is left alone
//!
//! Indentation depth counts characters, not columns: a tab is one unit.

use lsp_types::{Position, Range, TextEdit};

/// Trimmed-line prefixes that trigger an indentation rewrite.
pub const FORMAT_PREFIXES: [&str; 3] = ["}", "run", "var"];

/// A replacement of one line's text (terminator excluded).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineEdit {
    /// 0-based line index.
    pub line: u32,
    /// Range covering the line's text in LSP (UTF-16) coordinates.
    pub range: Range,
    /// Replacement text for the whole line.
    pub new_text: String,
}

impl From<LineEdit> for TextEdit {
    fn from(edit: LineEdit) -> Self {
        TextEdit {
            range: edit.range,
            new_text: edit.new_text,
        }
    }
}

/// Count the whitespace characters before the first non-whitespace one.
pub fn indent_depth(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

/// The replacement text for `line`, or `None` if the line is not reformatted.
pub fn format_line(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if !FORMAT_PREFIXES.iter().any(|prefix| trimmed.starts_with(prefix)) {
        return None;
    }

    let depth = indent_depth(line);
    Some(format!("{}{}", " ".repeat(depth), line.trim_start()))
}

/// Split a document into `(text, terminator)` pairs.
///
/// `\n`, `\r\n` and a lone `\r` terminate lines, as in LSP. A trailing
/// terminator does not open an extra line.
pub fn split_lines(content: &str) -> impl Iterator<Item = (&str, &str)> {
    let mut rest = content;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }

        let Some(end) = rest.find(|c: char| c == '\n' || c == '\r') else {
            let text = rest;
            rest = "";
            return Some((text, ""));
        };

        let terminator_len = if rest[end..].starts_with("\r\n") { 2 } else { 1 };
        let (text, tail) = rest.split_at(end);
        let (terminator, after) = tail.split_at(terminator_len);
        rest = after;
        Some((text, terminator))
    })
}

/// The formatter engine.
///
/// Stateless; it exists so the server can hold one behind an `Arc` the same
/// way it holds the other engines.
#[derive(Debug, Default)]
pub struct FormatterEngine;

impl FormatterEngine {
    pub fn new() -> Self {
        Self
    }

    /// Format the whole document.
    pub fn format(&self, content: &str) -> Vec<LineEdit> {
        self.format_lines(content, 0, usize::MAX)
    }

    /// Format only the lines in `start_line..=end_line`.
    pub fn format_range(&self, content: &str, start_line: u32, end_line: u32) -> Vec<LineEdit> {
        self.format_lines(content, start_line as usize, end_line as usize)
    }

    fn format_lines(&self, content: &str, first: usize, last: usize) -> Vec<LineEdit> {
        let edits: Vec<LineEdit> = split_lines(content)
            .enumerate()
            .skip(first)
            .take_while(|(index, _)| *index <= last)
            .filter_map(|(index, (text, _))| {
                let new_text = format_line(text)?;
                let line = index as u32;
                Some(LineEdit {
                    line,
                    range: Range {
                        start: Position { line, character: 0 },
                        end: Position {
                            line,
                            character: text.encode_utf16().count() as u32,
                        },
                    },
                    new_text,
                })
            })
            .collect();

        tracing::debug!("Formatter produced {} edits", edits.len());
        edits
    }
}

/// Apply line edits to `content`, keeping the original line terminators.
///
/// Edits pointing past the last line are ignored.
pub fn apply_edits(content: &str, edits: &[LineEdit]) -> String {
    let mut out = String::with_capacity(content.len());
    for (index, (text, terminator)) in split_lines(content).enumerate() {
        // Later edits for the same line win, matching sequential application.
        match edits.iter().rev().find(|edit| edit.line as usize == index) {
            Some(edit) => out.push_str(&edit.new_text),
            None => out.push_str(text),
        }
        out.push_str(terminator);
    }
    out
}
