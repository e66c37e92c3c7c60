//! Document state management.

use lsp_types::{Position, TextDocumentContentChangeEvent};
use ropey::Rope;

/// A document we're tracking (an open file in the editor).
#[derive(Debug, Clone)]
pub struct Document {
    /// The document content, stored as a rope for cheap edits.
    pub content: Rope,

    /// Document version (incremented by editor on each change).
    pub version: i32,
}

impl Document {
    pub fn new(text: &str, version: i32) -> Self {
        Self {
            content: Rope::from_str(text),
            version,
        }
    }

    /// Apply one change from `didChange`.
    ///
    /// A change without a range replaces the whole document.
    pub fn apply_change(&mut self, change: TextDocumentContentChangeEvent) {
        match change.range {
            Some(range) => {
                let start = self.position_to_char(range.start);
                let end = self.position_to_char(range.end).max(start);
                self.content.remove(start..end);
                self.content.insert(start, &change.text);
            }
            None => self.content = Rope::from_str(&change.text),
        }
    }

    /// Convert an LSP position (UTF-16 columns) to a char index.
    ///
    /// Positions past the end of a line clamp to the line end, positions past
    /// the last line clamp to the document end.
    pub fn position_to_char(&self, position: Position) -> usize {
        let line = position.line as usize;
        let line_count = self.content.len_lines();
        if line >= line_count {
            return self.content.len_chars();
        }

        let line_start = self.content.line_to_char(line);
        let line_slice = self.content.line(line);
        let mut line_len = line_slice.len_chars();
        // exclude the line terminator
        while line_len > 0 && matches!(line_slice.char(line_len - 1), '\n' | '\r') {
            line_len -= 1;
        }
        let line_end = line_start + line_len;

        let start_cu = self.content.char_to_utf16_cu(line_start);
        let end_cu = self.content.char_to_utf16_cu(line_end);
        let target_cu = (start_cu + position.character as usize).min(end_cu);
        self.content.utf16_cu_to_char(target_cu)
    }
}
