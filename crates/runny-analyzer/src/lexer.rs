// This file is part of runny-lsp.
// Copyright (C) 2025 runny-lsp contributors
// SPDX-License-Identifier: Apache-2.0

//! Lexer for `.rny` task files.
//!
//! A runny file is a list of blocks:
//!
//! ```text
//! var { name "tim", greeting `hello` }
//! target greet {
//!     run setup
//!     run { echo $greeting $name }
//! }
//! ```
//!
//! The lexer keeps a small context stack so it knows when a `{` opens a shell
//! script (after a bare `run`) rather than a nested block. Script bodies are
//! captured verbatim as a single [`TokenKind::Script`] token.
//!
//! Errors do not stop lexing. They are collected in [`Lexed::errors`] so the
//! diagnostics engine can report all of them at once.

use thiserror::Error;

/// The kind of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    LeftBrace,
    RightBrace,
    Comma,
    Identifier,
    String,
    Number,
    Script,
    Var,
    Target,
    Run,
    Eof,
}

impl TokenKind {
    /// Map a word to its keyword kind, if it is one.
    pub fn keyword(word: &str) -> Option<Self> {
        match word {
            "var" => Some(TokenKind::Var),
            "target" => Some(TokenKind::Target),
            "run" => Some(TokenKind::Run),
            _ => None,
        }
    }
}

/// A single token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Token text. For strings this is the content between the delimiters;
    /// for scripts it is the trimmed script body.
    pub text: String,
    /// Byte offset of the token start.
    pub offset: usize,
    /// 0-based line of the token start.
    pub line: u32,
    /// 0-based column (in chars) of the token start.
    pub column: u32,
    /// Brace depth after the token was read.
    pub depth: i32,
}

/// Errors found while lexing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("unsupported character '{ch}'")]
    UnsupportedCharacter { ch: char, line: u32, column: u32 },

    #[error("unterminated string")]
    UnterminatedString { line: u32, column: u32 },

    #[error("unterminated script block")]
    UnterminatedScript { line: u32, column: u32 },
}

impl LexError {
    /// 0-based `(line, column)` where the error starts.
    pub fn position(&self) -> (u32, u32) {
        match *self {
            LexError::UnsupportedCharacter { line, column, .. }
            | LexError::UnterminatedString { line, column }
            | LexError::UnterminatedScript { line, column } => (line, column),
        }
    }
}

/// The result of lexing a document.
#[derive(Debug, Clone, Default)]
pub struct Lexed {
    pub tokens: Vec<Token>,
    pub errors: Vec<LexError>,
}

/// Lex `source` into tokens. Always ends with an [`TokenKind::Eof`] token.
pub fn lex(source: &str) -> Lexed {
    let mut lexer = Lexer::new(source);
    lexer.run();
    Lexed {
        tokens: lexer.tokens,
        errors: lexer.errors,
    }
}

struct Lexer<'a> {
    source: &'a str,
    chars: Vec<(usize, char)>,
    current: usize,
    line: u32,
    column: u32,
    depth: i32,
    context: Vec<TokenKind>,
    tokens: Vec<Token>,
    errors: Vec<LexError>,
}

/// Where the token being read started.
#[derive(Clone, Copy)]
struct Mark {
    index: usize,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().collect(),
            current: 0,
            line: 0,
            column: 0,
            depth: 0,
            context: Vec::new(),
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn run(&mut self) {
        while !self.is_at_end() {
            let start = self.mark();
            let ch = self.advance();
            self.read_char(ch, start);
        }
        let end = self.mark();
        self.push(TokenKind::Eof, String::new(), end);
    }

    fn read_char(&mut self, ch: char, start: Mark) {
        match ch {
            '{' => {
                self.depth += 1;
                self.push(TokenKind::LeftBrace, "{".to_string(), start);
                if self.context.last() == Some(&TokenKind::Run) {
                    self.read_script(start);
                }
            }
            '}' => {
                self.depth -= 1;
                self.push(TokenKind::RightBrace, "}".to_string(), start);
                self.context.pop();
            }
            ',' => self.push(TokenKind::Comma, ",".to_string(), start),
            '#' => {
                while self.peek().is_some_and(|c| c != '\n' && c != '\r') {
                    self.advance();
                }
            }
            ' ' | '\t' | '\r' | '\n' => {}
            '"' | '`' => self.read_string(ch, start),
            c if c.is_ascii_digit() => self.read_number(start),
            c if c == '$' || c.is_alphabetic() => self.read_identifier(start),
            c => self.errors.push(LexError::UnsupportedCharacter {
                ch: c,
                line: start.line,
                column: start.column,
            }),
        }
    }

    fn read_script(&mut self, open: Mark) {
        let body_start = self.mark();
        let mut open_braces = 1;
        while let Some(c) = self.peek() {
            match c {
                '{' => open_braces += 1,
                '}' => {
                    open_braces -= 1;
                    if open_braces == 0 {
                        break;
                    }
                }
                _ => {}
            }
            self.advance();
        }

        if self.is_at_end() {
            self.errors.push(LexError::UnterminatedScript {
                line: open.line,
                column: open.column,
            });
        }

        let body = self.slice(body_start.index, self.current).trim();
        if !body.is_empty() {
            let body = body.to_string();
            self.push(TokenKind::Script, body, body_start);
        }
    }

    fn read_string(&mut self, delimiter: char, start: Mark) {
        while self.peek().is_some_and(|c| c != delimiter) {
            self.advance();
        }

        let content_end = self.current;
        if self.is_at_end() {
            self.errors.push(LexError::UnterminatedString {
                line: start.line,
                column: start.column,
            });
        } else {
            // closing delimiter
            self.advance();
        }

        let text = self.slice(start.index + 1, content_end).to_string();
        self.push(TokenKind::String, text, start);
    }

    fn read_number(&mut self, start: Mark) {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        let text = self.slice(start.index, self.current).to_string();
        self.push(TokenKind::Number, text, start);
    }

    fn read_identifier(&mut self, start: Mark) {
        while self.peek().is_some_and(is_identifier_char) {
            self.advance();
        }
        let text = self.slice(start.index, self.current).to_string();

        if let Some(keyword) = TokenKind::keyword(&text) {
            self.push(keyword, text, start);
            self.context.push(keyword);
            return;
        }

        // `run <name>` runs a target rather than opening a script.
        if self.tokens.last().map(|t| t.kind) == Some(TokenKind::Run) {
            self.context.pop();
            self.context.push(TokenKind::Target);
        }
        self.push(TokenKind::Identifier, text, start);
    }

    fn push(&mut self, kind: TokenKind, text: String, start: Mark) {
        self.tokens.push(Token {
            kind,
            text,
            offset: self.byte_offset(start.index),
            line: start.line,
            column: start.column,
            depth: self.depth,
        });
    }

    fn mark(&self) -> Mark {
        Mark {
            index: self.current,
            line: self.line,
            column: self.column,
        }
    }

    fn advance(&mut self) -> char {
        let (_, c) = self.chars[self.current];
        self.current += 1;
        // `\r\n` breaks the line on its `\n`
        let line_break = c == '\n' || (c == '\r' && self.peek() != Some('\n'));
        if line_break {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        c
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.current).map(|&(_, c)| c)
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.chars.len()
    }

    fn byte_offset(&self, index: usize) -> usize {
        self.chars
            .get(index)
            .map(|&(offset, _)| offset)
            .unwrap_or(self.source.len())
    }

    /// Source text between two char indices.
    fn slice(&self, from: usize, to: usize) -> &'a str {
        &self.source[self.byte_offset(from)..self.byte_offset(to)]
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | '$' | ':')
}
