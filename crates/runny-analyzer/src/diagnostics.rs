// This file is part of runny-lsp.
// Copyright (C) 2025 runny-lsp contributors
// SPDX-License-Identifier: Apache-2.0

//! Syntax diagnostics for `.rny` files.
//!
//! # How it works
//!
//! 1. We lex the document (lexing never fails, errors are collected)
//! 2. Each lexer error becomes a diagnostic
//! 3. We walk the brace tokens and report unmatched `}` and unclosed `{`
//! 4. Positions are converted to LSP (UTF-16) coordinates

use lsp_types::{Diagnostic, DiagnosticSeverity, Range};

use crate::lexer::{lex, LexError, Token, TokenKind};
use crate::line_index::LineIndex;

/// Diagnostic source shown by the editor.
pub const DIAGNOSTIC_SOURCE: &str = "rny-syntax";

/// The diagnostic engine.
#[derive(Debug, Default)]
pub struct DiagnosticEngine;

impl DiagnosticEngine {
    pub fn new() -> Self {
        Self
    }

    /// Run syntax diagnostics on the given content.
    pub fn diagnose(&self, content: &str) -> Vec<Diagnostic> {
        let lexed = lex(content);
        let index = LineIndex::new(content);

        let mut diagnostics: Vec<Diagnostic> = lexed
            .errors
            .iter()
            .map(|err| lex_error_diagnostic(&index, err))
            .collect();

        diagnostics.extend(brace_diagnostics(&index, &lexed.tokens, &lexed.errors));

        diagnostics.sort_by_key(|d| (d.range.start.line, d.range.start.character));
        tracing::trace!("Syntax diagnostics: {} error(s)", diagnostics.len());
        diagnostics
    }
}

fn lex_error_diagnostic(index: &LineIndex<'_>, err: &LexError) -> Diagnostic {
    let (line, column) = err.position();
    let start = index.position(line, column);
    let end = match err {
        // An unterminated string runs to the end of its first line.
        LexError::UnterminatedString { .. } => index.line_end(line),
        _ => index.position_after(line, column),
    };
    error(Range { start, end }, err.to_string())
}

fn brace_diagnostics(index: &LineIndex<'_>, tokens: &[Token], errors: &[LexError]) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let mut open: Vec<&Token> = Vec::new();

    for token in tokens {
        match token.kind {
            TokenKind::LeftBrace => open.push(token),
            TokenKind::RightBrace => {
                if open.pop().is_none() {
                    diagnostics.push(error(brace_range(index, token), "unmatched '}'".to_string()));
                }
            }
            _ => {}
        }
    }

    for token in open {
        // Already reported as an unterminated script.
        let reported = errors.iter().any(|err| {
            matches!(err, LexError::UnterminatedScript { .. })
                && err.position() == (token.line, token.column)
        });
        if !reported {
            diagnostics.push(error(brace_range(index, token), "unclosed '{'".to_string()));
        }
    }

    diagnostics
}

fn brace_range(index: &LineIndex<'_>, token: &Token) -> Range {
    Range {
        start: index.position(token.line, token.column),
        end: index.position_after(token.line, token.column),
    }
}

fn error(range: Range, message: String) -> Diagnostic {
    Diagnostic {
        range,
        severity: Some(DiagnosticSeverity::ERROR),
        source: Some(DIAGNOSTIC_SOURCE.to_string()),
        message,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lsp_types::Position;

    fn diagnose(content: &str) -> Vec<Diagnostic> {
        DiagnosticEngine::new().diagnose(content)
    }

    #[test]
    fn test_clean_document() {
        let content = "var { name \"tim\" }\ntarget hello {\n    run { echo $name }\n}\n";
        assert!(diagnose(content).is_empty());
    }

    #[test]
    fn test_unsupported_character() {
        let diags = diagnose("var {\n  a ; 1\n}");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "unsupported character ';'");
        assert_eq!(diags[0].range.start, Position { line: 1, character: 4 });
        assert_eq!(diags[0].range.end, Position { line: 1, character: 5 });
        assert_eq!(diags[0].severity, Some(DiagnosticSeverity::ERROR));
        assert_eq!(diags[0].source.as_deref(), Some(DIAGNOSTIC_SOURCE));
    }

    #[test]
    fn test_unmatched_closing_brace() {
        let diags = diagnose("var { a 1 }\n}\n");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "unmatched '}'");
        assert_eq!(diags[0].range.start, Position { line: 1, character: 0 });
    }

    #[test]
    fn test_unclosed_brace() {
        let diags = diagnose("target build {\n  run test\n");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "unclosed '{'");
        assert_eq!(diags[0].range.start, Position { line: 0, character: 13 });
    }

    #[test]
    fn test_unterminated_script_reported_once() {
        let diags = diagnose("run { echo hi");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "unterminated script block");
    }

    #[test]
    fn test_unterminated_string_spans_line() {
        let diags = diagnose("var { a \"é oops }");
        // the string swallows the closing brace too
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].message, "unclosed '{'");
        assert_eq!(diags[1].message, "unterminated string");
        assert_eq!(diags[1].range.start.character, 8);
        assert_eq!(diags[1].range.end.character, 17);
    }

    #[test]
    fn test_diagnostics_sorted_by_position() {
        let diags = diagnose("}\n@\n");
        let lines: Vec<u32> = diags.iter().map(|d| d.range.start.line).collect();
        assert_eq!(lines, vec![0, 1]);
    }
}
