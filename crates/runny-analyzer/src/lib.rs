// This file is part of runny-lsp.
// Copyright (C) 2025 runny-lsp contributors
// SPDX-License-Identifier: Apache-2.0

//! Runny Analyzer - Analysis engines for the runny language server
//!
//! This crate provides:
//! - Formatter engine: rewrites the indentation of `}`, `run` and `var` lines
//! - Lexer: tokenizes `.rny` task files
//! - Diagnostics engine: syntax errors from the lexer and brace matching
//! - Symbols: document outline and folding ranges

pub mod diagnostics;
pub mod formatter;
pub mod lexer;
pub mod line_index;
pub mod symbols;

pub use diagnostics::DiagnosticEngine;
pub use formatter::{apply_edits, format_line, indent_depth, FormatterEngine, LineEdit};
pub use lexer::{lex, LexError, Lexed, Token, TokenKind};
pub use symbols::{document_symbols, folding_ranges};
