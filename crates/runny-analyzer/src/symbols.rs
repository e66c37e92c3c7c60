// This file is part of runny-lsp.
// Copyright (C) 2025 runny-lsp contributors
// SPDX-License-Identifier: Apache-2.0

//! Document symbols and folding ranges, built from the token stream.
//!
//! - `target <name> { ... }` is a function symbol spanning its block
//! - every name in a `var { name value, ... }` block is a variable symbol,
//!   nested under the target it appears in

use std::collections::HashMap;

use lsp_types::{DocumentSymbol, FoldingRange, FoldingRangeKind, Position, Range, SymbolKind};

use crate::lexer::{lex, Token, TokenKind};
use crate::line_index::LineIndex;

/// Build the outline of a document.
pub fn document_symbols(content: &str) -> Vec<DocumentSymbol> {
    let tokens = lex(content).tokens;
    let index = LineIndex::new(content);
    let pairs = brace_pairs(&tokens);

    // (symbol, first token, last token)
    let mut targets: Vec<(DocumentSymbol, usize, usize)> = Vec::new();
    let mut variables: Vec<(DocumentSymbol, usize)> = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::Target => {
                let Some(name) = tokens.get(i + 1).filter(|t| t.kind == TokenKind::Identifier) else {
                    continue;
                };
                let last = match tokens.get(i + 2) {
                    Some(open) if open.kind == TokenKind::LeftBrace => {
                        pairs.get(&(i + 2)).copied().unwrap_or(tokens.len() - 1)
                    }
                    _ => i + 1,
                };
                let range = Range {
                    start: index.position(token.line, token.column),
                    end: token_end(&index, &tokens[last]),
                };
                targets.push((symbol(name, None, SymbolKind::FUNCTION, range, &index), i, last));
            }
            TokenKind::Var => {
                let Some(open) = tokens.get(i + 1).filter(|t| t.kind == TokenKind::LeftBrace) else {
                    continue;
                };
                let close = pairs.get(&(i + 1)).copied().unwrap_or(tokens.len() - 1);
                for j in (i + 2)..close {
                    let candidate = &tokens[j];
                    let after_separator = matches!(
                        tokens[j - 1].kind,
                        TokenKind::LeftBrace | TokenKind::Comma
                    );
                    if candidate.kind != TokenKind::Identifier
                        || candidate.depth != open.depth
                        || !after_separator
                    {
                        continue;
                    }
                    let detail = tokens
                        .get(j + 1)
                        .filter(|v| {
                            matches!(
                                v.kind,
                                TokenKind::String | TokenKind::Number | TokenKind::Identifier
                            )
                        })
                        .map(|v| v.text.clone());
                    let range = Range {
                        start: index.position(candidate.line, candidate.column),
                        end: token_end(&index, candidate),
                    };
                    variables.push((symbol(candidate, detail, SymbolKind::VARIABLE, range, &index), j));
                }
            }
            _ => {}
        }
    }

    let mut top_level: Vec<DocumentSymbol> = Vec::new();
    for (variable, position) in variables {
        let owner = targets
            .iter_mut()
            .find(|(_, first, last)| *first < position && position < *last);
        match owner {
            Some((target, _, _)) => target.children.get_or_insert_with(Vec::new).push(variable),
            None => top_level.push(variable),
        }
    }
    top_level.extend(targets.into_iter().map(|(target, _, _)| target));
    top_level.sort_by_key(|s| (s.range.start.line, s.range.start.character));

    tracing::trace!("Document symbols: {} top-level", top_level.len());
    top_level
}

/// Fold every brace pair that spans more than one line.
pub fn folding_ranges(content: &str) -> Vec<FoldingRange> {
    let tokens = lex(content).tokens;
    let index = LineIndex::new(content);

    let mut ranges: Vec<FoldingRange> = brace_pairs(&tokens)
        .into_iter()
        .filter_map(|(open, close)| {
            let open = &tokens[open];
            let close = &tokens[close];
            if close.line <= open.line {
                return None;
            }
            let start = index.position(open.line, open.column);
            let end = index.position(close.line, close.column);
            Some(FoldingRange {
                start_line: start.line,
                start_character: Some(start.character),
                end_line: end.line,
                end_character: Some(end.character),
                kind: Some(FoldingRangeKind::Region),
                collapsed_text: None,
            })
        })
        .collect();

    ranges.sort_by_key(|r| (r.start_line, r.end_line));
    ranges
}

/// Map each `{` token index to its matching `}` token index.
fn brace_pairs(tokens: &[Token]) -> HashMap<usize, usize> {
    let mut pairs = HashMap::new();
    let mut open = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::LeftBrace => open.push(i),
            TokenKind::RightBrace => {
                if let Some(start) = open.pop() {
                    pairs.insert(start, i);
                }
            }
            _ => {}
        }
    }
    pairs
}

fn token_end(index: &LineIndex<'_>, token: &Token) -> Position {
    let width = token.text.chars().count().max(1) as u32;
    match token.kind {
        TokenKind::Eof => index.position(token.line, token.column),
        _ => index.position(token.line, token.column + width),
    }
}

fn symbol(
    name: &Token,
    detail: Option<String>,
    kind: SymbolKind,
    range: Range,
    index: &LineIndex<'_>,
) -> DocumentSymbol {
    let selection_range = Range {
        start: index.position(name.line, name.column),
        end: token_end(index, name),
    };

    #[allow(deprecated)]
    DocumentSymbol {
        name: name.text.clone(),
        detail,
        kind,
        tags: None,
        deprecated: None,
        range,
        selection_range,
        children: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"var { greeting "hello", name `tim` }

target greet {
    var { loud 1 }
    run {
        echo $greeting $name
    }
}

target all {
    run greet
}
"#;

    #[test]
    fn test_document_symbols() {
        let symbols = document_symbols(SOURCE);
        let names: Vec<&str> = symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["greeting", "name", "greet", "all"]);

        assert_eq!(symbols[0].kind, SymbolKind::VARIABLE);
        assert_eq!(symbols[0].detail.as_deref(), Some("hello"));
        assert_eq!(symbols[1].detail.as_deref(), Some("tim"));

        let greet = &symbols[2];
        assert_eq!(greet.kind, SymbolKind::FUNCTION);
        assert_eq!(greet.range.start, Position { line: 2, character: 0 });
        assert_eq!(greet.range.end, Position { line: 7, character: 1 });
        assert_eq!(greet.selection_range.start, Position { line: 2, character: 7 });
        assert_eq!(greet.selection_range.end, Position { line: 2, character: 12 });

        let children = greet.children.as_ref().expect("greet has a variable");
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name, "loud");
        assert_eq!(children[0].detail.as_deref(), Some("1"));

        assert!(symbols[3].children.is_none());
    }

    #[test]
    fn test_values_are_not_symbols() {
        let symbols = document_symbols("var { a b, c d }");
        let names: Vec<&str> = symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
        assert_eq!(symbols[0].detail.as_deref(), Some("b"));
    }

    #[test]
    fn test_unclosed_target_runs_to_end() {
        let symbols = document_symbols("target build {\n  run test\n");
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].range.end, Position { line: 2, character: 0 });
    }

    #[test]
    fn test_folding_ranges() {
        let ranges = folding_ranges(SOURCE);
        let spans: Vec<(u32, u32)> = ranges.iter().map(|r| (r.start_line, r.end_line)).collect();
        // single-line var blocks are not folded
        assert_eq!(spans, vec![(2, 7), (4, 6), (9, 11)]);
        assert_eq!(ranges[0].start_character, Some(13));
        assert_eq!(ranges[0].kind, Some(FoldingRangeKind::Region));
    }

    #[test]
    fn test_empty_document() {
        assert!(document_symbols("").is_empty());
        assert!(folding_ranges("").is_empty());
    }
}
