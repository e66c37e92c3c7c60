//! The main Language Server implementation.
//!
//! # LSP Lifecycle
//!
//! 1. Editor starts our binary and sends `initialize` request
//! 2. We respond with our capabilities (what features we support)
//! 3. Editor sends `initialized` notification (handshake complete)
//! 4. Normal operation: file events, requests flow both directions
//! 5. Editor sends `shutdown` request, we respond, then `exit` notification

mod config;
mod state;

pub use config::ServerConfig;
pub use state::Document;

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use lsp_types::*;
use runny_analyzer::{document_symbols, folding_ranges, DiagnosticEngine, FormatterEngine};
use tokio::sync::RwLock;
use tower_lsp::jsonrpc::Result;
use tower_lsp::{Client, LanguageServer};

/// The runny Language Server.
///
/// - `client`: Used to send notifications TO the editor (e.g., diagnostics)
/// - `documents`: Map of open files (Uri -> Document)
/// - `formatter_engine`: Rewrites indentation on format requests
/// - `diagnostic_engine`: Lexer-based syntax checks
pub struct RunnyLanguageServer {
    /// The LSP client - used to send messages TO the editor.
    client: Client,

    /// Open documents, keyed by their URI.
    documents: Arc<DashMap<String, Document>>,

    formatter_engine: Arc<FormatterEngine>,

    diagnostic_engine: Arc<DiagnosticEngine>,

    /// Options from `initializationOptions`.
    config: Arc<RwLock<ServerConfig>>,

    /// Pending debounced diagnostics tasks.
    pending_diagnostics: Arc<DashMap<String, tokio::task::JoinHandle<()>>>,
}

impl RunnyLanguageServer {
    /// Create a new language server instance.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            documents: Arc::new(DashMap::new()),
            formatter_engine: Arc::new(FormatterEngine::new()),
            diagnostic_engine: Arc::new(DiagnosticEngine::new()),
            config: Arc::new(RwLock::new(ServerConfig::default())),
            pending_diagnostics: Arc::new(DashMap::new()),
        }
    }

    /// Snapshot of a document's text.
    fn document_text(&self, uri: &Uri) -> Option<String> {
        document_text(&self.documents, uri)
    }

    /// Publish diagnostics for a document right away.
    async fn publish_diagnostics(&self, uri: Uri) {
        if !self.config.read().await.diagnostics {
            return;
        }

        let (content, version) = match self.documents.get(&uri.to_string()) {
            Some(doc) => (doc.content.to_string(), doc.version),
            None => return,
        };

        let diagnostics = self.diagnostic_engine.diagnose(&content);
        self.client
            .publish_diagnostics(uri, diagnostics, Some(version))
            .await;
    }

    /// Schedule diagnostics with debounce, replacing any pending run.
    async fn schedule_diagnostics(&self, uri: Uri) {
        let config = *self.config.read().await;
        if !config.diagnostics {
            return;
        }

        let uri_string = uri.to_string();
        if let Some((_, handle)) = self.pending_diagnostics.remove(&uri_string) {
            handle.abort();
        }

        let client = self.client.clone();
        let documents = self.documents.clone();
        let diagnostic_engine = self.diagnostic_engine.clone();
        let pending = self.pending_diagnostics.clone();
        let key = uri_string.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(config.diagnostics_delay_ms)).await;

            // Read the text after the delay so the latest edit is checked.
            let (content, version) = match documents.get(&key) {
                Some(doc) => (doc.content.to_string(), doc.version),
                None => return,
            };

            let diagnostics = diagnostic_engine.diagnose(&content);
            client.publish_diagnostics(uri, diagnostics, Some(version)).await;
            pending.remove(&key);
        });

        self.pending_diagnostics.insert(uri_string, handle);
    }
}

fn document_text(documents: &DashMap<String, Document>, uri: &Uri) -> Option<String> {
    documents
        .get(&uri.to_string())
        .map(|doc| doc.content.to_string())
}

/// Formatting edits for an open document, `None` if it is not open.
///
/// `lines` restricts formatting to an inclusive line range.
fn format_document(
    documents: &DashMap<String, Document>,
    formatter: &FormatterEngine,
    uri: &Uri,
    lines: Option<(u32, u32)>,
) -> Option<Vec<TextEdit>> {
    let content = document_text(documents, uri)?;
    let edits = match lines {
        Some((start, end)) => formatter.format_range(&content, start, end),
        None => formatter.format(&content),
    };
    tracing::debug!("Formatting {}: {} edit(s)", uri.as_str(), edits.len());
    Some(edits.into_iter().map(TextEdit::from).collect())
}

/// Lines covered by a range-format request.
///
/// A selection that ends at the start of a line does not include that line.
fn range_format_lines(range: Range) -> (u32, u32) {
    let start = range.start.line;
    let mut end = range.end.line;
    if range.end.character == 0 && end > start {
        end -= 1;
    }
    (start, end)
}

/// Implementation of the Language Server Protocol.
impl LanguageServer for RunnyLanguageServer {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        tracing::info!("Received initialize request");

        let config = ServerConfig::from_initialization_options(params.initialization_options);
        tracing::info!("Server config: {:?}", config);
        *self.config.write().await = config;

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Options(
                    TextDocumentSyncOptions {
                        open_close: Some(true),
                        change: Some(TextDocumentSyncKind::INCREMENTAL),
                        ..Default::default()
                    },
                )),
                document_formatting_provider: Some(OneOf::Left(true)),
                document_range_formatting_provider: Some(OneOf::Left(true)),
                document_symbol_provider: Some(OneOf::Left(true)),
                folding_range_provider: Some(FoldingRangeProviderCapability::Simple(true)),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "runny-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        tracing::info!("Server initialized - handshake complete");
        self.client
            .log_message(MessageType::INFO, "runny LSP server ready")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        tracing::info!("Shutdown requested");
        for entry in self.pending_diagnostics.iter() {
            entry.value().abort();
        }
        self.pending_diagnostics.clear();
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri.to_string();
        tracing::debug!("Document opened: {}", uri);

        self.documents.insert(
            uri,
            Document::new(&params.text_document.text, params.text_document.version),
        );

        self.publish_diagnostics(params.text_document.uri).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let uri_string = uri.to_string();
        tracing::trace!("Document changed: {}", uri_string);

        match self.documents.get_mut(&uri_string) {
            Some(mut doc) => {
                for change in params.content_changes {
                    doc.apply_change(change);
                }
                doc.version = params.text_document.version;
            }
            None => {
                tracing::warn!("Change for unknown document: {}", uri_string);
                return;
            }
        }

        self.schedule_diagnostics(uri).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri.to_string();
        tracing::debug!("Document closed: {}", uri);

        if let Some((_, handle)) = self.pending_diagnostics.remove(&uri) {
            handle.abort();
        }

        self.documents.remove(&uri);

        self.client
            .publish_diagnostics(params.text_document.uri, vec![], None)
            .await;
    }

    async fn formatting(&self, params: DocumentFormattingParams) -> Result<Option<Vec<TextEdit>>> {
        Ok(format_document(
            &self.documents,
            &self.formatter_engine,
            &params.text_document.uri,
            None,
        ))
    }

    async fn range_formatting(
        &self,
        params: DocumentRangeFormattingParams,
    ) -> Result<Option<Vec<TextEdit>>> {
        let lines = range_format_lines(params.range);
        Ok(format_document(
            &self.documents,
            &self.formatter_engine,
            &params.text_document.uri,
            Some(lines),
        ))
    }

    async fn document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> Result<Option<DocumentSymbolResponse>> {
        let Some(content) = self.document_text(&params.text_document.uri) else {
            return Ok(None);
        };

        Ok(Some(DocumentSymbolResponse::Nested(document_symbols(&content))))
    }

    async fn folding_range(&self, params: FoldingRangeParams) -> Result<Option<Vec<FoldingRange>>> {
        let Some(content) = self.document_text(&params.text_document.uri) else {
            return Ok(None);
        };

        Ok(Some(folding_ranges(&content)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn open_documents(uri: &Uri, text: &str) -> DashMap<String, Document> {
        let documents = DashMap::new();
        documents.insert(uri.to_string(), Document::new(text, 1));
        documents
    }

    fn uri(path: &str) -> Uri {
        Uri::from_str(path).expect("valid uri")
    }

    fn range(start: (u32, u32), end: (u32, u32)) -> Range {
        Range {
            start: Position { line: start.0, character: start.1 },
            end: Position { line: end.0, character: end.1 },
        }
    }

    #[test]
    fn test_range_format_lines() {
        assert_eq!(range_format_lines(range((2, 4), (5, 3))), (2, 5));
        assert_eq!(range_format_lines(range((2, 0), (5, 0))), (2, 4));
        assert_eq!(range_format_lines(range((3, 0), (3, 0))), (3, 3));
    }

    #[test]
    fn test_format_document_unknown_uri() {
        let documents = open_documents(&uri("file:///tmp/open.rny"), "\tvar a");
        let edits = format_document(
            &documents,
            &FormatterEngine::new(),
            &uri("file:///tmp/closed.rny"),
            None,
        );
        assert!(edits.is_none());
    }

    #[test]
    fn test_format_document_returns_text_edits() {
        let file = uri("file:///tmp/build.rny");
        let documents = open_documents(&file, "target build {\n\trun test\n\t}\n");
        let edits = format_document(&documents, &FormatterEngine::new(), &file, None)
            .expect("document is open");

        assert_eq!(edits.len(), 2);
        assert_eq!(edits[0].new_text, " run test");
        assert_eq!(edits[0].range.start, Position { line: 1, character: 0 });
        assert_eq!(edits[0].range.end, Position { line: 1, character: 9 });
        assert_eq!(edits[1].new_text, " }");
    }

    #[test]
    fn test_format_document_nothing_to_change() {
        let file = uri("file:///tmp/empty.rny");
        let documents = open_documents(&file, "target build {\n");
        let edits = format_document(&documents, &FormatterEngine::new(), &file, None);
        assert_eq!(edits, Some(vec![]));
    }

    #[test]
    fn test_format_document_range() {
        let file = uri("file:///tmp/range.rny");
        let documents = open_documents(&file, "\tvar a\n\tvar b\n\tvar c\n");
        let lines = range_format_lines(range((1, 0), (2, 0)));
        let edits = format_document(&documents, &FormatterEngine::new(), &file, Some(lines))
            .expect("document is open");

        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].range.start.line, 1);
        assert_eq!(edits[0].new_text, " var b");
    }

    #[test]
    fn test_format_document_follows_incremental_edits() {
        let file = uri("file:///tmp/edit.rny");
        let documents = open_documents(&file, "a\u{2028}b\n\tvar x\n");
        if let Some(mut doc) = documents.get_mut(&file.to_string()) {
            doc.apply_change(TextDocumentContentChangeEvent {
                range: Some(range((1, 0), (1, 0))),
                range_length: None,
                text: "\t".to_string(),
            });
        }

        let edits = format_document(&documents, &FormatterEngine::new(), &file, None)
            .expect("document is open");
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].range.start.line, 1);
        assert_eq!(edits[0].new_text, "  var x");
    }
}
