//! runny-lsp - Language Server for runny (`.rny`) task files
//!
//! # How this works
//!
//! 1. This binary is started by the editor for the `rny` language id
//! 2. Communication happens over stdin/stdout using JSON-RPC
//! 3. The editor sends requests (initialize, textDocument/formatting, etc.)
//! 4. We respond with results or send notifications (diagnostics)
//!
//! stdout carries the protocol, so all logging goes to stderr through
//! `tracing`.

mod server;

use tower_lsp::{LspService, Server};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // RUST_LOG=runny_lsp=debug,runny_analyzer=debug for verbose output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Starting runny-lsp server");

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::build(server::RunnyLanguageServer::new).finish();

    Server::new(stdin, stdout, socket).serve(service).await;

    tracing::info!("runny-lsp server stopped");
}
