//! lsp-relay binary.
//!
//! Sits between an editor's language client and the real language server,
//! forwarding stdio-framed LSP traffic in both directions and tracing it
//! to stderr.
//!
//! Stdin/stdout carry protocol bytes, so all logging goes to stderr via
//! `tracing`. Exits with code 1 on a configuration error (before any
//! server process is spawned); otherwise follows the server's exit
//! status.

use lsp_relay::{Relay, RelayConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match RelayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        server = %config.server_path,
        trace = ?config.trace,
        "starting lsp-relay"
    );

    let relay = match Relay::spawn(&config) {
        Ok(relay) => relay,
        Err(e) => {
            tracing::error!("failed to spawn language server: {}", e);
            std::process::exit(1);
        }
    };

    match relay.run(tokio::io::stdin(), tokio::io::stdout()).await {
        Ok(status) => {
            tracing::info!(%status, "language server exited");
            std::process::exit(status.code().unwrap_or(0));
        }
        Err(e) => {
            tracing::error!("relay failed: {}", e);
            std::process::exit(1);
        }
    }
}
