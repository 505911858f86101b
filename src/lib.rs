//! # lsp-relay
//!
//! Debug relay for Language Server Protocol traffic over stdio.
//!
//! An editor-side language client spawns this binary instead of the real
//! language server. The relay spawns the real server as its own child
//! (path from `REAL_LSP_PATH`), forwards every message unchanged in both
//! directions, and traces traffic to stderr for inspection.
//!
//! ## Architecture
//!
//! - **Frame decoder** ([`protocol::MessageBuffer`]): turns arbitrarily
//!   chunked reads into complete `Content-Length`-framed messages
//! - **Relay** ([`Relay`]): two independent decode loops, one per
//!   direction, each re-framing messages for the opposite endpoint
//! - **Tap** ([`trace::TraceMode`]): observation hook logging traffic
//!   without ever altering it
//!
//! ## Example
//!
//! ```ignore
//! use lsp_relay::{Relay, RelayConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RelayConfig::from_env()?;
//!     let relay = Relay::spawn(&config)?;
//!     let status = relay.run(tokio::io::stdin(), tokio::io::stdout()).await?;
//!     std::process::exit(status.code().unwrap_or(0));
//! }
//! ```

pub mod config;
pub mod error;
pub mod process;
pub mod protocol;
pub mod trace;

mod relay;
mod writer;

pub use config::RelayConfig;
pub use error::{RelayError, Result};
pub use relay::{Relay, RelayBuilder};
pub use writer::{spawn_writer_task, OutboundMessage, WriterHandle};
