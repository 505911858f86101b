//! Environment configuration.
//!
//! The relay is spawned by an editor-side language client in place of the
//! real server, so all configuration travels through environment
//! variables:
//!
//! - `REAL_LSP_PATH` (required): path to the real server executable
//! - `REAL_LSP_ARGS` (optional): whitespace-separated server arguments
//! - `LSP_RELAY_TRACE` (optional): `off` | `full` | `summary`

use crate::error::{RelayError, Result};
use crate::trace::TraceMode;

/// Environment variable naming the real server executable.
pub const REAL_LSP_PATH: &str = "REAL_LSP_PATH";

/// Environment variable holding optional server arguments.
pub const REAL_LSP_ARGS: &str = "REAL_LSP_ARGS";

/// Environment variable selecting the trace mode.
pub const LSP_RELAY_TRACE: &str = "LSP_RELAY_TRACE";

/// Resolved relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Path to the real language server executable.
    pub server_path: String,
    /// Arguments passed to the server.
    pub server_args: Vec<String>,
    /// How much traffic to log.
    pub trace: TraceMode,
}

impl RelayConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Config`] if `REAL_LSP_PATH` is unset or
    /// `LSP_RELAY_TRACE` holds an unknown value. The caller must fail
    /// fast on this: no server process may be spawned from a broken
    /// configuration.
    pub fn from_env() -> Result<Self> {
        let server_path = std::env::var(REAL_LSP_PATH)
            .map_err(|_| RelayError::Config(format!("{} not set", REAL_LSP_PATH)))?;

        let server_args = std::env::var(REAL_LSP_ARGS)
            .map(|args| args.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        let trace = match std::env::var(LSP_RELAY_TRACE) {
            Ok(value) => TraceMode::parse(&value).ok_or_else(|| {
                RelayError::Config(format!(
                    "{} must be one of off, full, summary (got {:?})",
                    LSP_RELAY_TRACE, value
                ))
            })?,
            Err(_) => TraceMode::default(),
        };

        Ok(Self {
            server_path,
            server_args,
            trace,
        })
    }

    /// Build a configuration directly (tests, embedding).
    pub fn new(server_path: impl Into<String>) -> Self {
        Self {
            server_path: server_path.into(),
            server_args: Vec::new(),
            trace: TraceMode::Off,
        }
    }

    /// Set server arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.server_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set the trace mode.
    pub fn trace(mut self, trace: TraceMode) -> Self {
        self.trace = trace;
        self
    }
}
