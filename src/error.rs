//! Error types for lsp-relay.

use thiserror::Error;

/// Main error type for all relay operations.
#[derive(Debug, Error)]
pub enum RelayError {
    /// I/O error during stdio/process operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error while peeking into a message body for tracing.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Protocol error (malformed header, oversized body, etc.).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Configuration error (missing or invalid environment value).
    #[error("Configuration error: {0}")]
    Config(String),

    /// The destination writer is gone (typically the child process died).
    #[error("Channel closed")]
    ChannelClosed,

    /// A relay task panicked or was cancelled.
    #[error("Task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Result type alias using RelayError.
pub type Result<T> = std::result::Result<T, RelayError>;
