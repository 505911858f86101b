//! Observation hook for messages in transit.
//!
//! The relay never alters a message; the tap only decides what gets
//! logged about it. One relay parameterized by [`TraceMode`] replaces
//! separate verbose/quiet relay variants.
//!
//! All trace output goes through `tracing`, which the binary routes to
//! stderr. Stdout is reserved for protocol bytes.

use std::fmt;

use crate::protocol::Message;

/// Direction of a message relative to the real server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Editor client to server.
    ToServer,
    /// Server to editor client.
    FromServer,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::ToServer => write!(f, "client -> server"),
            Direction::FromServer => write!(f, "server -> client"),
        }
    }
}

/// How much of the traffic to log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraceMode {
    /// Pure passthrough, no logging.
    Off,
    /// Log every message body.
    #[default]
    Full,
    /// Log every message, but elide well-known high-volume payloads
    /// (the `initialize` handshake) down to a short marker.
    Summary,
}

impl TraceMode {
    /// Parse a mode from its configuration value.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "off" => Some(TraceMode::Off),
            "full" => Some(TraceMode::Full),
            "summary" => Some(TraceMode::Summary),
            _ => None,
        }
    }

    /// Observe one message in transit.
    pub fn observe(&self, direction: Direction, message: &Message) {
        match self {
            TraceMode::Off => {}
            TraceMode::Full => {
                tracing::info!(
                    target: "lsp_relay::traffic",
                    "{}: {}",
                    direction,
                    String::from_utf8_lossy(message.body()),
                );
            }
            TraceMode::Summary => {
                tracing::info!(
                    target: "lsp_relay::traffic",
                    "{}: {}",
                    direction,
                    summarize(direction, message),
                );
            }
        }
    }
}

/// Render a message for summary-mode tracing.
///
/// The `initialize` request and its result dominate trace volume (full
/// client/server capability trees), so both collapse to a marker with the
/// byte length. Everything else is logged verbatim.
fn summarize(direction: Direction, message: &Message) -> String {
    match message.method().as_deref() {
        Some("initialize") => format!("<initialize request, {} bytes>", message.len()),
        Some(_) => String::from_utf8_lossy(message.body()).into_owned(),
        None => {
            // Responses carry no method. The first server->client response
            // of a session is the initialize result.
            if direction == Direction::FromServer && looks_like_initialize_result(message) {
                format!("<initialize result, {} bytes>", message.len())
            } else {
                String::from_utf8_lossy(message.body()).into_owned()
            }
        }
    }
}

/// Check whether a response body is an `initialize` result.
fn looks_like_initialize_result(message: &Message) -> bool {
    #[derive(serde::Deserialize)]
    struct InitResult {
        capabilities: serde_json::Value,
    }
    #[derive(serde::Deserialize)]
    struct Response {
        result: Option<InitResult>,
    }

    serde_json::from_slice::<Response>(message.body())
        .map(|r| r.result.is_some())
        .unwrap_or(false)
}
