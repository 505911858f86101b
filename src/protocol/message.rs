//! Decoded message type.
//!
//! A [`Message`] is an opaque body extracted from the wire — in practice a
//! complete JSON-RPC document, but the relay never validates that. Uses
//! `bytes::Bytes` so forwarding a body is zero-copy.

use bytes::Bytes;
use serde::Deserialize;

use super::wire_format::encode_header;

/// One complete message extracted from a framed stream.
///
/// Immutable once extracted; the relay forwards the body verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    body: Bytes,
}

/// Minimal shape for peeking at a JSON-RPC envelope.
#[derive(Deserialize)]
struct Envelope {
    method: Option<String>,
    id: Option<serde_json::Value>,
}

impl Message {
    /// Create a message from an extracted body.
    pub fn new(body: Bytes) -> Self {
        Self { body }
    }

    /// Create a message from raw bytes (copies data).
    pub fn from_bytes(body: &[u8]) -> Self {
        Self {
            body: Bytes::copy_from_slice(body),
        }
    }

    /// Body length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.body.len()
    }

    /// Check if the body is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Get a reference to the body bytes.
    #[inline]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Get a clone of the body as `Bytes` (cheap, zero-copy).
    #[inline]
    pub fn body_bytes(&self) -> Bytes {
        self.body.clone()
    }

    /// Best-effort peek at the JSON-RPC `method` field.
    ///
    /// Returns `None` for responses (no `method`) and for bodies that are
    /// not valid JSON. Used only for trace output, never for routing.
    pub fn method(&self) -> Option<String> {
        serde_json::from_slice::<Envelope>(&self.body)
            .ok()
            .and_then(|e| e.method)
    }

    /// Best-effort peek at the JSON-RPC `id` field.
    pub fn id(&self) -> Option<serde_json::Value> {
        serde_json::from_slice::<Envelope>(&self.body)
            .ok()
            .and_then(|e| e.id)
    }

    /// Serialize with a freshly computed framing header.
    ///
    /// The declared length is the byte length of the body, which keeps the
    /// framing correct for multi-byte UTF-8 content.
    pub fn to_wire(&self) -> Vec<u8> {
        let header = encode_header(self.body.len());
        let mut buf = Vec::with_capacity(header.len() + self.body.len());
        buf.extend_from_slice(header.as_bytes());
        buf.extend_from_slice(&self.body);
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_accessors() {
        let msg = Message::from_bytes(b"hello");
        assert_eq!(msg.len(), 5);
        assert!(!msg.is_empty());
        assert_eq!(msg.body(), b"hello");
    }

    #[test]
    fn test_empty_message() {
        let msg = Message::new(Bytes::new());
        assert_eq!(msg.len(), 0);
        assert!(msg.is_empty());
    }

    #[test]
    fn test_body_bytes_zero_copy() {
        let original = Bytes::from_static(b"payload");
        let msg = Message::new(original.clone());

        let cloned = msg.body_bytes();
        assert_eq!(cloned.as_ptr(), original.as_ptr());
    }

    #[test]
    fn test_method_peek() {
        let msg = Message::from_bytes(br#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#);
        assert_eq!(msg.method().as_deref(), Some("initialize"));
        assert_eq!(msg.id(), Some(serde_json::json!(1)));
    }

    #[test]
    fn test_method_peek_response() {
        // Responses carry no method field.
        let msg = Message::from_bytes(br#"{"jsonrpc":"2.0","id":1,"result":{}}"#);
        assert_eq!(msg.method(), None);
    }

    #[test]
    fn test_method_peek_not_json() {
        let msg = Message::from_bytes(b"definitely not json");
        assert_eq!(msg.method(), None);
        assert_eq!(msg.id(), None);
    }

    #[test]
    fn test_to_wire() {
        let msg = Message::from_bytes(b"hello");
        assert_eq!(msg.to_wire(), b"Content-Length: 5\r\n\r\nhello");
    }

    #[test]
    fn test_to_wire_counts_bytes_not_chars() {
        // "héllo" is 5 characters but 6 bytes.
        let msg = Message::from_bytes("héllo".as_bytes());
        let wire = msg.to_wire();
        assert!(wire.starts_with(b"Content-Length: 6\r\n\r\n"));
    }

    #[test]
    fn test_to_wire_empty_body() {
        let msg = Message::new(Bytes::new());
        assert_eq!(msg.to_wire(), b"Content-Length: 0\r\n\r\n");
    }
}
