//! Message buffer for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` for zero-copy buffer management.
//! Implements a state machine for handling fragmented frames:
//! - `AwaitingHeader`: scanning for the header terminator (`\r\n\r\n`)
//! - `AwaitingBody`: header parsed (and retained), need N more body bytes
//!
//! Reads from a pipe arrive in arbitrary chunks; chunk boundaries never
//! align with frame boundaries in general. The buffer holds exactly the
//! bytes received so far minus the frames already extracted, in arrival
//! order, and extraction never consumes bytes before the complete frame
//! (header and declared body) is present. The unconsumed remainder is
//! therefore always re-decodable on its own: re-framing the extracted
//! messages and appending the remainder reproduces an equivalent stream.
//!
//! # Example
//!
//! ```
//! use lsp_relay::protocol::MessageBuffer;
//!
//! let mut buffer = MessageBuffer::new();
//!
//! let messages = buffer.push(b"Content-Length: 5\r\n\r\nhello").unwrap();
//! assert_eq!(messages.len(), 1);
//! assert_eq!(messages[0].body(), b"hello");
//! ```

use bytes::BytesMut;

use super::message::Message;
use super::wire_format::{
    find_header_end, parse_content_length, DEFAULT_MAX_BODY_SIZE, HEADER_TERMINATOR_LEN,
};
use crate::error::{RelayError, Result};

/// State machine for frame parsing.
#[derive(Debug, Clone)]
enum State {
    /// Waiting for a complete header block (terminator not yet seen).
    AwaitingHeader,
    /// Header parsed but still buffered, waiting for the declared body.
    ///
    /// `header_len` is the header block plus terminator; nothing is
    /// consumed until `header_len + length` bytes are present, so the
    /// remainder of a partial frame always carries its header.
    AwaitingBody { header_len: usize, length: usize },
}

/// Buffer for accumulating incoming bytes and extracting complete messages.
///
/// One instance per traffic direction; never shared.
pub struct MessageBuffer {
    /// Accumulated bytes from stream reads.
    buffer: BytesMut,
    /// Current parsing state.
    state: State,
    /// Maximum allowed body size.
    max_body_size: usize,
}

impl MessageBuffer {
    /// Create a new message buffer with default settings.
    ///
    /// Default capacity: 64KB, max body: 1GB.
    pub fn new() -> Self {
        Self::with_max_body(DEFAULT_MAX_BODY_SIZE)
    }

    /// Create a new message buffer with a custom max body size.
    pub fn with_max_body(max_body_size: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(64 * 1024),
            state: State::AwaitingHeader,
            max_body_size,
        }
    }

    /// Push data into the buffer and extract all complete messages.
    ///
    /// This is the main API for processing incoming data. Returns every
    /// message completed by this chunk, in arrival order. Partial data is
    /// buffered internally for the next push. Pure with respect to I/O:
    /// no reads, no writes, no awaiting.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Protocol`] if a header block terminates
    /// without a parsable `Content-Length` field, or if the declared body
    /// length exceeds the maximum. Neither condition can be resynchronized
    /// from, so both are surfaced rather than wedging the stream.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Message>> {
        self.buffer.extend_from_slice(data);

        let mut messages = Vec::new();

        while let Some(message) = self.try_extract_one()? {
            messages.push(message);
        }

        Ok(messages)
    }

    /// Try to extract a single message from the buffer.
    ///
    /// Returns:
    /// - `Ok(Some(message))` if a complete frame was extracted
    /// - `Ok(None)` if more data is needed
    /// - `Err(...)` on an unrecoverable protocol violation
    fn try_extract_one(&mut self) -> Result<Option<Message>> {
        match self.state {
            State::AwaitingHeader => {
                let Some(header_end) = find_header_end(&self.buffer) else {
                    // Terminator not seen yet; everything stays buffered.
                    return Ok(None);
                };

                let length = parse_content_length(&self.buffer[..header_end])?;

                if length > self.max_body_size {
                    return Err(RelayError::Protocol(format!(
                        "declared body size {} exceeds maximum {}",
                        length, self.max_body_size
                    )));
                }

                // Cache the parsed header; consumption waits until the
                // whole frame is present.
                self.state = State::AwaitingBody {
                    header_len: header_end + HEADER_TERMINATOR_LEN,
                    length,
                };

                // The body may already be buffered.
                self.try_extract_one()
            }

            State::AwaitingBody { header_len, length } => {
                if self.buffer.len() < header_len + length {
                    return Ok(None);
                }

                // Frame fully present: discard the header, extract the
                // body (zero-copy freeze).
                let _ = self.buffer.split_to(header_len);
                let body = self.buffer.split_to(length).freeze();
                self.state = State::AwaitingHeader;

                Ok(Some(Message::new(body)))
            }
        }
    }

    /// Get the number of buffered (unconsumed) bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Get the unconsumed remainder.
    ///
    /// Always a strict suffix of the bytes pushed so far: either an
    /// incomplete header block, or a complete header whose declared body
    /// has not fully arrived. Re-framing the extracted messages and
    /// appending this remainder reproduces a stream that decodes
    /// identically, including the in-flight frame.
    pub fn remainder(&self) -> &[u8] {
        &self.buffer
    }

    /// Clear the buffer and reset state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::AwaitingHeader;
    }

    /// Get the current state for debugging.
    #[cfg(test)]
    fn state_name(&self) -> &'static str {
        match self.state {
            State::AwaitingHeader => "AwaitingHeader",
            State::AwaitingBody { .. } => "AwaitingBody",
        }
    }
}

impl Default for MessageBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper to frame a body the way the wire carries it.
    fn frame(body: &[u8]) -> Vec<u8> {
        let mut bytes = format!("Content-Length: {}\r\n\r\n", body.len()).into_bytes();
        bytes.extend_from_slice(body);
        bytes
    }

    #[test]
    fn test_single_complete_frame() {
        let mut buffer = MessageBuffer::new();

        let messages = buffer.push(&frame(b"hello")).unwrap();

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].body(), b"hello");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_spec_example_hello() {
        // Input bytes `Content-Length: 5\r\n\r\nhello` -> ["hello"], remainder "".
        let mut buffer = MessageBuffer::new();

        let messages = buffer.push(b"Content-Length: 5\r\n\r\nhello").unwrap();

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].body(), b"hello");
        assert_eq!(buffer.remainder(), b"");
    }

    #[test]
    fn test_header_then_body_in_two_chunks() {
        let mut buffer = MessageBuffer::new();

        let messages = buffer.push(b"Content-Length: 5\r\n\r\n").unwrap();
        assert!(messages.is_empty());
        // The full header stays buffered until the body arrives.
        assert_eq!(buffer.remainder(), b"Content-Length: 5\r\n\r\n");

        let messages = buffer.push(b"hello").unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].body(), b"hello");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_two_concatenated_frames() {
        let mut buffer = MessageBuffer::new();

        let messages = buffer
            .push(b"Content-Length: 2\r\n\r\nhiContent-Length: 2\r\n\r\nok")
            .unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].body(), b"hi");
        assert_eq!(messages[1].body(), b"ok");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_multiple_frames_in_one_push() {
        let mut buffer = MessageBuffer::new();

        let mut combined = Vec::new();
        combined.extend_from_slice(&frame(b"first"));
        combined.extend_from_slice(&frame(b"second"));
        combined.extend_from_slice(&frame(b"third"));

        let messages = buffer.push(&combined).unwrap();

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].body(), b"first");
        assert_eq!(messages[1].body(), b"second");
        assert_eq!(messages[2].body(), b"third");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_fragmented_header() {
        let mut buffer = MessageBuffer::new();
        let bytes = frame(b"test");

        let messages = buffer.push(&bytes[..7]).unwrap();
        assert!(messages.is_empty());
        assert_eq!(buffer.state_name(), "AwaitingHeader");

        let messages = buffer.push(&bytes[7..]).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].body(), b"test");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_fragmented_body() {
        let mut buffer = MessageBuffer::new();
        let body = b"this is a longer body that will be fragmented";
        let bytes = frame(body);

        // Header plus ten body bytes.
        let header_len = bytes.len() - body.len();
        let messages = buffer.push(&bytes[..header_len + 10]).unwrap();
        assert!(messages.is_empty());
        assert_eq!(buffer.state_name(), "AwaitingBody");

        let messages = buffer.push(&bytes[header_len + 10..]).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].body(), &body[..]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_complete_frame_then_partial() {
        let mut buffer = MessageBuffer::new();

        let mut data = frame(b"done");
        data.extend_from_slice(b"Content-Length: 10\r\n\r\npar");

        let messages = buffer.push(&data).unwrap();

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].body(), b"done");
        assert!(!buffer.is_empty());
        // The whole partial frame stays buffered, header included.
        assert_eq!(buffer.remainder(), b"Content-Length: 10\r\n\r\npar");
        assert_eq!(buffer.state_name(), "AwaitingBody");
    }

    #[test]
    fn test_empty_body_is_a_message() {
        let mut buffer = MessageBuffer::new();

        let messages = buffer.push(b"Content-Length: 0\r\n\r\n").unwrap();

        assert_eq!(messages.len(), 1);
        assert!(messages[0].is_empty());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_empty_body_between_frames() {
        let mut buffer = MessageBuffer::new();

        let mut data = frame(b"a");
        data.extend_from_slice(&frame(b""));
        data.extend_from_slice(&frame(b"b"));

        let messages = buffer.push(&data).unwrap();

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].body(), b"a");
        assert!(messages[1].is_empty());
        assert_eq!(messages[2].body(), b"b");
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut buffer = MessageBuffer::new();
        let bytes = frame(b"hi");

        let mut all = Vec::new();
        for byte in &bytes {
            all.extend(buffer.push(&[*byte]).unwrap());
        }

        assert_eq!(all.len(), 1);
        assert_eq!(all[0].body(), b"hi");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_case_insensitive_header() {
        let mut buffer = MessageBuffer::new();

        let messages = buffer.push(b"content-length: 3\r\n\r\nyes").unwrap();

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].body(), b"yes");
    }

    #[test]
    fn test_extra_header_fields_ignored() {
        let mut buffer = MessageBuffer::new();

        let data =
            b"Content-Type: application/vscode-jsonrpc; charset=utf-8\r\nContent-Length: 4\r\n\r\nbody";
        let messages = buffer.push(data).unwrap();

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].body(), b"body");
    }

    #[test]
    fn test_malformed_header_is_an_error() {
        let mut buffer = MessageBuffer::new();

        // Terminator present, no Content-Length field: unrecoverable.
        let result = buffer.push(b"Content-Type: application/json\r\n\r\n{}");

        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("no Content-Length"));
    }

    #[test]
    fn test_max_body_validation() {
        let mut buffer = MessageBuffer::with_max_body(100);

        let result = buffer.push(b"Content-Length: 1000\r\n\r\n");

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("exceeds maximum"));
    }

    #[test]
    fn test_reserialize_roundtrip() {
        // Re-framing extracted messages plus the remainder reproduces a
        // stream that decodes identically.
        let mut data = frame(b"alpha");
        data.extend_from_slice(&frame(b"beta"));
        data.extend_from_slice(b"Content-Length: 5\r\n\r\nga");

        let mut buffer = MessageBuffer::new();
        let messages = buffer.push(&data).unwrap();
        assert_eq!(messages.len(), 2);

        let mut rebuilt = Vec::new();
        for message in &messages {
            rebuilt.extend_from_slice(&message.to_wire());
        }
        rebuilt.extend_from_slice(buffer.remainder());

        let mut second = MessageBuffer::new();
        let replay = second.push(&rebuilt).unwrap();
        assert_eq!(replay, messages);
        assert_eq!(second.remainder(), buffer.remainder());

        // The in-flight frame survives the rebuild: feeding the rest of
        // its body to both decoders yields the same message.
        let completed = buffer.push(b"mma").unwrap();
        let replay_completed = second.push(b"mma").unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].body(), b"gamma");
        assert_eq!(replay_completed, completed);
    }

    #[test]
    fn test_remainder_of_partial_frame_is_decodable() {
        let mut buffer = MessageBuffer::new();

        // Header only: nothing is consumed yet.
        let messages = buffer.push(b"Content-Length: 5\r\n\r\nhel").unwrap();
        assert!(messages.is_empty());
        assert_eq!(buffer.remainder(), b"Content-Length: 5\r\n\r\nhel");

        // A fresh decoder seeded with the remainder continues correctly.
        let mut resumed = MessageBuffer::new();
        let mut seed = buffer.remainder().to_vec();
        seed.extend_from_slice(b"lo");
        let messages = resumed.push(&seed).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].body(), b"hello");
    }

    #[test]
    fn test_clear_resets_state() {
        let mut buffer = MessageBuffer::new();

        buffer.push(b"Content-Length: 10\r\n\r\npart").unwrap();
        assert_eq!(buffer.state_name(), "AwaitingBody");
        assert!(!buffer.is_empty());

        buffer.clear();

        assert_eq!(buffer.state_name(), "AwaitingHeader");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_large_body() {
        let mut buffer = MessageBuffer::new();
        let body = vec![b'x'; 1024 * 1024]; // 1MB

        let messages = buffer.push(&frame(&body)).unwrap();

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].len(), 1024 * 1024);
    }

    #[test]
    fn test_malformed_header_is_not_consumed() {
        let mut buffer = MessageBuffer::new();

        // Validation happens before any bytes are consumed, so the
        // offending header block stays in the buffer.
        let data = b"NoLength: here\r\n\r\n{}";
        let result = buffer.push(data);

        assert!(result.is_err());
        assert_eq!(buffer.remainder(), data);
    }
}
