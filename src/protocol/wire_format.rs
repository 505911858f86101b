//! Wire format encoding and parsing for the LSP framing header.
//!
//! Every message on the wire is framed HTTP-style:
//!
//! ```text
//! Content-Length: 52\r\n
//! \r\n
//! {"jsonrpc":"2.0","method":"initialized","params":{}}
//! ```
//!
//! The header block ends at the first blank line (`\r\n\r\n`). The field
//! name match is case-insensitive and the value is decimal. Other header
//! fields (e.g. `Content-Type`) may be present and are ignored.

use crate::error::{RelayError, Result};

/// Blank line terminating the header block.
pub const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Length of the header terminator in bytes.
pub const HEADER_TERMINATOR_LEN: usize = HEADER_TERMINATOR.len();

/// The one header field the relay interprets.
pub const CONTENT_LENGTH: &str = "content-length";

/// Default maximum body size (1 GB). A declared length above this is
/// treated as a protocol error rather than an allocation request.
pub const DEFAULT_MAX_BODY_SIZE: usize = 1_073_741_824;

/// Find the end of the header block in `buf`.
///
/// Returns the offset of the first byte of [`HEADER_TERMINATOR`], or
/// `None` if the block is still incomplete.
pub fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(HEADER_TERMINATOR_LEN)
        .position(|w| w == HEADER_TERMINATOR)
}

/// Parse the declared body length out of a header block.
///
/// `header` is the block up to (not including) the terminator. Lines are
/// split on `\r\n`; the first line whose field name matches
/// `Content-Length` case-insensitively wins.
///
/// # Errors
///
/// Returns [`RelayError::Protocol`] if no `Content-Length` field is
/// present or its value is not a decimal number. A header block without a
/// parsable length can never be resynchronized, so this is surfaced as a
/// hard error instead of silently stalling the stream.
pub fn parse_content_length(header: &[u8]) -> Result<usize> {
    let text = std::str::from_utf8(header)
        .map_err(|_| RelayError::Protocol("header block is not valid UTF-8".to_string()))?;

    for line in text.split("\r\n") {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if name.trim().eq_ignore_ascii_case(CONTENT_LENGTH) {
            return value.trim().parse::<usize>().map_err(|_| {
                RelayError::Protocol(format!("invalid Content-Length value: {:?}", value.trim()))
            });
        }
    }

    Err(RelayError::Protocol(
        "header block has no Content-Length field".to_string(),
    ))
}

/// Encode a framing header for a body of `body_len` bytes.
///
/// # Example
///
/// ```
/// use lsp_relay::protocol::encode_header;
///
/// assert_eq!(encode_header(5), "Content-Length: 5\r\n\r\n");
/// ```
pub fn encode_header(body_len: usize) -> String {
    format!("Content-Length: {}\r\n\r\n", body_len)
}
