//! Protocol module - LSP wire framing and incremental decoding.
//!
//! Implements the `Content-Length`-prefixed framing used on every LSP
//! stdio channel:
//! - header encode/parse (`wire_format`)
//! - incremental frame extraction from chunked reads (`MessageBuffer`)
//! - the opaque decoded `Message`

mod message;
mod message_buffer;
mod wire_format;

pub use message::Message;
pub use message_buffer::MessageBuffer;
pub use wire_format::{
    encode_header, find_header_end, parse_content_length, CONTENT_LENGTH, DEFAULT_MAX_BODY_SIZE,
    HEADER_TERMINATOR, HEADER_TERMINATOR_LEN,
};
