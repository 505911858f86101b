//! Dedicated writer task per forwarding destination.
//!
//! Each direction of the relay writes through its own task that receives
//! framed messages via an mpsc channel. The decode loops stay pure: they
//! hand a message to the channel and move on, while the writer task owns
//! the destination and batches ready messages into vectored writes.
//!
//! ```text
//! decode loop ──► mpsc::Sender<OutboundMessage> ──► writer task ──► pipe
//! ```
//!
//! When the channel closes, the task shuts the destination down before
//! exiting. For the child's stdin this is the end-of-input signal the
//! server sees during relay shutdown.

use std::io::IoSlice;

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{RelayError, Result};
use crate::protocol::{encode_header, Message};

/// Default channel capacity per destination.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Maximum messages to batch in a single write operation.
const MAX_BATCH_SIZE: usize = 32;

/// A framed message ready to be written to a destination.
#[derive(Debug)]
pub struct OutboundMessage {
    /// Freshly generated framing header.
    header: String,
    /// Body bytes, forwarded verbatim.
    body: Bytes,
}

impl OutboundMessage {
    /// Frame a decoded message for the wire.
    ///
    /// The header declares the byte length of the body.
    pub fn new(message: &Message) -> Self {
        Self {
            header: encode_header(message.len()),
            body: message.body_bytes(),
        }
    }

    /// Total size on the wire (header + body).
    #[inline]
    pub fn size(&self) -> usize {
        self.header.len() + self.body.len()
    }
}

/// Handle for sending messages to a writer task.
///
/// Cheaply cloneable. Dropping every handle closes the channel and shuts
/// the destination down.
#[derive(Clone)]
pub struct WriterHandle {
    tx: mpsc::Sender<OutboundMessage>,
}

impl WriterHandle {
    /// Send a framed message to the writer task.
    ///
    /// Waits for channel capacity; the channel is the only backpressure
    /// the relay applies, everything further down is the transport's
    /// concern.
    pub async fn send(&self, message: OutboundMessage) -> Result<()> {
        self.tx
            .send(message)
            .await
            .map_err(|_| RelayError::ChannelClosed)
    }
}

/// Spawn a writer task for a destination and return a handle for it.
pub fn spawn_writer_task<W>(writer: W) -> (WriterHandle, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    spawn_writer_task_with_capacity(writer, DEFAULT_CHANNEL_CAPACITY)
}

/// Spawn a writer task with a custom channel capacity.
pub fn spawn_writer_task_with_capacity<W>(
    writer: W,
    capacity: usize,
) -> (WriterHandle, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(capacity);
    let task = tokio::spawn(writer_loop(rx, writer));
    (WriterHandle { tx }, task)
}

/// Main writer loop - receives framed messages and writes them out.
async fn writer_loop<W>(mut rx: mpsc::Receiver<OutboundMessage>, mut writer: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    loop {
        let first = match rx.recv().await {
            Some(m) => m,
            None => {
                // Channel closed: signal end-of-input to the destination.
                writer.shutdown().await?;
                return Ok(());
            }
        };

        let mut batch = Vec::with_capacity(MAX_BATCH_SIZE);
        batch.push(first);

        while batch.len() < MAX_BATCH_SIZE {
            match rx.try_recv() {
                Ok(message) => batch.push(message),
                Err(_) => break,
            }
        }

        write_batch(&mut writer, &batch).await?;
    }
}

/// Write a batch of framed messages using vectored I/O.
///
/// Each message contributes two slices (header, body unless empty).
/// Handles partial writes by rebuilding the slice list for the remaining
/// bytes.
async fn write_batch<W>(writer: &mut W, batch: &[OutboundMessage]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    if batch.is_empty() {
        return Ok(());
    }

    let total_size: usize = batch.iter().map(|m| m.size()).sum();
    let mut total_written = 0;

    while total_written < total_size {
        let slices = build_remaining_slices(batch, total_written);
        if slices.is_empty() {
            break;
        }

        let written = writer.write_vectored(&slices).await?;
        if written == 0 {
            return Err(RelayError::Io(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                "write_vectored returned 0",
            )));
        }

        total_written += written;
    }

    writer.flush().await?;
    Ok(())
}

/// Build the IoSlice array for everything after the first `skip_bytes`.
fn build_remaining_slices(batch: &[OutboundMessage], skip_bytes: usize) -> Vec<IoSlice<'_>> {
    let mut slices = Vec::with_capacity(batch.len() * 2);
    let mut offset = 0;

    for message in batch {
        let header = message.header.as_bytes();
        if skip_bytes < offset + header.len() {
            let start = skip_bytes.saturating_sub(offset);
            slices.push(IoSlice::new(&header[start..]));
        }
        offset += header.len();

        if !message.body.is_empty() {
            if skip_bytes < offset + message.body.len() {
                let start = skip_bytes.saturating_sub(offset);
                slices.push(IoSlice::new(&message.body[start..]));
            }
            offset += message.body.len();
        }
    }

    slices
}
