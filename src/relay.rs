//! Bidirectional relay between an editor client and the real server.
//!
//! The relay sits on the editor's stdio, spawns the real language server
//! as its child, and pumps two independent directions:
//!
//! ```text
//! editor ──stdin──► decode ──► tap ──► re-frame ──► server stdin
//! editor ◄─stdout── re-frame ◄── tap ◄── decode ◄── server stdout
//! ```
//!
//! Each direction owns its own [`MessageBuffer`]; messages are forwarded
//! in strict arrival order within a direction, with no ordering coupling
//! between directions. Bodies pass through byte-for-byte — the tap only
//! logs.
//!
//! Shutdown: when the upstream input closes — or either direction fails
//! on a protocol error — the child's stdin is closed and the child is
//! killed if it does not exit, so no orphaned server survives the relay
//! and no direction is ever left silently wedged.

use std::process::ExitStatus;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};

use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::process::ServerProcess;
use crate::protocol::{MessageBuffer, DEFAULT_MAX_BODY_SIZE};
use crate::trace::{Direction, TraceMode};
use crate::writer::{spawn_writer_task, OutboundMessage, WriterHandle};

/// How long an exiting server gets between stdin close and the kill.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Builder for a [`Relay`].
pub struct RelayBuilder {
    trace: TraceMode,
    max_body_size: usize,
}

impl RelayBuilder {
    /// Create a builder with defaults (no tracing, 1GB body limit).
    pub fn new() -> Self {
        Self {
            trace: TraceMode::Off,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }

    /// Set the trace mode for both directions.
    pub fn trace(mut self, trace: TraceMode) -> Self {
        self.trace = trace;
        self
    }

    /// Set the maximum accepted body size.
    pub fn max_body_size(mut self, max_body_size: usize) -> Self {
        self.max_body_size = max_body_size;
        self
    }

    /// Spawn the server process described by `config` and build the relay.
    pub fn spawn(self, config: &RelayConfig) -> Result<Relay> {
        let process = ServerProcess::spawn(&config.server_path, &config.server_args)?;
        Ok(Relay {
            process,
            trace: self.trace,
            max_body_size: self.max_body_size,
        })
    }
}

impl Default for RelayBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A relay with a running server process, ready to pump traffic.
pub struct Relay {
    process: ServerProcess,
    trace: TraceMode,
    max_body_size: usize,
}

impl Relay {
    /// Create a relay builder.
    pub fn builder() -> RelayBuilder {
        RelayBuilder::new()
    }

    /// Spawn a relay from a configuration, taking the trace mode from it.
    pub fn spawn(config: &RelayConfig) -> Result<Self> {
        Self::builder().trace(config.trace).spawn(config)
    }

    /// Pump traffic between the upstream streams and the server process.
    ///
    /// `upstream_in`/`upstream_out` are the relay's own stdio when run
    /// under an editor; tests drive them with in-memory streams. Either
    /// direction ending — upstream EOF, server exit, or a protocol error
    /// — triggers the same teardown: close the server's stdin, wait out
    /// the grace, kill whatever is left. Returns the server's exit status
    /// once all forwarded output has been flushed.
    pub async fn run<R, W>(mut self, upstream_in: R, upstream_out: W) -> Result<ExitStatus>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let server_stdin = self.process.take_stdin()?;
        let server_stdout = self.process.take_stdout()?;

        let (to_server, to_server_task) = spawn_writer_task(server_stdin);
        let (to_client, to_client_task) = spawn_writer_task(upstream_out);

        let mut inbound = tokio::spawn(pump(
            upstream_in,
            to_server,
            self.trace,
            Direction::ToServer,
            self.max_body_size,
        ));
        let mut outbound = tokio::spawn(pump(
            server_stdout,
            to_client,
            self.trace,
            Direction::FromServer,
            self.max_body_size,
        ));

        // Whichever direction ends first starts the shutdown.
        let outbound_finished = tokio::select! {
            result = &mut inbound => {
                report_pump(Direction::ToServer, result);
                false
            }
            result = &mut outbound => {
                report_pump(Direction::FromServer, result);
                // Stop consuming upstream input; dropping the aborted
                // pump also drops its handle to the server's stdin.
                inbound.abort();
                let _ = inbound.await;
                true
            }
        };

        // All senders to the server's stdin are gone; its writer task
        // drains and shuts the stdin down, signalling end-of-input.
        if let Err(e) = to_server_task.await.map_err(RelayError::from)? {
            tracing::debug!("server stdin writer ended with: {}", e);
        }

        // Well-behaved servers exit on end-of-input; give them a bounded
        // grace to flush, then kill whatever is left.
        let status = match tokio::time::timeout(SHUTDOWN_GRACE, self.process.wait()).await {
            Ok(status) => status?,
            Err(_) => self.process.shutdown().await?,
        };
        tracing::debug!(%status, "language server terminated");

        // With the child gone its stdout is closed, so the outbound pump
        // finishes on its own.
        if !outbound_finished {
            report_pump(Direction::FromServer, outbound.await);
        }

        // Everything the outbound pump forwarded is now queued; wait for
        // the upstream writer to drain it so no trailing response is lost
        // when the caller exits.
        if let Err(e) = to_client_task.await.map_err(RelayError::from)? {
            tracing::debug!("client output writer ended with: {}", e);
        }

        Ok(status)
    }
}

/// Log how a pump loop ended.
///
/// EOF and cancellation are routine; a closed destination means the
/// opposite endpoint went away first, which is a normal way for
/// forwarding to stop. Only protocol and I/O failures are errors.
fn report_pump(
    direction: Direction,
    result: std::result::Result<Result<()>, tokio::task::JoinError>,
) {
    match result {
        Ok(Ok(())) => {}
        Ok(Err(RelayError::ChannelClosed)) => {
            tracing::debug!("{}: destination closed before input ended", direction)
        }
        Ok(Err(e)) => tracing::error!("{} pump failed: {}", direction, e),
        Err(e) if e.is_cancelled() => {}
        Err(e) => tracing::error!("{} pump panicked: {}", direction, e),
    }
}

/// Decode loop for one direction.
///
/// Reads raw chunks, feeds them through the direction's own
/// [`MessageBuffer`], and hands every completed message to the tap and
/// then the destination writer. Ends cleanly on EOF; propagates protocol
/// errors and a closed destination.
async fn pump<R>(
    mut reader: R,
    writer: WriterHandle,
    trace: TraceMode,
    direction: Direction,
    max_body_size: usize,
) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = MessageBuffer::with_max_body(max_body_size);
    let mut chunk = vec![0u8; 64 * 1024];

    loop {
        let n = match reader.read(&mut chunk).await {
            Ok(0) => {
                tracing::debug!("{}: input closed", direction);
                return Ok(());
            }
            Ok(n) => n,
            Err(e) => return Err(RelayError::Io(e)),
        };

        let messages = buffer.push(&chunk[..n])?;

        for message in messages {
            trace.observe(direction, &message);
            writer.send(OutboundMessage::new(&message)).await?;
        }
    }
}
