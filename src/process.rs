//! Child server process handle.
//!
//! The relay spawns the real language server with stdin/stdout piped and
//! stderr inherited. Inheriting stderr forwards the server's diagnostics
//! to the relay's own stderr verbatim, keeping them out of the protocol
//! stream without any copying loop.

use std::process::{ExitStatus, Stdio};

use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use crate::error::{RelayError, Result};

/// Handle to the spawned language server process.
///
/// Created at relay startup, torn down via [`ServerProcess::shutdown`]
/// when the upstream input closes. No zombie survives the relay: shutdown
/// always reaps the child, killing it first if it has not exited on its
/// own.
pub struct ServerProcess {
    child: Child,
}

impl ServerProcess {
    /// Spawn the server executable.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Io`] if the executable cannot be started.
    pub fn spawn(path: &str, args: &[String]) -> Result<Self> {
        let child = Command::new(path)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;

        tracing::debug!(path, pid = child.id(), "spawned language server");

        Ok(Self { child })
    }

    /// Take the child's stdin (write side). Can only be taken once.
    pub fn take_stdin(&mut self) -> Result<ChildStdin> {
        self.child
            .stdin
            .take()
            .ok_or_else(|| RelayError::Protocol("child stdin already taken".to_string()))
    }

    /// Take the child's stdout (read side). Can only be taken once.
    pub fn take_stdout(&mut self) -> Result<ChildStdout> {
        self.child
            .stdout
            .take()
            .ok_or_else(|| RelayError::Protocol("child stdout already taken".to_string()))
    }

    /// OS process id, if the child is still running.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Terminate the child and reap it.
    ///
    /// If the child already exited (its stdin was closed beforehand and
    /// well-behaved servers exit on end-of-input), this just collects the
    /// status. Otherwise the child is killed first. Consumes the handle,
    /// so termination happens at most once.
    pub async fn shutdown(mut self) -> Result<ExitStatus> {
        if let Some(status) = self.child.try_wait()? {
            tracing::debug!(%status, "language server already exited");
            return Ok(status);
        }

        tracing::debug!(pid = self.child.id(), "killing language server");
        self.child.start_kill()?;
        let status = self.child.wait().await?;
        Ok(status)
    }

    /// Wait for the child to exit on its own.
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        Ok(self.child.wait().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[cfg(unix)]
    async fn test_spawn_and_shutdown_running_child() {
        // `sleep` never exits on its own; shutdown must kill it.
        let process = ServerProcess::spawn("sleep", &["30".to_string()]).unwrap();
        assert!(process.id().is_some());

        let status = process.shutdown().await.unwrap();
        assert!(!status.success());
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_shutdown_after_voluntary_exit() {
        let mut process = ServerProcess::spawn("true", &[]).unwrap();

        // Let it exit on its own first.
        let status = process.wait().await.unwrap();
        assert!(status.success());

        let status = process.shutdown().await.unwrap();
        assert!(status.success());
    }

    #[test]
    fn test_spawn_missing_executable() {
        let result = ServerProcess::spawn("/nonexistent/lsp-server-binary", &[]);
        assert!(matches!(result, Err(RelayError::Io(_))));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_stdio_can_only_be_taken_once() {
        let mut process = ServerProcess::spawn("cat", &[]).unwrap();

        assert!(process.take_stdin().is_ok());
        assert!(process.take_stdin().is_err());
        assert!(process.take_stdout().is_ok());
        assert!(process.take_stdout().is_err());

        let _ = process.shutdown().await.unwrap();
    }
}
