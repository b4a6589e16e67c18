//! Emulator process lifecycle and pipe ownership.

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::client::ClientConfig;
use crate::error::{Result, Tn3270Error};

/// Boxed write half of an emulator transport.
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;
/// Boxed read half of an emulator transport.
pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// Connection state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No emulator process or streams.
    Disconnected,
    /// Emulator running, no host session.
    Ready,
    /// A `Connect` exchange succeeded.
    Connected,
}

/// The live binding to one emulator process and its streams.
///
/// Owned by a [`Client`](crate::Client) behind its exchange lock; every
/// method here assumes the caller holds that lock.
#[derive(Default)]
pub struct Session {
    /// Child process, absent for attached transports.
    child: Option<Child>,
    /// Emulator stdin.
    writer: Option<BoxedWriter>,
    /// Buffered emulator stdout.
    reader: Option<BufReader<BoxedReader>>,
    /// True between a successful connect and teardown.
    connected: bool,
}

impl Session {
    /// Create an empty, unstarted session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session bound to already-open streams.
    pub fn attached(reader: BoxedReader, writer: BoxedWriter) -> Self {
        Self {
            child: None,
            writer: Some(writer),
            reader: Some(BufReader::new(reader)),
            connected: false,
        }
    }

    /// Whether streams are available for an exchange.
    pub fn is_started(&self) -> bool {
        self.writer.is_some() && self.reader.is_some()
    }

    /// Whether a host session is open.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub(crate) fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        if !self.is_started() {
            SessionState::Disconnected
        } else if self.connected {
            SessionState::Connected
        } else {
            SessionState::Ready
        }
    }

    /// Process id of the spawned emulator, if any.
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    /// Spawn the emulator unless the session already has streams.
    pub fn ensure_started(&mut self, config: &ClientConfig) -> Result<()> {
        if self.is_started() {
            return Ok(());
        }

        let mut cmd = Command::new(&config.program);
        cmd.args(&config.args);
        for (key, value) in &config.env {
            cmd.env(key, value);
        }
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| Tn3270Error::Spawn(format!("{}: {e}", config.program)))?;

        // On any failure below `child` is dropped and killed.
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Tn3270Error::Spawn("failed to create stdin pipe".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Tn3270Error::Spawn("failed to create stdout pipe".to_string()))?;

        info!(program = %config.program, pid = ?child.id(), "started emulator");

        let writer: BoxedWriter = Box::new(stdin);
        let reader: BoxedReader = Box::new(stdout);
        self.writer = Some(writer);
        self.reader = Some(BufReader::new(reader));
        self.child = Some(child);
        Ok(())
    }

    /// Write one command line and flush.
    pub(crate) async fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotConnected))?;

        let mut bytes = Vec::with_capacity(line.len() + 1);
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(b'\n');
        writer.write_all(&bytes).await?;
        writer.flush().await
    }

    /// Read one line; `Ok(None)` at end of stream.
    ///
    /// Screen text may carry non-UTF-8 bytes (Latin-1 from the host); those
    /// are replaced rather than failing the read.
    pub(crate) async fn read_line(&mut self) -> std::io::Result<Option<String>> {
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotConnected))?;

        let mut buf = Vec::new();
        let n = reader.read_until(b'\n', &mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }

    /// Close the streams, kill and reap the process, reset all state.
    ///
    /// Every step is best effort; the session always ends disconnected.
    pub async fn teardown(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.shutdown().await {
                debug!(error = %e, "closing emulator stdin");
            }
        }
        self.reader = None;

        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill().await {
                // kill() also reaps; fall back to wait() for an already-dead child.
                debug!(error = %e, "killing emulator");
                if let Err(e) = child.wait().await {
                    warn!(error = %e, "reaping emulator");
                }
            }
        }

        self.connected = false;
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("pid", &self.pid())
            .field("started", &self.is_started())
            .field("connected", &self.connected)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_disconnected() {
        let session = Session::new();
        assert!(!session.is_started());
        assert!(!session.is_connected());
        assert_eq!(session.state(), SessionState::Disconnected);
        assert_eq!(session.pid(), None);
    }

    #[tokio::test]
    async fn test_teardown_is_idempotent() {
        let mut session = Session::new();
        session.teardown().await;
        session.teardown().await;
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn test_attached_session_state() {
        let (client, _server) = tokio::io::duplex(64);
        let (r, w) = tokio::io::split(client);
        let mut session = Session::attached(Box::new(r), Box::new(w));
        assert_eq!(session.state(), SessionState::Ready);

        session.set_connected(true);
        assert_eq!(session.state(), SessionState::Connected);

        session.teardown().await;
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn test_read_line_replaces_invalid_utf8() {
        let (client, mut server) = tokio::io::duplex(64);
        let (r, w) = tokio::io::split(client);
        let mut session = Session::attached(Box::new(r), Box::new(w));

        server.write_all(b"data: CAF\xc9\nok\n").await.unwrap();
        assert_eq!(
            session.read_line().await.unwrap().as_deref(),
            Some("data: CAF\u{fffd}\n")
        );
        assert_eq!(session.read_line().await.unwrap().as_deref(), Some("ok\n"));
    }

    #[tokio::test]
    async fn test_spawn_failure_leaves_session_empty() {
        let config = ClientConfig {
            program: "/nonexistent/tn3270wright-s3270".to_string(),
            ..ClientConfig::default()
        };
        let mut session = Session::new();
        let err = session.ensure_started(&config).unwrap_err();
        assert!(matches!(err, Tn3270Error::Spawn(_)));
        assert!(!session.is_started());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_spawn_and_teardown_real_process() {
        let config = ClientConfig {
            program: "cat".to_string(),
            ..ClientConfig::default()
        };
        let mut session = Session::new();
        session.ensure_started(&config).unwrap();
        let pid = session.pid();
        assert!(pid.is_some());

        // Second call is a no-op.
        session.ensure_started(&config).unwrap();
        assert_eq!(session.pid(), pid);

        session.write_line("hello").await.unwrap();
        assert_eq!(session.read_line().await.unwrap().as_deref(), Some("hello\n"));

        session.teardown().await;
        assert!(!session.is_started());
        assert_eq!(session.pid(), None);
    }
}
