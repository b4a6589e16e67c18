//! The s3270 client: command exchange, command vocabulary and waits.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::error::{Result, Tn3270Error};
use crate::input::{self, Key};
use crate::output;
use crate::protocol::{Command, ReplyBuffer, ReplyLine};
use crate::screen::Screen;
use crate::session::{BoxedReader, BoxedWriter, Session, SessionState};
use crate::wait::{DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT, WaitBuilder, WaitCondition};

/// Emulator binary launched when nothing else is configured.
pub const DEFAULT_PROGRAM: &str = "s3270";

/// Environment variable overriding the emulator binary.
pub const PROGRAM_ENV: &str = "S3270_PATH";

/// Default `Connect()` timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: i64 = 30;

/// Longest accepted `Connect()` timeout in seconds.
pub const MAX_CONNECT_TIMEOUT_SECS: i64 = 300;

/// Slack added on top of the emulator-side timeout of a `Wait()` action.
pub const WAIT_REPLY_MARGIN: Duration = Duration::from_secs(5);

/// Configuration for a client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Emulator executable.
    pub program: String,
    /// Extra emulator arguments.
    pub args: Vec<String>,
    /// Environment variables to set.
    pub env: HashMap<String, String>,
    /// Default timeout for waits.
    pub default_timeout: Duration,
    /// Interval between screen polls.
    pub poll_interval: Duration,
    /// Upper bound on a single reply; `None` waits indefinitely.
    pub command_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            program: std::env::var(PROGRAM_ENV).unwrap_or_else(|_| DEFAULT_PROGRAM.to_string()),
            args: Vec::new(),
            env: HashMap::new(),
            default_timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            command_timeout: None,
        }
    }
}

/// Builder for creating a Client instance.
#[derive(Default)]
pub struct ClientBuilder {
    config: ClientConfig,
    cancel: Option<CancellationToken>,
    transport: Option<(BoxedReader, BoxedWriter)>,
}

impl ClientBuilder {
    /// Create a new client builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the emulator executable.
    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.config.program = program.into();
        self
    }

    /// Append an emulator argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.config.args.push(arg.into());
        self
    }

    /// Set an environment variable for the emulator.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.env.insert(key.into(), value.into());
        self
    }

    /// Set the default timeout for waits.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.default_timeout = timeout;
        self
    }

    /// Set the screen poll interval.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Bound every reply; an overdue reply tears the session down.
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.config.command_timeout = Some(timeout);
        self
    }

    /// Use the caller's cancellation token for waits.
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Drive an emulator over already-open streams instead of spawning one.
    ///
    /// Useful with s3270's `-scriptport`.
    pub fn attach<R, W>(mut self, reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let reader: BoxedReader = Box::new(reader);
        let writer: BoxedWriter = Box::new(writer);
        self.transport = Some((reader, writer));
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the client. No process is started until the first command.
    pub fn build(self) -> Client {
        let session = match self.transport {
            Some((reader, writer)) => Session::attached(reader, writer),
            None => Session::new(),
        };
        Client {
            session: Mutex::new(session),
            config: self.config,
            cancel: self.cancel.unwrap_or_default(),
        }
    }
}

/// A client driving one s3270 process.
///
/// All exchanges go through one lock, so concurrent callers queue and replies
/// never interleave.
pub struct Client {
    /// Exchange lock guarding the session.
    session: Mutex<Session>,
    config: ClientConfig,
    cancel: CancellationToken,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Create a client with default settings.
    pub fn new() -> Self {
        ClientBuilder::new().build()
    }

    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Token observed by every wait on this client.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Spawn the emulator if it is not running.
    pub async fn ensure_started(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        session.ensure_started(&self.config)
    }

    /// Kill the emulator and reset the session.
    ///
    /// Waits for any in-flight exchange to finish first. Never fails.
    pub async fn teardown(&self) {
        let mut session = self.session.lock().await;
        session.teardown().await;
    }

    /// Current session state.
    pub async fn state(&self) -> SessionState {
        self.session.lock().await.state()
    }

    /// Process id of the emulator, if one is running.
    pub async fn pid(&self) -> Option<u32> {
        self.session.lock().await.pid()
    }

    /// Send one raw command line and return the reply's data.
    ///
    /// Fails with [`Tn3270Error::NotStarted`] without any I/O if the emulator
    /// has not been started. A command containing a line break is rejected.
    pub async fn execute(&self, command: &str) -> Result<String> {
        if command.contains(['\n', '\r']) {
            return Err(Tn3270Error::validation("command cannot contain line breaks"));
        }
        self.execute_within(command, self.config.command_timeout).await
    }

    async fn execute_within(&self, command: &str, limit: Option<Duration>) -> Result<String> {
        let mut session = self.session.lock().await;
        if !session.is_started() {
            return Err(Tn3270Error::NotStarted);
        }
        exchange_within(&mut session, command, limit).await
    }

    async fn send(&self, command: Command) -> Result<String> {
        self.execute_within(&command.to_string(), self.config.command_timeout).await
    }

    /// Start the emulator if needed and connect to `host:port`.
    ///
    /// `timeout` is in seconds; `None` or a non-positive value means 30.
    pub async fn connect(&self, host: &str, port: i64, timeout: Option<i64>) -> Result<()> {
        input::validate_host(host)?;
        let port = input::validate_port(port)?;
        let timeout_secs = timeout
            .filter(|t| *t > 0)
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS);
        if timeout_secs > MAX_CONNECT_TIMEOUT_SECS {
            return Err(Tn3270Error::validation(format!(
                "timeout must be between 1 and {MAX_CONNECT_TIMEOUT_SECS} seconds, got {timeout_secs}"
            )));
        }
        let limit = Duration::from_secs(timeout_secs.unsigned_abs());

        let mut session = self.session.lock().await;
        session.ensure_started(&self.config)?;

        let target = format!("{host}:{port}");
        let command = Command::Connect {
            host: host.to_string(),
            port,
        };
        exchange_within(&mut session, &command.to_string(), Some(limit))
            .await
            .map_err(|e| Tn3270Error::Connect {
                target: target.clone(),
                source: Box::new(e),
            })?;

        session.set_connected(true);
        info!(%target, "connected");
        Ok(())
    }

    /// Disconnect from the host, quit the emulator and tear the session down.
    ///
    /// A no-op when not connected.
    pub async fn disconnect(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        if !session.is_connected() {
            return Ok(());
        }

        for command in [Command::Disconnect, Command::Quit] {
            let line = command.to_string();
            if let Err(e) = exchange_within(&mut session, &line, self.config.command_timeout).await
            {
                debug!(command = %line, error = %e, "ignoring error during disconnect");
            }
        }
        session.teardown().await;
        info!("disconnected");
        Ok(())
    }

    /// Whether a host session is open.
    pub async fn is_connected(&self) -> bool {
        self.session.lock().await.is_connected()
    }

    /// Type text at the cursor.
    pub async fn string(&self, text: &str) -> Result<()> {
        input::validate_text(text)?;
        self.send(Command::String(text.to_string())).await?;
        Ok(())
    }

    /// Alias for [`Client::string`].
    pub async fn type_text(&self, text: &str) -> Result<()> {
        self.string(text).await
    }

    /// Move to `row`, `col` (1-based) and type text.
    pub async fn string_at(&self, text: &str, row: i64, col: i64) -> Result<()> {
        self.move_to(row, col).await?;
        self.string(text).await
    }

    /// Press a key.
    pub async fn press(&self, key: Key) -> Result<()> {
        self.send(key.to_command()).await?;
        Ok(())
    }

    /// Press Enter.
    pub async fn enter(&self) -> Result<()> {
        self.press(Key::Enter).await
    }

    /// Press Tab.
    pub async fn tab(&self) -> Result<()> {
        self.press(Key::Tab).await
    }

    /// Press BackTab.
    pub async fn back_tab(&self) -> Result<()> {
        self.press(Key::BackTab).await
    }

    /// Press Home.
    pub async fn home(&self) -> Result<()> {
        self.press(Key::Home).await
    }

    /// Press Clear.
    pub async fn clear(&self) -> Result<()> {
        self.press(Key::Clear).await
    }

    /// Press PF1-PF24.
    pub async fn pf(&self, key: i64) -> Result<()> {
        self.press(Key::pf(key)?).await
    }

    /// Press PA1-PA3.
    pub async fn pa(&self, key: i64) -> Result<()> {
        self.press(Key::pa(key)?).await
    }

    /// Move the cursor to `row`, `col` (1-based).
    pub async fn move_to(&self, row: i64, col: i64) -> Result<()> {
        let (row, col) = input::to_zero_based(row, col)?;
        self.send(Command::MoveCursor { row, col }).await?;
        Ok(())
    }

    /// Ask the emulator to wait until the host unlocks an input field.
    ///
    /// `timeout` is in seconds; `None` or zero uses the client default.
    pub async fn wait_for_field(&self, timeout: Option<u64>) -> Result<()> {
        let seconds = timeout
            .filter(|t| *t > 0)
            .unwrap_or_else(|| self.config.default_timeout.as_secs().max(1));
        // The emulator may legitimately hold the reply for `seconds`.
        let limit = self
            .config
            .command_timeout
            .map(|t| t.max(Duration::from_secs(seconds) + WAIT_REPLY_MARGIN));
        let command = Command::WaitInputField { seconds };
        self.execute_within(&command.to_string(), limit).await?;
        Ok(())
    }

    /// Current screen text.
    pub async fn screen_text(&self) -> Result<String> {
        self.send(Command::Ascii).await
    }

    /// Alias for [`Client::screen_text`].
    pub async fn ascii(&self) -> Result<String> {
        self.screen_text().await
    }

    /// Current screen as a [`Screen`].
    pub async fn screen(&self) -> Result<Screen> {
        Ok(Screen::from_text(&self.screen_text().await?))
    }

    /// Current screen inside a line-numbered border.
    pub async fn print_screen(&self) -> Result<String> {
        Ok(self.screen().await?.to_bordered())
    }

    fn wait(&self, condition: WaitCondition, timeout: Option<Duration>) -> WaitBuilder {
        let timeout = timeout
            .filter(|t| !t.is_zero())
            .unwrap_or(self.config.default_timeout);
        WaitBuilder::new(condition)
            .timeout(timeout)
            .poll_interval(self.config.poll_interval)
            .cancel_on(self.cancel.clone())
    }

    /// Poll the screen until `wait` is satisfied.
    pub async fn wait_until(&self, wait: &WaitBuilder) -> Result<String> {
        wait.poll(|| self.screen_text()).await
    }

    /// Wait for `text` to appear on screen.
    pub async fn wait_for_text(&self, text: &str, timeout: Option<Duration>) -> Result<()> {
        self.wait_for_text_and_return(text, timeout).await?;
        Ok(())
    }

    /// Wait for `text` to appear and return the matching screen.
    pub async fn wait_for_text_and_return(
        &self,
        text: &str,
        timeout: Option<Duration>,
    ) -> Result<String> {
        let wait = self.wait(WaitCondition::TextAppears(text.to_string()), timeout);
        self.wait_until(&wait).await
    }

    /// Wait for `text` to leave the screen.
    pub async fn wait_for_text_gone(&self, text: &str, timeout: Option<Duration>) -> Result<()> {
        let wait = self.wait(WaitCondition::TextDisappears(text.to_string()), timeout);
        self.wait_until(&wait).await?;
        Ok(())
    }

    /// Wait for a regex to match the screen and return the matching screen.
    pub async fn wait_for_pattern(
        &self,
        pattern: &str,
        timeout: Option<Duration>,
    ) -> Result<String> {
        let wait = self.wait(WaitCondition::pattern(pattern)?, timeout);
        self.wait_until(&wait).await
    }

    /// Type `text`, press Enter, then wait for an input field unless `wait` is false.
    pub async fn send_command(&self, text: &str, wait: bool) -> Result<()> {
        self.string(text).await?;
        self.enter().await?;
        if wait {
            self.wait_for_field(None).await?;
        }
        Ok(())
    }

    /// Press a PF key, then wait for an input field unless `wait` is false.
    pub async fn send_pf(&self, key: i64, wait: bool) -> Result<()> {
        self.pf(key).await?;
        if wait {
            self.wait_for_field(None).await?;
        }
        Ok(())
    }

    /// Write the current screen text to `path`.
    ///
    /// The path is checked before anything is sent to the emulator.
    pub async fn screenshot(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = output::validate_screenshot_path(path)?;
        let screen = self
            .screen_text()
            .await
            .map_err(|e| Tn3270Error::Screenshot {
                action: "get screen",
                source: Box::new(e),
            })?;
        output::write_screen(&path, &screen)
            .await
            .map_err(|e| Tn3270Error::Screenshot {
                action: "write screenshot",
                source: Box::new(e),
            })
    }
}

/// Run one exchange, tearing the session down if the reply is overdue.
async fn exchange_within(
    session: &mut Session,
    command: &str,
    limit: Option<Duration>,
) -> Result<String> {
    let Some(limit) = limit else {
        return exchange(session, command).await;
    };

    match tokio::time::timeout(limit, exchange(session, command)).await {
        Ok(result) => result,
        Err(_) => {
            // A late reply would be read as the answer to the next command.
            warn!(command, ?limit, "reply overdue, tearing down session");
            session.teardown().await;
            Err(Tn3270Error::Timeout {
                condition: format!("reply to {command}"),
                timeout: limit,
            })
        }
    }
}

/// Write `command` and read lines until `ok` or `error`.
///
/// A failed read leaves an unknown part of the reply in the stream, so the
/// session is torn down before the error is returned.
async fn exchange(session: &mut Session, command: &str) -> Result<String> {
    let result = exchange_lines(session, command).await;
    if let Err(Tn3270Error::Read { .. }) = &result {
        warn!(command, "reply read failed, tearing down session");
        session.teardown().await;
    }
    result
}

async fn exchange_lines(session: &mut Session, command: &str) -> Result<String> {
    debug!(command, "sending");
    session
        .write_line(command)
        .await
        .map_err(|source| Tn3270Error::Write {
            command: command.to_string(),
            source,
        })?;

    let mut reply = ReplyBuffer::new();
    loop {
        let line = session
            .read_line()
            .await
            .map_err(|source| Tn3270Error::Read {
                command: command.to_string(),
                source,
            })?
            .ok_or_else(|| Tn3270Error::Read {
                command: command.to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "s3270 closed its output",
                ),
            })?;

        match ReplyLine::parse(&line) {
            ReplyLine::Ok => return Ok(reply.finish()),
            ReplyLine::Error(message) => {
                return Err(Tn3270Error::Protocol {
                    message,
                    command: command.to_string(),
                });
            }
            ReplyLine::Data(content) => reply.push(&content),
            ReplyLine::Other => trace!(line = line.trim_end(), "ignoring reply line"),
        }
    }
}
