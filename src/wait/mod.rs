//! Polling waits on screen content.
//!
//! s3270 has no push notification for screen changes, so every wait here is a
//! snapshot poll: fetch the screen, test the condition, sleep, repeat until
//! the deadline or a cancellation.

use std::future::Future;
use std::time::Duration;

use regex::Regex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::error::{Result, Tn3270Error};

/// Default timeout for wait operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default poll interval for checking conditions.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A condition on the screen text.
#[derive(Debug, Clone)]
pub enum WaitCondition {
    /// Text appears anywhere on screen.
    TextAppears(String),
    /// Text is no longer on screen.
    TextDisappears(String),
    /// A regex matches the screen.
    PatternMatches(Regex),
}

impl WaitCondition {
    /// Build a pattern condition, compiling the regex once.
    pub fn pattern(pattern: &str) -> Result<Self> {
        Ok(WaitCondition::PatternMatches(Regex::new(pattern)?))
    }

    /// Check the condition against a screen snapshot.
    pub fn is_satisfied(&self, screen: &str) -> bool {
        match self {
            WaitCondition::TextAppears(text) => screen.contains(text.as_str()),
            WaitCondition::TextDisappears(text) => !screen.contains(text.as_str()),
            WaitCondition::PatternMatches(re) => re.is_match(screen),
        }
    }

    /// Human-readable description, used in timeout errors.
    pub fn description(&self) -> String {
        match self {
            WaitCondition::TextAppears(text) => format!("text: {text}"),
            WaitCondition::TextDisappears(text) => format!("text to disappear: {text}"),
            WaitCondition::PatternMatches(re) => format!("pattern: {}", re.as_str()),
        }
    }
}

/// A configured wait: condition, timeout, poll interval and cancellation.
#[derive(Debug, Clone)]
pub struct WaitBuilder {
    condition: WaitCondition,
    timeout: Duration,
    poll_interval: Duration,
    cancel: Option<CancellationToken>,
}

impl WaitBuilder {
    /// Create a new wait builder for the given condition.
    pub fn new(condition: WaitCondition) -> Self {
        Self {
            condition,
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            cancel: None,
        }
    }

    /// Set the timeout for this wait operation.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the poll interval for checking the condition.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Abort the wait when `token` is cancelled.
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Get the condition.
    pub fn condition(&self) -> &WaitCondition {
        &self.condition
    }

    /// Get the timeout.
    pub fn get_timeout(&self) -> Duration {
        self.timeout
    }

    /// Get the poll interval.
    pub fn get_poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Create a timeout error for this wait.
    pub fn timeout_error(&self) -> Tn3270Error {
        Tn3270Error::Timeout {
            condition: self.condition.description(),
            timeout: self.timeout,
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    async fn pause(&self) {
        match &self.cancel {
            Some(token) => {
                tokio::select! {
                    () = tokio::time::sleep(self.poll_interval) => {}
                    () = token.cancelled() => {}
                }
            }
            None => tokio::time::sleep(self.poll_interval).await,
        }
    }

    /// Poll `fetch` until the condition holds, returning the matching screen.
    ///
    /// Cancellation is checked before every fetch and wins over both a match
    /// and the deadline. A fetch error ends the wait immediately.
    pub async fn poll<F, Fut>(&self, mut fetch: F) -> Result<String>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        let deadline = Instant::now() + self.timeout;

        loop {
            if self.is_cancelled() {
                return Err(Tn3270Error::Cancelled);
            }

            let screen = fetch().await?;
            if self.condition.is_satisfied(&screen) {
                return Ok(screen);
            }

            if Instant::now() >= deadline {
                return Err(self.timeout_error());
            }
            trace!(condition = %self.condition.description(), "condition not met, polling");
            self.pause().await;
        }
    }
}
