//! s3270 wire format: outbound action lines and inbound reply lines.
//!
//! Every exchange is one command line followed by zero or more `data:` lines
//! and exactly one terminal line (`ok` or `error[ message]`).

use std::fmt;

/// Fallback message when the emulator sends a bare `error` line.
pub const UNKNOWN_ERROR: &str = "unknown error";

/// An action understood by s3270.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Open a session to `host:port`.
    Connect {
        /// Host name or address.
        host: String,
        /// TCP port.
        port: u16,
    },
    /// Close the host session.
    Disconnect,
    /// Exit the emulator.
    Quit,
    /// Type text at the cursor.
    String(String),
    /// Enter AID key.
    Enter,
    /// Next input field.
    Tab,
    /// Previous input field.
    BackTab,
    /// Cursor to the first input field.
    Home,
    /// Clear AID key.
    Clear,
    /// Program function key.
    Pf(u8),
    /// Program attention key.
    Pa(u8),
    /// Move the cursor; coordinates are 0-based.
    MoveCursor {
        /// 0-based row.
        row: u16,
        /// 0-based column.
        col: u16,
    },
    /// Block until the host unlocks the keyboard on an input field.
    WaitInputField {
        /// Emulator-side timeout in seconds.
        seconds: u64,
    },
    /// Dump the screen as text.
    Ascii,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Connect { host, port } => write!(f, "Connect({host}:{port})"),
            Command::Disconnect => f.write_str("Disconnect()"),
            Command::Quit => f.write_str("Quit()"),
            Command::String(text) => write!(f, "String({})", quote(text)),
            Command::Enter => f.write_str("Enter()"),
            Command::Tab => f.write_str("Tab()"),
            Command::BackTab => f.write_str("BackTab()"),
            Command::Home => f.write_str("Home()"),
            Command::Clear => f.write_str("Clear()"),
            Command::Pf(n) => write!(f, "PF({n})"),
            Command::Pa(n) => write!(f, "PA({n})"),
            Command::MoveCursor { row, col } => write!(f, "MoveCursor({row},{col})"),
            Command::WaitInputField { seconds } => write!(f, "Wait({seconds},InputField)"),
            Command::Ascii => f.write_str("Ascii()"),
        }
    }
}

/// Quote `text` as a double-quoted s3270 string argument.
///
/// The result never contains a raw newline, so it cannot break line framing.
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c == '\x7f' => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// One classified line of emulator output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyLine {
    /// `ok`: the command succeeded.
    Ok,
    /// `error` or `error <message>`.
    Error(String),
    /// `data:` payload with the prefix and one leading space removed.
    Data(String),
    /// Anything else (status chatter); ignored by the driver.
    Other,
}

impl ReplyLine {
    /// Classify a raw line; trailing `\r`/`\n` are stripped first.
    pub fn parse(raw: &str) -> Self {
        let line = raw.trim_end_matches(['\r', '\n']);

        if line == "ok" {
            return ReplyLine::Ok;
        }
        if line == "error" {
            return ReplyLine::Error(UNKNOWN_ERROR.to_string());
        }
        if let Some(message) = line.strip_prefix("error ") {
            return ReplyLine::Error(message.to_string());
        }
        if let Some(content) = line.strip_prefix("data:") {
            let content = content.strip_prefix(' ').unwrap_or(content);
            return ReplyLine::Data(content.to_string());
        }
        ReplyLine::Other
    }
}

/// Accumulates data lines until a terminal line arrives.
#[derive(Debug, Default)]
pub struct ReplyBuffer {
    data: String,
}

impl ReplyBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one data line.
    pub fn push(&mut self, content: &str) {
        self.data.push_str(content);
        self.data.push('\n');
    }

    /// The accumulated payload with the single trailing newline trimmed.
    pub fn finish(mut self) -> String {
        if self.data.ends_with('\n') {
            self.data.pop();
        }
        self.data
    }
}
