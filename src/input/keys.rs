//! 3270 keys and their s3270 actions.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, Tn3270Error};
use crate::protocol::Command;

use super::{validate_pa, validate_pf};

/// A 3270 keyboard key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Enter AID.
    Enter,
    /// Next field.
    Tab,
    /// Previous field.
    BackTab,
    /// First input field.
    Home,
    /// Clear AID.
    Clear,
    /// Program function key (PF1-PF24).
    Pf(u8),
    /// Program attention key (PA1-PA3).
    Pa(u8),
}

impl Key {
    /// Build a PF key, validating the number.
    pub fn pf(n: i64) -> Result<Self> {
        validate_pf(n).map(Key::Pf)
    }

    /// Build a PA key, validating the number.
    pub fn pa(n: i64) -> Result<Self> {
        validate_pa(n).map(Key::Pa)
    }

    /// The s3270 action for this key.
    pub fn to_command(self) -> Command {
        match self {
            Key::Enter => Command::Enter,
            Key::Tab => Command::Tab,
            Key::BackTab => Command::BackTab,
            Key::Home => Command::Home,
            Key::Clear => Command::Clear,
            Key::Pf(n) => Command::Pf(n),
            Key::Pa(n) => Command::Pa(n),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Enter => f.write_str("enter"),
            Key::Tab => f.write_str("tab"),
            Key::BackTab => f.write_str("backtab"),
            Key::Home => f.write_str("home"),
            Key::Clear => f.write_str("clear"),
            Key::Pf(n) => write!(f, "pf{n}"),
            Key::Pa(n) => write!(f, "pa{n}"),
        }
    }
}

impl FromStr for Key {
    type Err = Tn3270Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_lowercase();
        match name.as_str() {
            "enter" => return Ok(Key::Enter),
            "tab" => return Ok(Key::Tab),
            "backtab" | "back_tab" => return Ok(Key::BackTab),
            "home" => return Ok(Key::Home),
            "clear" => return Ok(Key::Clear),
            _ => {}
        }

        let number = |digits: &str| {
            digits
                .parse::<i64>()
                .map_err(|_| Tn3270Error::validation(format!("unknown key: {s}")))
        };
        if let Some(digits) = name.strip_prefix("pf") {
            return Key::pf(number(digits)?);
        }
        if let Some(digits) = name.strip_prefix("pa") {
            return Key::pa(number(digits)?);
        }
        Err(Tn3270Error::validation(format!("unknown key: {s}")))
    }
}
