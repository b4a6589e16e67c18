//! Keyboard input and argument validation for 3270 screens.
//!
//! Bounds follow the 24x80 model 2 screen that s3270 presents by default.

mod keys;

pub use keys::Key;

use crate::error::{Result, Tn3270Error};

/// Maximum characters accepted by a single `String()` action (24 * 80).
pub const MAX_TEXT_LEN: usize = 1920;
/// Screen rows.
pub const ROWS: i64 = 24;
/// Screen columns.
pub const COLS: i64 = 80;
/// Highest program function key.
pub const MAX_PF: i64 = 24;
/// Highest program attention key.
pub const MAX_PA: i64 = 3;
/// Longest DNS host name.
pub const MAX_HOST_LEN: usize = 253;

/// Validate a PF key number.
pub fn validate_pf(key: i64) -> Result<u8> {
    if !(1..=MAX_PF).contains(&key) {
        return Err(Tn3270Error::validation(format!(
            "PF key must be between 1 and {MAX_PF}, got {key}"
        )));
    }
    u8::try_from(key).map_err(|_| Tn3270Error::validation(format!("invalid PF key {key}")))
}

/// Validate a PA key number.
pub fn validate_pa(key: i64) -> Result<u8> {
    if !(1..=MAX_PA).contains(&key) {
        return Err(Tn3270Error::validation(format!(
            "PA key must be between 1 and {MAX_PA}, got {key}"
        )));
    }
    u8::try_from(key).map_err(|_| Tn3270Error::validation(format!("invalid PA key {key}")))
}

/// Validate text for a `String()` action.
pub fn validate_text(text: &str) -> Result<()> {
    let len = text.chars().count();
    if len > MAX_TEXT_LEN {
        return Err(Tn3270Error::validation(format!(
            "text exceeds maximum length of {MAX_TEXT_LEN} characters, got {len}"
        )));
    }
    Ok(())
}

/// Validate 1-based screen coordinates and convert them to 0-based.
pub fn to_zero_based(row: i64, col: i64) -> Result<(u16, u16)> {
    if !(1..=ROWS).contains(&row) {
        return Err(Tn3270Error::validation(format!(
            "row must be between 1 and {ROWS}, got {row}"
        )));
    }
    if !(1..=COLS).contains(&col) {
        return Err(Tn3270Error::validation(format!(
            "column must be between 1 and {COLS}, got {col}"
        )));
    }
    let row = u16::try_from(row - 1).map_err(|_| Tn3270Error::validation("invalid row"))?;
    let col = u16::try_from(col - 1).map_err(|_| Tn3270Error::validation("invalid column"))?;
    Ok((row, col))
}

/// Validate a host name for `Connect()`.
pub fn validate_host(host: &str) -> Result<()> {
    if host.is_empty() {
        return Err(Tn3270Error::validation("host cannot be empty"));
    }
    if host.len() > MAX_HOST_LEN {
        return Err(Tn3270Error::validation(format!(
            "host exceeds maximum length of {MAX_HOST_LEN} characters, got {}",
            host.len()
        )));
    }
    Ok(())
}

/// Validate a TCP port.
pub fn validate_port(port: i64) -> Result<u16> {
    u16::try_from(port)
        .ok()
        .filter(|p| *p != 0)
        .ok_or_else(|| {
            Tn3270Error::validation(format!("port must be between 1 and 65535, got {port}"))
        })
}
