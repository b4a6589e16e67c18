//! Screen snapshots returned by `Ascii()`.

use serde::{Deserialize, Serialize};

use crate::input::COLS;

/// A snapshot of the emulator screen as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Screen {
    lines: Vec<String>,
}

impl Screen {
    /// Build a snapshot from newline-separated screen text.
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: text.split('\n').map(str::to_string).collect(),
        }
    }

    /// Full screen content, lines joined with `\n`.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// All lines, top to bottom.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// A single line (1-indexed).
    pub fn line(&self, row: u16) -> Option<&str> {
        let idx = usize::from(row).checked_sub(1)?;
        self.lines.get(idx).map(String::as_str)
    }

    /// Check if the screen contains the given text.
    pub fn contains(&self, text: &str) -> bool {
        self.text().contains(text)
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Render inside a box with 1-based line numbers, padded to screen width.
    pub fn to_bordered(&self) -> String {
        let width = usize::try_from(COLS).unwrap_or(80);
        let mut out = String::new();

        out.push_str(&format!("┌──┬{}┐\n", "─".repeat(width)));
        for (i, line) in self.lines.iter().enumerate() {
            let pad = width.saturating_sub(line.chars().count());
            out.push_str(&format!("│{:2}│{}{}│\n", i + 1, line, " ".repeat(pad)));
        }
        out.push_str(&format!("└──┴{}┘", "─".repeat(width)));
        out
    }
}

impl std::fmt::Display for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text())
    }
}
