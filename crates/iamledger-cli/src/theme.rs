//! Terminal styling for ledger output.

use colored::{ColoredString, Colorize};

const RULE_WIDTH: usize = 48;

/// Styling helpers. Everything returns a `String` so callers pick the stream.
pub(crate) struct Theme;

impl Theme {
    /// Section title.
    pub(crate) fn header(text: &str) -> String {
        text.bold().cyan().to_string()
    }

    /// Horizontal rule under a section title.
    pub(crate) fn separator() -> String {
        "─".repeat(RULE_WIDTH).dimmed().to_string()
    }

    pub(crate) fn success(text: &str) -> String {
        Self::marked("✓".green(), text.normal())
    }

    pub(crate) fn error(text: &str) -> String {
        Self::marked("✗".red().bold(), text.red())
    }

    pub(crate) fn warning(text: &str) -> String {
        Self::marked("!".yellow().bold(), text.yellow())
    }

    pub(crate) fn info(text: &str) -> String {
        Self::marked("·".blue(), text.normal())
    }

    /// One-line verdict for a recorded access decision.
    pub(crate) fn verdict(user: &str, url: &str, authorized: bool) -> String {
        if authorized {
            format!("{} {user} -> {url}", "GRANTED".green().bold())
        } else {
            format!("{} {user} -> {url}", "DENIED".red().bold())
        }
    }

    fn marked(mark: ColoredString, text: ColoredString) -> String {
        format!("{mark} {text}")
    }
}
