//! Terminal utilities for colored output and formatting.

use std::io::{self, IsTerminal};

/// Check if we're running in a controlling terminal.
///
/// Interactive operations (prompts, confirmations, hidden input) require
/// one; callers map a `false` here to `GenesisError::NoTty`.
pub fn in_controlling_terminal() -> bool {
    io::stdin().is_terminal() && io::stderr().is_terminal()
}

/// Get terminal width in columns.
pub fn terminal_width() -> usize {
    console::Term::stderr().size_checked().map(|(_, w)| w as usize).unwrap_or(80)
}
