//! Terminal styling and tables for command output

use colored::*;
use comfy_table::{presets, Table};
use std::io::IsTerminal;

/// Color policy for everything written to the output stream.
///
/// `colored` keeps a process-wide override, so constructing a console applies
/// its policy globally; the last console built wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Console {
    color: bool,
}

impl Console {
    pub fn new(color: bool) -> Self {
        colored::control::set_override(color);
        Self { color }
    }

    /// Colors on unless disabled, `NO_COLOR` is set or stdout is not a terminal
    pub fn detect(no_color: bool) -> Self {
        let color = !no_color
            && std::env::var_os("NO_COLOR").is_none()
            && std::io::stdout().is_terminal();
        Self::new(color)
    }

    pub fn plain() -> Self {
        Self::new(false)
    }

    pub fn color_enabled(&self) -> bool {
        self.color
    }

    /// Green for a passing verdict, red for a failing one
    pub fn status(&self, text: &str, pass: bool) -> String {
        if !self.color {
            return text.to_string();
        }
        if pass {
            text.green().to_string()
        } else {
            text.red().to_string()
        }
    }

    pub fn error(&self, text: &str) -> String {
        if self.color {
            text.red().bold().to_string()
        } else {
            text.to_string()
        }
    }

    pub fn warning(&self, text: &str) -> String {
        if self.color {
            text.yellow().to_string()
        } else {
            text.to_string()
        }
    }

    pub fn heading(&self, text: &str) -> String {
        if self.color {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }

    pub fn dim(&self, text: &str) -> String {
        if self.color {
            text.dimmed().to_string()
        } else {
            text.to_string()
        }
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::plain()
    }
}

/// A horizontal rule of `width` copies of `ch`
pub fn rule(ch: char, width: usize) -> String {
    std::iter::repeat_n(ch, width).collect()
}

/// Plain ASCII table with the given header row
pub fn table<I, S>(headers: I) -> Table
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut table = Table::new();
    table
        .load_preset(presets::ASCII_FULL)
        .set_header(headers.into_iter().map(Into::into).collect::<Vec<String>>());
    table
}
