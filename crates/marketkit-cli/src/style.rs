//! ANSI styling for progress and summary output.
//!
//! Styling is dropped when `NO_COLOR` is set.

use std::fmt;
use std::io::{self, Write};
use std::sync::OnceLock;

const RESET: &str = "\x1b[0m";

/// Role of a piece of output.
#[derive(Debug, Clone, Copy)]
pub enum Tone {
    Heading,
    Muted,
    Target,
    Step,
    Ok,
    Fail,
}

impl Tone {
    fn code(self) -> &'static str {
        match self {
            Self::Heading => "\x1b[1m",
            Self::Muted => "\x1b[2m",
            Self::Target => "\x1b[36m",
            Self::Step => "\x1b[34m",
            Self::Ok => "\x1b[32m",
            Self::Fail => "\x1b[31m",
        }
    }
}

fn enabled() -> bool {
    static ENABLED: OnceLock<bool> = OnceLock::new();
    *ENABLED.get_or_init(|| std::env::var_os("NO_COLOR").is_none())
}

/// Wrap `text` in the escape codes of `tone`.
pub fn paint(tone: Tone, text: impl fmt::Display) -> String {
    if enabled() {
        format!("{}{}{}", tone.code(), text, RESET)
    } else {
        text.to_string()
    }
}

/// Flush stdout so a step label shows before the step's result.
pub fn flush_stdout() {
    io::stdout().flush().ok();
}
