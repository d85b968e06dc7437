pub mod json;
pub mod text;

use serde::Serialize;

use crate::error::AppResult;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum OutputMode {
    Text,
    Json,
}

/// Writes either human-readable lines or one JSON document.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    mode: OutputMode,
}

impl Output {
    pub fn new(json: bool) -> Self {
        let mode = if json {
            OutputMode::Json
        } else {
            OutputMode::Text
        };
        Self { mode }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn emit<T: Serialize>(&self, text_line: &str, json_value: &T) -> AppResult<()> {
        self.emit_lines(&[text_line], json_value)
    }

    pub fn emit_lines<S, T>(&self, lines: &[S], json_value: &T) -> AppResult<()>
    where
        S: AsRef<str>,
        T: Serialize,
    {
        match self.mode {
            OutputMode::Text => text::print_lines(lines),
            OutputMode::Json => json::print(json_value),
        }
    }
}
