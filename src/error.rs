use std::io;

use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

pub type SimResult<T> = Result<T, SimError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("state file not found: {0}")]
    MissingState(String),
    #[error("simulation error: {0}")]
    Sim(#[from] SimError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Outcome of a simulated vendor call that did not succeed.
///
/// Each vendor module translates these into its own wire convention at the
/// boundary (`{"ok": false}` for Slack, status codes for Workday and so on).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl SimError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unsupported(what: impl Into<String>) -> Self {
        Self::Unsupported(what.into())
    }

    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(msg) | Self::Validation(msg) | Self::Unsupported(msg) => msg,
        }
    }
}
