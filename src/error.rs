// Error types shared by the API client, the commands and the CLI entry point.

use thiserror::Error;

/// Everything that can make a `habits` invocation fail.
#[derive(Error, Debug)]
pub enum HabitsError {
    /// Missing, unreadable or malformed config file.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The service answered with a non-2xx status.
    #[error(
        "{status} {class} Error: {reason} for URL: {url}{detail}",
        class = status_class(.status),
        detail = detail(.message)
    )]
    Http {
        status: u16,
        reason: String,
        url: String,
        message: Option<String>,
    },

    /// The request never got an answer.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Arguments that clap accepted but that still make no sense.
    #[error("{0}")]
    Usage(String),

    #[error("Invalid response from Habitica: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl HabitsError {
    pub fn config(message: impl Into<String>) -> Self {
        HabitsError::Config {
            message: message.into(),
        }
    }

    /// Exit code for the process: 2 for usage errors (same as clap), 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        match self {
            HabitsError::Usage(_) => 2,
            _ => 1,
        }
    }
}

fn status_class(status: &u16) -> &'static str {
    match *status {
        400..=499 => "Client",
        500..=599 => "Server",
        _ => "Unknown",
    }
}

fn detail(message: &Option<String>) -> String {
    match message {
        Some(m) => format!(": {m}"),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, HabitsError>;
