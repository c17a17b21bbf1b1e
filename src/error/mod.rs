// Error types for the completion cache and network client
// Author: kelexine (https://github.com/kelexine)

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompletionError {
    /// The conversation no longer fits the model context; prune history and retry.
    #[error("Context length exceeded: {0}")]
    ContextLengthExceeded(String),

    /// Any other error the provider reported with a 4xx/5xx status.
    #[error("Provider error: {0}")]
    Unknown(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid cache namespace: {0}")]
    InvalidNamespace(String),

    #[error("Invalid client state: {0}")]
    InvalidState(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Config parsing error: {0}")]
    ConfigParsing(#[from] config::ConfigError),
}

impl CompletionError {
    /// True when the caller can recover by dropping old turns and retrying.
    pub fn is_context_length_exceeded(&self) -> bool {
        matches!(self, CompletionError::ContextLengthExceeded(_))
    }

    /// True for errors reported by the provider in a 4xx/5xx body.
    pub fn is_provider_error(&self) -> bool {
        matches!(
            self,
            CompletionError::ContextLengthExceeded(_) | CompletionError::Unknown(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CompletionError>;
