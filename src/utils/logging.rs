//! Structured logging and security-focused trace utilities.
//!
//! This module configures the `tracing` ecosystem for the application,
//! supporting multiple output formats and providing utilities to prevent
//! sensitive data (like API keys) from leaking into logs.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use crate::config::LoggingConfig;
use crate::error::{CompletionError, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes the global tracing subscriber for the application.
///
/// Supports three output formats:
/// - `json`: Structured JSON logs for machine ingestion.
/// - `pretty`: Multi-line, human-readable output.
/// - `compact` (default): One line per event.
///
/// Logs are written to stderr so streamed completions on stdout stay clean.
/// `RUST_LOG` takes precedence over the configured level.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| CompletionError::Config(format!("invalid log level: {}", e)))?;

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match config.format.as_str() {
        "json" => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        "pretty" => registry
            .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init(),
        _ => registry
            .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
            .try_init(),
    };

    result.map_err(|e| CompletionError::Config(format!("logging already initialized: {}", e)))
}

/// Sanitizes sensitive information from log messages.
///
/// Replaces API keys (`sk-...`) and the value of any `Bearer` credential with
/// a `\[REDACTED\]` placeholder. Providers sometimes echo the key they
/// rejected back in the error message.
pub fn sanitize(input: &str) -> String {
    let mut result = input.to_string();

    for (marker, placeholder, keep_marker) in [
        ("Bearer ", "[REDACTED]", true),
        ("sk-", "[REDACTED_API_KEY]", false),
    ] {
        let mut search_from = 0;
        while let Some(found) = result[search_from..].find(marker) {
            let start = search_from + found;
            let token_start = start + marker.len();

            // "task-list" is not a key
            let inside_word = result[..start]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_alphanumeric());
            if !keep_marker && inside_word {
                search_from = token_start;
                continue;
            }

            let end = result[token_start..]
                .find(|c: char| c.is_whitespace() || c == '"' || c == '\'' || c == ',')
                .map(|i| token_start + i)
                .unwrap_or(result.len());

            let replace_from = if keep_marker { token_start } else { start };
            result.replace_range(replace_from..end, placeholder);
            search_from = replace_from + placeholder.len();
        }
    }

    result
}
