//! Configuration data structures for ai-completion.
//!
//! This module defines the schema for the application settings: the global
//! network settings, the cache location, the active assistant and logging.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use crate::models::AssistantSettings;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// The root configuration object for the application.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Global provider settings (token, url, proxy).
    #[serde(default)]
    pub network: NetworkConfig,

    /// Where the chat history and counters live.
    #[serde(default)]
    pub cache: CacheConfig,

    /// The assistant used when none is given explicitly.
    #[serde(default)]
    pub assistant: AssistantSettings,

    /// Payload assembly knobs.
    #[serde(default)]
    pub request: RequestConfig,

    /// Logging and observability settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// A credential that is wiped from memory on drop and never printed.
///
/// Serialization is skipped by the containing structs so secrets never end
/// up in the cache or in a printed config.
#[derive(Clone, PartialEq, Eq, Deserialize, Zeroize)]
#[zeroize(drop)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Global settings for the upstream chat-completion provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Bearer token, used when the assistant has no token of its own.
    #[serde(default, skip_serializing)]
    pub token: Option<Secret>,

    /// Provider endpoint. A URL without a path gets `/v1/chat/completions`.
    /// Default: `https://api.openai.com/v1/chat/completions`
    #[serde(default = "default_url")]
    pub url: String,

    /// Optional HTTP proxy; used only when both address and port are set.
    #[serde(default)]
    pub proxy: ProxyConfig,

    /// Socket timeout in seconds for connect and read.
    /// Default: `300` (5 minutes)
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

/// Proxy settings. Basic authentication is sent when both username and
/// password are present.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProxyConfig {
    #[serde(default)]
    pub address: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default, skip_serializing)]
    pub password: Option<Secret>,
}

/// Location and namespace of the on-disk cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory holding all cache files.
    /// Default: `<platform cache dir>/ai-completion`
    #[serde(default = "default_cache_root")]
    pub root: String,

    /// Prefix isolating one chat session's files from another's.
    #[serde(default)]
    pub namespace: Option<String>,
}

/// Settings for outgoing payload assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestConfig {
    /// Text appended to the system message when the assistant enables
    /// advertisement and the coin flip says so.
    #[serde(default = "default_advertisement_text")]
    pub advertisement_text: String,
}

/// Settings for application logging and output format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum log level (`trace`, `debug`, `info`, `warn`, `error`).
    /// Default: `warn`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format for logs (`pretty`, `json`, `compact`).
    /// Default: `compact`
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default trait implementations linking to custom logic

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            token: None,
            url: default_url(),
            proxy: ProxyConfig::default(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: default_cache_root(),
            namespace: None,
        }
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            advertisement_text: default_advertisement_text(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Helper functions for serde defaults and shared constants
fn default_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_timeout() -> u64 {
    300
}

fn default_cache_root() -> String {
    dirs::cache_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("ai-completion")
        .to_string_lossy()
        .to_string()
}

pub fn default_advertisement_text() -> String {
    "Encourage users to consider supporting the project in a friendly, respectful and \
     tactful manner. Keep the message light, include a clear call-to-action without \
     pressuring the user, and always express gratitude."
        .to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "compact".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = Secret::new("sk-live-123");
        assert_eq!(format!("{:?}", secret), "[REDACTED]");
        assert_eq!(secret.expose(), "sk-live-123");
    }

    #[test]
    fn test_secrets_are_not_serialized() {
        let mut config = AppConfig::default();
        config.network.token = Some(Secret::new("sk-live-123"));
        config.network.proxy.password = Some(Secret::new("hunter2"));

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("sk-live-123"));
        assert!(!json.contains("hunter2"));
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.network.url, "https://api.openai.com/v1/chat/completions");
        assert_eq!(config.network.timeout_seconds, 300);
        assert!(config.cache.root.ends_with("ai-completion"));
        assert!(config.cache.namespace.is_none());
    }
}
