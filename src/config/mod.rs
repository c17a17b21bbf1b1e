// Configuration module
// Author: kelexine (https://github.com/kelexine)

mod models;

pub use models::*;

use crate::error::{CompletionError, Result};
use config::{Config, Environment, File};
use std::path::{Path, PathBuf};

impl AppConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Environment variables (highest), e.g. `AI_COMPLETION_NETWORK__TOKEN`
    /// 2. Config file (`path`, or `~/.ai-completion/config.toml`)
    /// 3. Defaults (lowest)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            // An explicitly named file must exist
            Some(path) => File::from(path).required(true),
            None => File::with_name(&Self::default_config_path()).required(false),
        };

        let config = Config::builder()
            // Start with defaults
            .add_source(Config::try_from(&Self::default())?)
            .add_source(file)
            .add_source(
                Environment::with_prefix("AI_COMPLETION")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(|e| CompletionError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| CompletionError::Config(e.to_string()))
    }

    fn default_config_path() -> String {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".ai-completion")
            .join("config.toml")
            .to_string_lossy()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PromptMode;
    use std::io::Write;

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[network]
token = "sk-file"
url = "http://localhost:8080"

[network.proxy]
address = "127.0.0.1"
port = 3128

[cache]
namespace = "project"

[assistant]
chat_model = "gpt-4o"
prompt_mode = "append"
temperature = 0.5
"#
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();

        assert_eq!(config.network.token.as_ref().unwrap().expose(), "sk-file");
        assert_eq!(config.network.url, "http://localhost:8080");
        assert_eq!(config.network.proxy.port, Some(3128));
        assert_eq!(config.cache.namespace.as_deref(), Some("project"));
        assert_eq!(config.assistant.chat_model, "gpt-4o");
        assert_eq!(config.assistant.prompt_mode, PromptMode::Append);
        assert_eq!(config.assistant.temperature, 0.5);
        // Untouched keys keep their defaults
        assert_eq!(config.network.timeout_seconds, 300);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = AppConfig::load(Some(Path::new("/nonexistent/ai-completion.toml")));
        assert!(matches!(result, Err(CompletionError::Config(_))));
    }

    #[test]
    fn test_environment_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(file, "[request]\nadvertisement_text = \"from file\"\n").unwrap();

        std::env::set_var("AI_COMPLETION_REQUEST__ADVERTISEMENT_TEXT", "from env");
        let config = AppConfig::load(Some(file.path()));
        std::env::remove_var("AI_COMPLETION_REQUEST__ADVERTISEMENT_TEXT");

        assert_eq!(config.unwrap().request.advertisement_text, "from env");
    }
}
