// Assistant configuration supplied by the editor for each request
// Author: kelexine (https://github.com/kelexine)

use crate::config::Secret;
use serde::{Deserialize, Serialize};

/// How the editor presents an exchange.
///
/// Only `Panel` keeps a persistent multi-turn conversation; the other modes
/// edit the buffer in place and send just the messages they are given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptMode {
    #[default]
    Panel,
    Append,
    Insert,
    Replace,
}

impl PromptMode {
    /// Whether cached history is merged into every request.
    pub fn merges_history(self) -> bool {
        matches!(self, PromptMode::Panel)
    }
}

/// Per-assistant settings. Immutable for the duration of a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantSettings {
    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default)]
    pub prompt_mode: PromptMode,

    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    /// Persona text sent as the leading system message.
    #[serde(default)]
    pub assistant_role: Option<String>,

    /// Endpoint override for this assistant.
    #[serde(default)]
    pub url: Option<String>,

    /// Token override for this assistant.
    #[serde(default, skip_serializing)]
    pub token: Option<Secret>,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_top_p")]
    pub top_p: f64,

    /// Allow the promotional appendix on the system message.
    #[serde(default)]
    pub advertisement: bool,
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            name: default_name(),
            prompt_mode: PromptMode::default(),
            chat_model: default_chat_model(),
            assistant_role: None,
            url: None,
            token: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
            advertisement: false,
        }
    }
}

fn default_name() -> String {
    "General Assistant".to_string()
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f64 {
    1.0
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_top_p() -> f64 {
    1.0
}
