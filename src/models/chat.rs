// Chat-completion wire types
// Author: kelexine (https://github.com/kelexine)

use crate::cache::Record;
use serde::{Deserialize, Serialize};

/// Outgoing request body. `stream` is always true.
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub messages: &'a [Record],
    pub model: &'a str,
    pub temperature: f64,
    pub max_tokens: u32,
    pub top_p: f64,
    pub stream: bool,
}

/// One `data:` chunk of a streamed completion.
#[derive(Debug, Deserialize)]
pub struct ChatChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatChunk {
    /// Text carried by the first choice, if any.
    pub fn delta_text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.delta.content.as_deref())
    }
}
