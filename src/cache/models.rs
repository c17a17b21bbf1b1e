//! Record, counter and read-result models for the local chat cache.

// Author: kelexine (https://github.com/kelexine)

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One conversation turn, stored as a single JSON line.
///
/// Provider-specific fields (`name`, `tool_calls`, ...) are kept in `extra`
/// and written back verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub role: Role,
    pub content: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            extra: Map::new(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Rough token estimate for this turn: 1 token ≈ 4 characters.
    pub fn approx_tokens(&self) -> u64 {
        (self.content.chars().count() / 4) as u64
    }
}

/// A history line that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    /// 1-based line number in the history file.
    pub line_number: usize,
    pub error: String,
}

/// Result of reading the history file.
///
/// Bad lines never abort a read; they are reported here so the caller can
/// decide whether the user needs to know.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryRead {
    pub records: Vec<Record>,
    pub skipped: Vec<SkippedLine>,
}

impl HistoryRead {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}

/// Additive token usage counters.
///
/// Keys other than the three well-known ones are carried in `extra` as raw
/// JSON: integer values accumulate, anything else is kept untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCounters {
    #[serde(default, deserialize_with = "lenient_count")]
    pub prompt_tokens: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub completion_tokens: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_tokens: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TokenCounters {
    pub fn prompt(tokens: u64) -> Self {
        Self {
            prompt_tokens: tokens,
            ..Self::default()
        }
    }

    pub fn completion(tokens: u64) -> Self {
        Self {
            completion_tokens: tokens,
            ..Self::default()
        }
    }

    /// Look up a counter by its on-disk key.
    pub fn get(&self, key: &str) -> u64 {
        match key {
            "prompt_tokens" => self.prompt_tokens,
            "completion_tokens" => self.completion_tokens,
            "total_tokens" => self.total_tokens,
            other => self.extra.get(other).and_then(Value::as_u64).unwrap_or(0),
        }
    }

    /// Set an extra counter, replacing whatever the key held.
    pub fn set(&mut self, key: impl Into<String>, value: u64) {
        self.extra.insert(key.into(), Value::from(value));
    }

    /// Add every key of `delta` into `self`, creating unknown keys as needed.
    ///
    /// Only integer pairs are summed. A stored non-integer value is left as
    /// it is; a non-integer delta is copied in only when the key is new.
    pub fn merge(&mut self, delta: &TokenCounters) {
        self.prompt_tokens = self.prompt_tokens.saturating_add(delta.prompt_tokens);
        self.completion_tokens = self
            .completion_tokens
            .saturating_add(delta.completion_tokens);
        self.total_tokens = self.total_tokens.saturating_add(delta.total_tokens);
        for (key, value) in &delta.extra {
            match (self.extra.get_mut(key), value.as_u64()) {
                (Some(current), Some(added)) => {
                    if let Some(existing) = current.as_u64() {
                        *current = Value::from(existing.saturating_add(added));
                    }
                }
                (Some(_), None) => {}
                (None, _) => {
                    self.extra.insert(key.clone(), value.clone());
                }
            }
        }
    }

    /// Status line for the chat view: `[⬆️: 1,234 + ⬇️: 56 = 1,290]`.
    pub fn status_message(&self) -> String {
        let total = self.prompt_tokens.saturating_add(self.completion_tokens);
        format!(
            "[⬆️: {} + ⬇️: {} = {}]",
            group_thousands(self.prompt_tokens),
            group_thousands(self.completion_tokens),
            group_thousands(total)
        )
    }
}

/// Accept any JSON for a well-known counter: non-negative integers are
/// kept, whole non-negative floats are truncated, everything else reads as 0.
fn lenient_count<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        _ => 0,
    })
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
