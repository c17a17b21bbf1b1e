// Outgoing payload assembly
// Author: kelexine (https://github.com/kelexine)

use crate::cache::{Cacher, Record, TokenCounters};
use crate::config::default_advertisement_text;
use crate::error::Result;
use crate::models::{AssistantSettings, ChatRequest};
use tracing::{debug, warn};

/// Decides whether the promotional appendix goes out with this request.
pub trait AdvertisementGate {
    fn show(&self) -> bool;
}

/// Fair coin flip per request.
#[derive(Debug, Default, Clone, Copy)]
pub struct CoinFlip;

impl AdvertisementGate for CoinFlip {
    fn show(&self) -> bool {
        rand::random::<bool>()
    }
}

/// Fixed decision, for tests and for callers that want it always on or off.
impl AdvertisementGate for bool {
    fn show(&self) -> bool {
        *self
    }
}

/// A serialized request body plus what went into it.
#[derive(Debug, Clone)]
pub struct PreparedPayload {
    pub body: String,
    /// Estimated prompt size, already added to the token counters.
    pub prompt_tokens: u64,
    pub message_count: usize,
}

/// Approximate prompt size: 1 token ≈ 4 characters of message content.
///
/// This is a cheap heuristic, not a tokenizer; real counts differ by model.
pub fn estimate_prompt_tokens(messages: &[Record]) -> u64 {
    messages.iter().map(Record::approx_tokens).sum()
}

/// Builds the exact body for one completion request.
pub struct RequestBuilder<'a> {
    cacher: &'a Cacher,
    gate: Box<dyn AdvertisementGate + 'a>,
    advertisement_text: String,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(cacher: &'a Cacher) -> Self {
        Self {
            cacher,
            gate: Box::new(CoinFlip),
            advertisement_text: default_advertisement_text(),
        }
    }

    /// Replace the advertisement decision (e.g. `false` to never show it).
    pub fn with_gate(mut self, gate: impl AdvertisementGate + 'a) -> Self {
        self.gate = Box::new(gate);
        self
    }

    pub fn with_advertisement_text(mut self, text: impl Into<String>) -> Self {
        self.advertisement_text = text.into();
        self
    }

    /// Merge persona, cached history (panel mode) and `messages` into a
    /// streaming request body, and record the prompt estimate.
    pub fn prepare_payload(
        &self,
        assistant: &AssistantSettings,
        messages: &[Record],
    ) -> Result<PreparedPayload> {
        let mut internal: Vec<Record> = Vec::with_capacity(messages.len() + 1);

        // 1. Persona as the leading system message
        if let Some(role) = assistant.assistant_role.as_deref().filter(|r| !r.is_empty()) {
            internal.push(Record::system(self.system_text(assistant, role)));
        }

        // 2. Conversation so far
        if assistant.prompt_mode.merges_history() {
            let history = self.cacher.read_all()?;
            if !history.is_clean() {
                warn!(
                    "Sending history without {} unreadable lines",
                    history.skipped.len()
                );
            }
            internal.extend(history.records);
        }

        // 3. New turns
        internal.extend_from_slice(messages);

        // 4. Token accounting
        let prompt_tokens = estimate_prompt_tokens(&internal);
        self.cacher
            .accumulate_tokens(&TokenCounters::prompt(prompt_tokens))?;

        let body = serde_json::to_string(&ChatRequest {
            messages: &internal,
            model: &assistant.chat_model,
            temperature: assistant.temperature,
            max_tokens: assistant.max_tokens,
            top_p: assistant.top_p,
            stream: true,
        })?;

        debug!(
            "Prepared payload for {}: {} messages, ~{} prompt tokens",
            assistant.chat_model,
            internal.len(),
            prompt_tokens
        );

        Ok(PreparedPayload {
            body,
            prompt_tokens,
            message_count: internal.len(),
        })
    }

    fn system_text(&self, assistant: &AssistantSettings, role: &str) -> String {
        if assistant.advertisement && !self.advertisement_text.is_empty() && self.gate.show() {
            format!("{}\n{}", role, self.advertisement_text)
        } else {
            role.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Role;
    use crate::models::PromptMode;
    use serde_json::Value;
    use tempfile::TempDir;

    fn cacher() -> (Cacher, TempDir) {
        let dir = TempDir::new().unwrap();
        (Cacher::new(dir.path(), None).unwrap(), dir)
    }

    fn body(payload: &PreparedPayload) -> Value {
        serde_json::from_str(&payload.body).unwrap()
    }

    #[test]
    fn test_payload_shape() {
        let (cacher, _dir) = cacher();
        let assistant = AssistantSettings {
            chat_model: "gpt-4o".to_string(),
            temperature: 0.3,
            max_tokens: 512,
            top_p: 0.9,
            ..AssistantSettings::default()
        };

        let payload = RequestBuilder::new(&cacher)
            .prepare_payload(&assistant, &[Record::user("hi")])
            .unwrap();
        let json = body(&payload);

        assert_eq!(json["model"], "gpt-4o");
        assert_eq!(json["temperature"], 0.3);
        assert_eq!(json["max_tokens"], 512);
        assert_eq!(json["top_p"], 0.9);
        assert_eq!(json["stream"], true);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hi");
    }

    #[test]
    fn test_advertisement_gate_controls_appendix() {
        let (cacher, _dir) = cacher();
        let assistant = AssistantSettings {
            assistant_role: Some("You are a pirate.".to_string()),
            advertisement: true,
            ..AssistantSettings::default()
        };

        let shown = RequestBuilder::new(&cacher)
            .with_gate(true)
            .with_advertisement_text("Please donate.")
            .prepare_payload(&assistant, &[])
            .unwrap();
        assert_eq!(
            body(&shown)["messages"][0]["content"],
            "You are a pirate.\nPlease donate."
        );

        let hidden = RequestBuilder::new(&cacher)
            .with_gate(false)
            .with_advertisement_text("Please donate.")
            .prepare_payload(&assistant, &[])
            .unwrap();
        assert_eq!(body(&hidden)["messages"][0]["content"], "You are a pirate.");
    }

    #[test]
    fn test_advertisement_flag_off_ignores_gate() {
        let (cacher, _dir) = cacher();
        let assistant = AssistantSettings {
            assistant_role: Some("You are a pirate.".to_string()),
            advertisement: false,
            ..AssistantSettings::default()
        };

        let payload = RequestBuilder::new(&cacher)
            .with_gate(true)
            .prepare_payload(&assistant, &[])
            .unwrap();

        assert_eq!(body(&payload)["messages"][0]["content"], "You are a pirate.");
    }

    #[test]
    fn test_empty_role_adds_no_system_message() {
        let (cacher, _dir) = cacher();
        let assistant = AssistantSettings {
            assistant_role: Some(String::new()),
            ..AssistantSettings::default()
        };

        let payload = RequestBuilder::new(&cacher)
            .prepare_payload(&assistant, &[Record::user("hi")])
            .unwrap();

        assert_eq!(payload.message_count, 1);
    }

    #[test]
    fn test_panel_mode_merges_history() {
        let (cacher, _dir) = cacher();
        cacher
            .append_batch(&[Record::user("earlier"), Record::assistant("reply")])
            .unwrap();
        let assistant = AssistantSettings {
            assistant_role: Some("sys".to_string()),
            prompt_mode: PromptMode::Panel,
            ..AssistantSettings::default()
        };

        let payload = RequestBuilder::new(&cacher)
            .with_gate(false)
            .prepare_payload(&assistant, &[Record::user("now")])
            .unwrap();
        let json = body(&payload);
        let contents: Vec<&str> = json["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["content"].as_str().unwrap())
            .collect();

        assert_eq!(contents, vec!["sys", "earlier", "reply", "now"]);
        assert_eq!(json["messages"][0]["role"], "system");
    }

    #[test]
    fn test_other_modes_skip_history() {
        let (cacher, _dir) = cacher();
        cacher.append_batch(&[Record::user("earlier")]).unwrap();

        for mode in [PromptMode::Append, PromptMode::Insert, PromptMode::Replace] {
            let assistant = AssistantSettings {
                prompt_mode: mode,
                ..AssistantSettings::default()
            };

            let payload = RequestBuilder::new(&cacher)
                .prepare_payload(&assistant, &[Record::user("only this")])
                .unwrap();
            let json = body(&payload);

            assert_eq!(json["messages"].as_array().unwrap().len(), 1, "{:?}", mode);
            assert_eq!(json["messages"][0]["content"], "only this");
        }
    }

    #[test]
    fn test_prompt_tokens_are_recorded() {
        let (cacher, _dir) = cacher();
        let assistant = AssistantSettings {
            prompt_mode: PromptMode::Append,
            ..AssistantSettings::default()
        };
        let message = Record::user("x".repeat(40));

        let payload = RequestBuilder::new(&cacher)
            .prepare_payload(&assistant, &[message.clone()])
            .unwrap();
        assert_eq!(payload.prompt_tokens, 10);

        RequestBuilder::new(&cacher)
            .prepare_payload(&assistant, &[message])
            .unwrap();
        assert_eq!(cacher.read_tokens_count().unwrap().prompt_tokens, 20);
    }

    #[test]
    fn test_estimate_sums_per_message() {
        let messages = vec![
            Record::system("abcd".repeat(3)),
            Record::new(Role::User, "abc"),
            Record::assistant("x".repeat(40)),
        ];
        // 12/4 + 3/4 + 40/4, floored per message
        assert_eq!(estimate_prompt_tokens(&messages), 3 + 0 + 10);
    }
}
