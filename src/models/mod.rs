//! Data models shared across the crate.
//!
//! - Assistant configuration supplied by the editor (`assistant`)
//! - Request and streamed-response bodies of the completion API (`chat`)

// Author: kelexine (https://github.com/kelexine)

pub mod assistant;
pub mod chat;

pub use assistant::{AssistantSettings, PromptMode};
pub use chat::{ChatChunk, ChatRequest};
