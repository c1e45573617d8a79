//! The `Llm` trait — the abstraction over LLM backends.
//!
//! An implementation knows how to send an ordered message list to a model
//! and return its reply text. The dialog engine calls `ask()` without
//! knowing which provider is behind it — pure polymorphism, and the seam
//! where tests substitute a fake.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::message::Message;

/// Configuration for one LLM round-trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    /// The model to use (e.g., "gpt-4o-mini", "deepseek-chat")
    pub model: String,

    /// The conversation messages, in order
    pub messages: Vec<Message>,

    /// Temperature (0.0 = deterministic)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.0
}

impl LlmRequest {
    /// A request with extraction-friendly defaults: deterministic output.
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: default_temperature(),
            max_tokens: None,
        }
    }
}

/// The core LLM capability.
///
/// `ask` is a synchronous round-trip from the session's point of view:
/// it either returns the model's reply text or raises a transport-level
/// [`LlmError`], distinguishable from a content error.
#[async_trait]
pub trait Llm: Send + Sync {
    /// A human-readable name for this backend (e.g., "openai", "deepseek").
    fn name(&self) -> &str;

    /// Send the messages and return the reply text.
    async fn ask(&self, request: LlmRequest) -> std::result::Result<String, LlmError>;
}
