//! LLM Provider Strategy Pattern
//!
//! A common interface over chat-completion backends. The agent loop and the
//! domain crates work exclusively through this trait, so swapping the hosted
//! API requires no change to agent logic.

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use crate::error::Result;
use crate::message::Message;

/// Configuration for LLM generation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Model identifier (e.g., "gpt-4o", "gpt-4o-mini")
    pub model: String,

    /// Temperature for sampling (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Top-p nucleus sampling
    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Stop sequences
    #[serde(default)]
    pub stop_sequences: Vec<String>,
}

fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    2048
}
fn default_top_p() -> f32 {
    0.9
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: "gpt-4o".into(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
            stop_sequences: Vec::new(),
        }
    }
}

impl GenerationOptions {
    /// Options for a specific model with the defaults otherwise
    pub fn for_model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Response from an LLM completion
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Completion {
    /// The generated text
    pub content: String,

    /// Model that generated this response
    pub model: String,

    /// Token usage statistics (if available)
    pub usage: Option<TokenUsage>,

    /// Finish reason
    pub finish_reason: Option<FinishReason>,
}

/// Token usage statistics
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Reason for completion finishing
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolUse,
    ContentFilter,
    Error,
}

/// A chunk from streaming completion
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StreamChunk {
    /// The text delta
    pub delta: String,

    /// Whether this is the final chunk
    pub done: bool,

    /// Token usage (typically only on final chunk)
    pub usage: Option<TokenUsage>,
}

/// Stream type for completion streaming
pub type CompletionStream = Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send>>;

/// Strategy trait for LLM providers
///
/// Implement this trait to add support for new chat-completion backends.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a completion from messages
    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion>;

    /// Generate a streaming completion; chunks arrive in generation order
    async fn complete_stream(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<CompletionStream>;
}
