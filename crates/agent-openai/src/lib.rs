//! OpenAI Provider
//!
//! Hosted chat-completions backend for the agent framework. Implements
//! [`agent_core::LlmProvider`] against the OpenAI `/chat/completions` API,
//! including SSE streaming and multimodal user messages (images inlined as
//! base64 data URLs).

pub mod openai;

pub use openai::{OpenAiConfig, OpenAiProvider, GPT_4O, GPT_4O_MINI};
