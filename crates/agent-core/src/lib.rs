//! # agent-core
//!
//! Provider-agnostic building blocks for single-turn LLM agents:
//! conversation types, an explicit tool registry, and the tool-calling loop.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Agent                                │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │  Turn loop  │──│    Tool     │──│   LlmProvider       │  │
//! │  │             │  │   Registry  │  │   (Strategy)        │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Tools are registered explicitly at startup (name → schema + handler);
//! there is no runtime reflection. The `LlmProvider` trait keeps the loop
//! independent of any particular hosted API.

pub mod agent;
pub mod error;
pub mod message;
pub mod provider;
pub mod tool;

pub use agent::{Agent, AgentBuilder, AgentConfig};
pub use error::{AgentError, Result};
pub use message::{Attachment, Conversation, Message, Role};
pub use provider::LlmProvider;
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult, ToolSchema};
