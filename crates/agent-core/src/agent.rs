//! Single-turn Agent Loop
//!
//! One conversational turn: send the conversation to the LLM, finish when it
//! answers with an assistant message, otherwise execute the named tool, feed
//! the result back, and loop. Iterations are bounded.

use std::sync::Arc;

use crate::error::{AgentError, Result};
use crate::message::{Conversation, Message, Role};
use crate::provider::{GenerationOptions, LlmProvider};
use crate::tool::{ToolCall, ToolRegistry, ToolResult};

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// System prompt template
    pub system_prompt: String,

    /// Maximum loop iterations before giving up
    pub max_iterations: usize,

    /// Generation options
    pub generation: GenerationOptions,

    /// Whether to append tool descriptions to the system prompt
    pub inject_tool_descriptions: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            max_iterations: 10,
            generation: GenerationOptions::default(),
            inject_tool_descriptions: true,
        }
    }
}

const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a helpful AI assistant.

When you need to use a tool, respond with a JSON block in this exact format:
```tool
{"tool": "tool_name", "arguments": {"arg1": "value1"}}
```

After receiving tool results, synthesize them into a helpful response.
If you can answer directly without tools, do so.
Be concise and accurate."#;

/// The main Agent struct
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    config: AgentConfig,
}

impl Agent {
    /// Create a new agent
    pub fn new(provider: Arc<dyn LlmProvider>, tools: Arc<ToolRegistry>, config: AgentConfig) -> Self {
        Self {
            provider,
            tools,
            config,
        }
    }

    /// Build the full system prompt including tool descriptions
    fn build_system_prompt(&self) -> String {
        let mut prompt = self.config.system_prompt.clone();

        if self.config.inject_tool_descriptions && !self.tools.is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(&self.tools.generate_prompt_section());
        }

        prompt
    }

    /// Drive one turn over an existing conversation
    pub async fn run(&self, conversation: &mut Conversation) -> Result<String> {
        if conversation.messages().first().map(|m| &m.role) != Some(&Role::System) {
            let messages = conversation.messages_mut();
            messages.insert(0, Message::system(self.build_system_prompt()));
        }

        let mut iterations = 0;

        loop {
            iterations += 1;

            if iterations > self.config.max_iterations {
                return Err(AgentError::MaxIterations(self.config.max_iterations));
            }

            let completion = self
                .provider
                .complete(conversation.messages(), &self.config.generation)
                .await?;

            let content = completion.content.clone();
            conversation.push(Message::assistant(&content));

            if let Some(tool_call) = parse_tool_call(&content) {
                tracing::debug!(tool = %tool_call.name, "Executing tool");

                let result = self.execute_tool(&tool_call).await;
                let tool_message = format_tool_result(&result);
                conversation.push(Message::tool(tool_message, tool_call.id.clone()));

                continue;
            }

            // No tool call - this is the final response
            return Ok(content);
        }
    }

    /// Run with a simple string input (creates a temporary conversation)
    pub async fn ask(&self, question: &str) -> Result<String> {
        let mut conversation = Conversation::with_system_prompt(self.build_system_prompt());
        conversation.push(Message::user(question));
        self.run(&mut conversation).await
    }

    /// Execute a tool call, folding errors into a failed result for the model
    async fn execute_tool(&self, call: &ToolCall) -> ToolResult {
        match self.tools.execute(call).await {
            Ok(mut result) => {
                result.id = call.id.clone();
                result
            }
            Err(e) => ToolResult {
                name: call.name.clone(),
                id: call.id.clone(),
                success: false,
                output: format!("Error: {}", e),
            },
        }
    }

    /// Get the tool registry
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Get configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}

/// Parse a fenced ```tool block (or inline tool JSON) from an LLM response
pub fn parse_tool_call(content: &str) -> Option<ToolCall> {
    let tool_start = "```tool";
    let tool_end = "```";

    if let Some(start_idx) = content.find(tool_start) {
        let after_marker = &content[start_idx + tool_start.len()..];
        if let Some(end_idx) = after_marker.find(tool_end) {
            let json_str = after_marker[..end_idx].trim();

            if let Ok(mut call) = serde_json::from_str::<ToolCall>(json_str) {
                if call.id.is_none() {
                    call.id = Some(uuid::Uuid::new_v4().to_string());
                }
                return Some(call);
            }
        }
    }

    parse_inline_tool_call(content)
}

/// Fallback: raw JSON object with a "tool" key somewhere in the content
fn parse_inline_tool_call(content: &str) -> Option<ToolCall> {
    if !content.contains(r#""tool""#) {
        return None;
    }

    let start = content.find('{')?;
    let end = content.rfind('}')?;

    if end <= start {
        return None;
    }

    let json_str = &content[start..=end];
    serde_json::from_str::<ToolCall>(json_str).ok()
}

/// Format a tool result for the conversation
fn format_tool_result(result: &ToolResult) -> String {
    if result.success {
        format!("[Tool '{}' returned]\n{}", result.name, result.output)
    } else {
        format!("[Tool '{}' failed]\n{}", result.name, result.output)
    }
}

/// Builder for Agent configuration
pub struct AgentBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    tools: ToolRegistry,
    config: AgentConfig,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            tools: ToolRegistry::new(),
            config: AgentConfig::default(),
        }
    }

    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn tool<T: crate::tool::Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.register(tool);
        self
    }

    pub fn shared_tool(mut self, tool: Arc<dyn crate::tool::Tool>) -> Self {
        self.tools.register_shared(tool);
        self
    }

    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    pub fn generation(mut self, generation: GenerationOptions) -> Self {
        self.config.generation = generation;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.generation.model = model.into();
        self
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.config.generation.temperature = temp;
        self
    }

    pub fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    pub fn build(self) -> Result<Agent> {
        let provider = self
            .provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;

        Ok(Agent::new(provider, Arc::new(self.tools), self.config))
    }
}
