//! Tool System
//!
//! Tools are named, typed functions the LLM can invoke during a turn. They
//! are registered explicitly at startup (name → schema + handler); nothing
//! is discovered by reflection. Results are plain strings: domain failures
//! travel back to the model as sentinel text inside a successful result,
//! the typed error channel is reserved for infrastructure faults.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::sync::{Arc, Mutex};

use crate::error::{AgentError, Result};

/// Tool call request from the LLM
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool identifier
    #[serde(alias = "tool")]
    pub name: String,

    /// Arguments as a flat key-value map
    #[serde(default)]
    pub arguments: HashMap<String, serde_json::Value>,

    /// Optional call ID for tracking
    #[serde(default)]
    pub id: Option<String>,
}

/// Result from tool execution
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolResult {
    /// Tool that was called
    pub name: String,

    /// Call ID (if provided in request)
    pub id: Option<String>,

    /// Whether execution succeeded
    pub success: bool,

    /// Output (success message or error)
    pub output: String,
}

impl ToolResult {
    pub fn success(name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            success: true,
            output: output.into(),
        }
    }

    pub fn failure(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            success: false,
            output: error.into(),
        }
    }
}

/// Parameter definition for tool schema
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// JSON Schema type (string, number, boolean, object, array)
    #[serde(rename = "type")]
    pub param_type: String,

    /// Human-readable description
    pub description: String,

    /// Whether this parameter is required
    #[serde(default)]
    pub required: bool,

    /// Default value if not provided
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

impl ParameterSchema {
    /// Shorthand for a required parameter
    pub fn required(
        name: impl Into<String>,
        param_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            description: description.into(),
            required: true,
            default: None,
        }
    }

    /// Shorthand for an optional parameter with a default
    pub fn optional(
        name: impl Into<String>,
        param_type: impl Into<String>,
        description: impl Into<String>,
        default: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            description: description.into(),
            required: false,
            default: Some(default),
        }
    }
}

/// Tool definition schema (shown to the LLM)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// Parameter definitions
    pub parameters: Vec<ParameterSchema>,

    /// Whether tool has side effects
    #[serde(default)]
    pub has_side_effects: bool,
}

/// Tool trait - implement to add new capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool's schema
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with given arguments
    async fn execute(&self, call: &ToolCall) -> Result<ToolResult>;

    /// Validate arguments before execution (optional)
    fn validate(&self, call: &ToolCall) -> Result<()> {
        let schema = self.schema();

        for param in &schema.parameters {
            if param.required && !call.arguments.contains_key(&param.name) {
                return Err(AgentError::ToolValidation(format!(
                    "Missing required parameter: {}",
                    param.name
                )));
            }
        }

        Ok(())
    }
}

/// Registry for available tools
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a new tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        let schema = tool.schema();
        self.tools.insert(schema.name, Arc::new(tool));
    }

    /// Register a shared tool
    pub fn register_shared(&mut self, tool: Arc<dyn Tool>) {
        let schema = tool.schema();
        self.tools.insert(schema.name, tool);
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Execute a tool call
    pub async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let tool = self
            .get(&call.name)
            .ok_or_else(|| AgentError::ToolNotFound(call.name.clone()))?;

        tool.validate(call)?;
        tool.execute(call).await
    }

    /// Get all tool schemas (for system prompt generation)
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.values().map(|t| t.schema()).collect()
    }

    /// Get tool names
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Generate system prompt section describing available tools
    pub fn generate_prompt_section(&self) -> String {
        let mut prompt = String::from("## Available Tools\n\n");
        prompt.push_str("You can use the following tools by responding with a JSON block:\n\n");
        prompt.push_str(
            "```tool\n{\"tool\": \"tool_name\", \"arguments\": {\"arg\": \"value\"}}\n```\n\n",
        );

        let mut schemas = self.schemas();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));

        for schema in schemas {
            prompt.push_str(&format!("### {}\n", schema.name));
            prompt.push_str(&format!("{}\n", schema.description));

            if !schema.parameters.is_empty() {
                prompt.push_str("**Parameters:**\n");
                for param in &schema.parameters {
                    let required = if param.required { " (required)" } else { "" };
                    prompt.push_str(&format!(
                        "- `{}` ({}){}: {}\n",
                        param.name, param.param_type, required, param.description
                    ));
                }
            }
            prompt.push('\n');
        }

        prompt
    }
}

// ============================================================================
// Argument helpers
// ============================================================================

/// Read an integer argument, accepting numeric or stringified values
pub fn require_i64(call: &ToolCall, name: &str) -> Result<i64> {
    let value = call
        .arguments
        .get(name)
        .ok_or_else(|| AgentError::ToolValidation(format!("Missing argument: {}", name)))?;

    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        .ok_or_else(|| AgentError::ToolValidation(format!("Argument '{}' must be an integer", name)))
}

/// Read a string argument
pub fn require_str<'a>(call: &'a ToolCall, name: &str) -> Result<&'a str> {
    call.arguments
        .get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| AgentError::ToolValidation(format!("Missing argument: {}", name)))
}

/// Read an optional boolean argument, defaulting when absent
pub fn optional_bool(call: &ToolCall, name: &str, default: bool) -> bool {
    call.arguments
        .get(name)
        .and_then(|v| {
            v.as_bool()
                .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
        })
        .unwrap_or(default)
}

// ============================================================================
// Built-in Tools
// ============================================================================

/// Clarification tool: relays a question to the user and returns their reply.
///
/// The reply source is injected so tests can script answers; the demos use
/// stdin.
pub struct AskUserTool {
    reader: Mutex<Box<dyn BufRead + Send>>,
}

impl AskUserTool {
    /// Read replies from standard input
    pub fn stdin() -> Self {
        Self::from_reader(BufReader::new(std::io::stdin()))
    }

    /// Read replies from any buffered source (scripted answers in tests)
    pub fn from_reader(reader: impl BufRead + Send + 'static) -> Self {
        Self {
            reader: Mutex::new(Box::new(reader)),
        }
    }
}

#[async_trait]
impl Tool for AskUserTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "ask_user".into(),
            description: "Ask the user a clarifying question and return their answer.".into(),
            parameters: vec![ParameterSchema::required(
                "message",
                "string",
                "The question to show the user",
            )],
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let message = require_str(call, "message")?;

        println!("{}", message);
        std::io::stdout().flush()?;

        let mut reply = String::new();
        {
            let mut reader = self
                .reader
                .lock()
                .map_err(|_| AgentError::ToolExecution("ask_user reader poisoned".into()))?;
            reader.read_line(&mut reply)?;
        }

        Ok(ToolResult::success("ask_user", reply.trim().to_string()))
    }
}

fn arithmetic_schema(name: &str, description: &str) -> ToolSchema {
    ToolSchema {
        name: name.into(),
        description: description.into(),
        parameters: vec![
            ParameterSchema::required("num1", "integer", "First number (integer value)"),
            ParameterSchema::required("num2", "integer", "Second number (integer value)"),
        ],
        has_side_effects: false,
    }
}

/// Adds two integers
pub struct AddTool;

#[async_trait]
impl Tool for AddTool {
    fn schema(&self) -> ToolSchema {
        arithmetic_schema("add", "Add two numbers together and return their sum.")
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let (a, b) = (require_i64(call, "num1")?, require_i64(call, "num2")?);
        Ok(ToolResult::success(
            "add",
            format!("The sum of {} and {} is: {}.", a, b, a + b),
        ))
    }
}

/// Subtracts the second integer from the first
pub struct SubtractTool;

#[async_trait]
impl Tool for SubtractTool {
    fn schema(&self) -> ToolSchema {
        arithmetic_schema(
            "subtract",
            "Subtract the second number from the first and return the difference.",
        )
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let (a, b) = (require_i64(call, "num1")?, require_i64(call, "num2")?);
        Ok(ToolResult::success(
            "subtract",
            format!("The subtraction of {} and {} is: {}.", a, b, a - b),
        ))
    }
}

/// Multiplies two integers
pub struct MultiplyTool;

#[async_trait]
impl Tool for MultiplyTool {
    fn schema(&self) -> ToolSchema {
        arithmetic_schema(
            "multiply",
            "Multiply two numbers together and return their product.",
        )
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let (a, b) = (require_i64(call, "num1")?, require_i64(call, "num2")?);
        Ok(ToolResult::success(
            "multiply",
            format!("The product of {} and {} is: {}.", a, b, a * b),
        ))
    }
}

/// Divides the first integer by the second, reporting a floating result
pub struct DivideTool;

#[async_trait]
impl Tool for DivideTool {
    fn schema(&self) -> ToolSchema {
        arithmetic_schema(
            "divide",
            "Divide the first number by the second and return the quotient as a decimal.",
        )
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let (a, b) = (require_i64(call, "num1")?, require_i64(call, "num2")?);
        if b == 0 {
            return Ok(ToolResult::failure("divide", "Division by zero"));
        }
        let quotient = a as f64 / b as f64;
        Ok(ToolResult::success(
            "divide",
            format!("The division of {} and {} is: {}.", a, b, quotient),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(name: &str, arguments: serde_json::Value) -> ToolCall {
        ToolCall {
            name: name.into(),
            arguments: serde_json::from_value(arguments).unwrap(),
            id: None,
        }
    }

    #[test]
    fn test_tool_registry() {
        let mut registry = ToolRegistry::new();
        registry.register(AddTool);
        registry.register(SubtractTool);
        registry.register(MultiplyTool);
        registry.register(DivideTool);

        assert_eq!(registry.len(), 4);
        assert!(registry.get("add").is_some());
        assert!(registry.get("unknown").is_none());
    }

    #[test]
    fn test_validate_missing_param() {
        let result = AddTool.validate(&call("add", json!({ "num1": 5 })));
        assert!(matches!(result, Err(AgentError::ToolValidation(_))));
    }

    #[test]
    fn test_prompt_section_lists_tools() {
        let mut registry = ToolRegistry::new();
        registry.register(AddTool);
        registry.register(DivideTool);

        let section = registry.generate_prompt_section();
        assert!(section.contains("### add"));
        assert!(section.contains("### divide"));
        assert!(section.contains("`num1` (integer) (required)"));
    }

    #[tokio::test]
    async fn test_arithmetic_tools() {
        let sum = AddTool
            .execute(&call("add", json!({ "num1": 5, "num2": 7 })))
            .await
            .unwrap();
        assert_eq!(sum.output, "The sum of 5 and 7 is: 12.");

        let diff = SubtractTool
            .execute(&call("subtract", json!({ "num1": 5, "num2": 7 })))
            .await
            .unwrap();
        assert_eq!(diff.output, "The subtraction of 5 and 7 is: -2.");

        let product = MultiplyTool
            .execute(&call("multiply", json!({ "num1": 6, "num2": 7 })))
            .await
            .unwrap();
        assert_eq!(product.output, "The product of 6 and 7 is: 42.");

        let quotient = DivideTool
            .execute(&call("divide", json!({ "num1": 7, "num2": 2 })))
            .await
            .unwrap();
        assert_eq!(quotient.output, "The division of 7 and 2 is: 3.5.");
    }

    #[tokio::test]
    async fn test_divide_by_zero_is_failed_result() {
        let result = DivideTool
            .execute(&call("divide", json!({ "num1": 1, "num2": 0 })))
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.output, "Division by zero");
    }

    #[tokio::test]
    async fn test_stringified_integer_arguments() {
        let sum = AddTool
            .execute(&call("add", json!({ "num1": "5", "num2": "7" })))
            .await
            .unwrap();
        assert_eq!(sum.output, "The sum of 5 and 7 is: 12.");
    }

    #[tokio::test]
    async fn test_ask_user_scripted_reply() {
        let tool = AskUserTool::from_reader(std::io::Cursor::new("the second one\n"));
        let result = tool
            .execute(&call("ask_user", json!({ "message": "Which Daniel?" })))
            .await
            .unwrap();
        assert_eq!(result.output, "the second one");
    }

    #[tokio::test]
    async fn test_registry_execute_unknown_tool() {
        let registry = ToolRegistry::new();
        let result = registry.execute(&call("nope", json!({}))).await;
        assert!(matches!(result, Err(AgentError::ToolNotFound(_))));
    }
}
