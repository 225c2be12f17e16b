//! Calculator and person-lookup demo
//!
//! One conversational turn: the agent extracts two numbers (or a name) from
//! free-form input and answers via the arithmetic or lookup tools.

use std::io::BufRead;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use agent_core::agent::AgentBuilder;
use agent_core::error::Result;
use agent_core::provider::GenerationOptions;
use agent_core::tool::{
    AddTool, DivideTool, MultiplyTool, ParameterSchema, SubtractTool, Tool, ToolCall, ToolResult,
    ToolSchema, require_str,
};
use agent_openai::{GPT_4O, OpenAiProvider};

const SYSTEM_PROMPT: &str = "\
You are a simple calculator assistant.
You can do any operation (add, subtract, multiply and divide) with two numbers using the calculator tools.
When the user provides input, extract the two numbers and use the matching tool.
The input might be in various formats like \"add 5 and 7\", \"5 + 7\", or just \"5 7\".
Also, given the user has sent a name for search, you can find the person with that name using the findByName tool.
Always respond with a clear, friendly message showing the calculation and result.";

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Person {
    name: String,
    age: u32,
}

/// Finds a person in a fixed demo list by exact name
struct FindByNameTool {
    people: Vec<Person>,
}

impl FindByNameTool {
    fn demo() -> Self {
        Self {
            people: vec![
                Person { name: "Alice".into(), age: 23 },
                Person { name: "Lucas".into(), age: 20 },
                Person { name: "John".into(), age: 15 },
            ],
        }
    }
}

#[async_trait]
impl Tool for FindByNameTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "findByName".into(),
            description: "Finds a person in the list by their name and returns the person. \
                          Each person has a name and age. Returns null if nobody matches."
                .into(),
            parameters: vec![ParameterSchema::required(
                "name",
                "string",
                "Name of the person to find",
            )],
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let name = require_str(call, "name")?;
        let output = match self.people.iter().find(|p| p.name == name) {
            Some(person) => serde_json::to_string(person)?,
            None => "null".into(),
        };
        Ok(ToolResult::success("findByName", output))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let provider = Arc::new(OpenAiProvider::from_env().context("OpenAI configuration")?);

    let agent = AgentBuilder::new()
        .provider(provider)
        .system_prompt(SYSTEM_PROMPT)
        .generation(GenerationOptions::for_model(GPT_4O))
        .max_iterations(30)
        .tool(AddTool)
        .tool(SubtractTool)
        .tool(MultiplyTool)
        .tool(DivideTool)
        .tool(FindByNameTool::demo())
        .build()?;

    println!("Enter two numbers to do an operation");

    let mut input = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut input)
        .context("reading input")?;

    let result = agent.ask(input.trim()).await?;
    println!("{}", result);

    Ok(())
}
