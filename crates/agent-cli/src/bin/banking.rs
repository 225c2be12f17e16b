//! Banking assistant demo
//!
//! Reads one request from stdin, classifies it, and routes it to the
//! transfer or analytics sub-agent. Requires `OPENAI_API_KEY`.

use std::io::BufRead;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use agent_core::tool::AskUserTool;
use agent_openai::OpenAiProvider;
use banking_assistant::BankingAssistant;

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
    let assistant = BankingAssistant::new(provider, Arc::new(AskUserTool::stdin()));

    println!("Banking Assistant started");
    println!("Examples:");
    println!("  - Send 50 euros to Alice for the concert tickets");
    println!("  - Transfer 100 to Bob for groceries");
    println!("  - How much have I spent on restaurants this month?");

    let mut input = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut input)
        .context("reading request")?;

    let result = assistant.handle(input.trim()).await?;
    println!("Result: {}", result);

    Ok(())
}
