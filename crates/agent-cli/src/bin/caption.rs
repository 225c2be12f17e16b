//! Image caption streaming demo
//!
//! Builds one multimodal prompt (system instruction, markdown user message,
//! image attachments from the command line) and streams the caption to
//! stdout as it is generated.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, bail};
use futures::StreamExt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use agent_core::message::{Attachment, Message};
use agent_core::provider::{GenerationOptions, LlmProvider};
use agent_openai::{GPT_4O, OpenAiProvider};

const SYSTEM_PROMPT: &str =
    "You are a professional assistant that can write cool and funny descriptions for Instagram posts.";

const USER_PROMPT: &str = "\
I want to create a new post on Instagram.

Can you write brazilian portuguese something creative under my instagram post with the following photos?

## Requirements
- It must be very funny and creative.
- It must increase my chance of becoming an ultra-famous blogger!!!!
- It not contain explicit content, harassment or bullying
- It must be a short catching phrase
- You must include relevant hashtags that would increase the visibility of my post";

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

    let images: Vec<String> = std::env::args().skip(1).collect();
    if images.is_empty() {
        bail!("usage: caption <image>...");
    }

    let provider = Arc::new(OpenAiProvider::from_env().context("OpenAI configuration")?);

    let mut user = Message::user(USER_PROMPT);
    for image in &images {
        user = user.with_attachment(Attachment::image(image));
    }
    let messages = vec![Message::system(SYSTEM_PROMPT), user];

    let mut stream = provider
        .complete_stream(&messages, &GenerationOptions::for_model(GPT_4O))
        .await?;

    // Drain in arrival order; the final caption is the concatenation.
    let mut caption = String::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if chunk.done {
            break;
        }
        print!("{}", chunk.delta);
        std::io::stdout().flush()?;
        caption.push_str(&chunk.delta);
    }
    println!();

    tracing::debug!(chars = caption.len(), "Caption complete");

    Ok(())
}
