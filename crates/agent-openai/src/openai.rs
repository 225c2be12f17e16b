//! OpenAI chat-completions client
//!
//! Speaks the `/chat/completions` wire format. User messages with image
//! attachments are converted into multi-part content with `image_url` parts
//! carrying base64 data URLs; everything else is plain text parts.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures::{StreamExt, future, stream};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use agent_core::error::{AgentError, Result};
use agent_core::message::{Attachment, Message, Role};
use agent_core::provider::{
    Completion, CompletionStream, FinishReason, GenerationOptions, LlmProvider, StreamChunk,
    TokenUsage,
};

/// Default model for tool-calling agents
pub const GPT_4O: &str = "gpt-4o";

/// Smaller model for classification and lightweight turns
pub const GPT_4O_MINI: &str = "gpt-4o-mini";

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI provider configuration
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    /// API key (bearer token)
    pub api_key: String,

    /// Base URL of the API (override for proxies/compatible servers)
    pub base_url: String,

    /// Request timeout
    pub timeout: Duration,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.into(),
            timeout: Duration::from_secs(120),
        }
    }

    /// Read configuration from `OPENAI_API_KEY` and `OPENAI_BASE_URL`
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| AgentError::Config("OPENAI_API_KEY is not set".into()))?;

        let mut config = Self::new(api_key);
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            config.base_url = base_url;
        }
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// OpenAI chat-completions provider
pub struct OpenAiProvider {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AgentError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Provider from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(OpenAiConfig::from_env()?)
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    async fn build_request(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
        stream: bool,
    ) -> Result<ChatRequest> {
        let mut wire_messages = Vec::with_capacity(messages.len());
        for message in messages {
            wire_messages.push(convert_message(message).await?);
        }

        Ok(ChatRequest {
            model: options.model.clone(),
            messages: wire_messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            top_p: options.top_p,
            stop: if options.stop_sequences.is_empty() {
                None
            } else {
                Some(options.stop_sequences.clone())
            },
            stream,
        })
    }

    async fn send(&self, request: &ChatRequest) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    AgentError::ProviderUnavailable(e.to_string())
                } else {
                    AgentError::Provider(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(match status.as_u16() {
            401 | 403 => AgentError::Auth(body),
            429 => AgentError::RateLimited(body),
            _ => AgentError::Provider(format!("HTTP {}: {}", status, body)),
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        let request = self.build_request(messages, options, false).await?;

        tracing::debug!(model = %request.model, messages = request.messages.len(), "Sending completion request");

        let response = self.send(&request).await?;
        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Provider(format!("Malformed response: {}", e)))?;

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Provider("Response contained no choices".into()))?;

        Ok(Completion {
            content: choice.message.content.unwrap_or_default(),
            model: body.model,
            usage: body.usage.map(Into::into),
            finish_reason: choice.finish_reason.as_deref().map(convert_finish_reason),
        })
    }

    async fn complete_stream(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<CompletionStream> {
        let request = self.build_request(messages, options, true).await?;

        tracing::debug!(model = %request.model, "Starting streaming completion");

        let response = self.send(&request).await?;

        let stream = response
            .bytes_stream()
            .scan(SseFrameBuffer::default(), |buffer, chunk| {
                let chunks = match chunk {
                    Ok(bytes) => buffer.push(&bytes),
                    Err(e) => vec![Err(AgentError::Provider(e.to_string()))],
                };
                future::ready(Some(chunks))
            })
            .flat_map(stream::iter);

        Ok(Box::pin(stream))
    }
}

/// Reassembles SSE frames from network chunks.
///
/// `bytes_stream()` yields chunks at transport boundaries, so a
/// `data: {json}\n\n` frame (or a multi-byte UTF-8 character inside one) may
/// arrive split across chunks. Bytes are buffered until the `\n\n` frame
/// terminator appears; only complete frames are decoded and parsed.
#[derive(Default)]
struct SseFrameBuffer {
    pending: Vec<u8>,
}

impl SseFrameBuffer {
    /// Append bytes and parse every frame completed by them
    fn push(&mut self, bytes: &[u8]) -> Vec<Result<StreamChunk>> {
        self.pending.extend_from_slice(bytes);

        let mut chunks = Vec::new();
        while let Some(end) = self.pending.windows(2).position(|w| w == b"\n\n") {
            let frame: Vec<u8> = self.pending.drain(..end + 2).collect();
            match std::str::from_utf8(&frame) {
                Ok(text) => chunks.extend(parse_sse_frame(text)),
                Err(e) => chunks.push(Err(AgentError::Provider(format!(
                    "Invalid UTF-8 in stream frame: {}",
                    e
                )))),
            }
        }
        chunks
    }
}

/// Parse one complete `data: {json}` frame; the stream terminates with
/// `data: [DONE]`. Frames without a data payload (keep-alives) yield nothing.
fn parse_sse_frame(frame: &str) -> Option<Result<StreamChunk>> {
    let payload = frame.trim().strip_prefix("data:")?.trim_start();

    if payload.starts_with("[DONE]") {
        return Some(Ok(StreamChunk {
            delta: String::new(),
            done: true,
            usage: None,
        }));
    }

    let event: StreamEvent = match serde_json::from_str(payload) {
        Ok(event) => event,
        Err(e) => {
            return Some(Err(AgentError::Provider(format!(
                "Malformed stream frame: {}",
                e
            ))));
        }
    };

    let delta = event
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
        .unwrap_or_default();

    Some(Ok(StreamChunk {
        delta,
        done: false,
        usage: event.usage.map(Into::into),
    }))
}

/// Convert a framework message into the wire format
///
/// Tool results are sent back as `user` messages since the tool protocol is
/// text-based rather than the native function-calling API.
async fn convert_message(message: &Message) -> Result<WireMessage> {
    let role = match message.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "user",
    };

    if message.attachments.is_empty() {
        return Ok(WireMessage {
            role,
            content: WireContent::Text(message.content.clone()),
        });
    }

    let mut parts = vec![ContentPart::Text {
        text: message.content.clone(),
    }];

    for attachment in &message.attachments {
        let Attachment::Image { path } = attachment;
        parts.push(ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: encode_image(path).await?,
            },
        });
    }

    Ok(WireMessage {
        role,
        content: WireContent::Parts(parts),
    })
}

/// Read a local image and inline it as a base64 data URL
async fn encode_image(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path).await?;
    let mime = match path.extension().and_then(|e| e.to_str()) {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    };
    Ok(format!("data:{};base64,{}", mime, BASE64.encode(bytes)))
}

fn convert_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "stop" => FinishReason::Stop,
        "length" => FinishReason::Length,
        "tool_calls" => FinishReason::ToolUse,
        "content_filter" => FinishReason::ContentFilter,
        _ => FinishReason::Error,
    }
}

// Wire format types

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: WireContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum WireContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: String,
    choices: Vec<Choice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamEvent {
    choices: Vec<StreamChoice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize, Default)]
struct StreamDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl From<WireUsage> for TokenUsage {
    fn from(u: WireUsage) -> Self {
        Self {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = OpenAiConfig::new("sk-test");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(120));
    }

    #[tokio::test]
    async fn test_convert_text_message() {
        let wire = convert_message(&Message::user("Hello")).await.unwrap();
        assert_eq!(wire.role, "user");
        assert!(matches!(wire.content, WireContent::Text(ref t) if t == "Hello"));
    }

    #[tokio::test]
    async fn test_tool_results_are_sent_as_user_role() {
        let wire = convert_message(&Message::tool("[Tool 'add' returned]\n12", None))
            .await
            .unwrap();
        assert_eq!(wire.role, "user");
    }

    #[tokio::test]
    async fn test_convert_message_with_image() {
        let dir = std::env::temp_dir().join("agent-openai-test");
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("pixel.png");
        tokio::fs::write(&path, [0x89, 0x50, 0x4e, 0x47]).await.unwrap();

        let message = Message::user("Describe this").with_attachment(Attachment::image(&path));
        let wire = convert_message(&message).await.unwrap();

        let WireContent::Parts(parts) = wire.content else {
            panic!("expected multi-part content");
        };
        assert_eq!(parts.len(), 2);
        match &parts[1] {
            ContentPart::ImageUrl { image_url } => {
                assert!(image_url.url.starts_with("data:image/png;base64,"));
            }
            other => panic!("unexpected part: {:?}", other),
        }
    }

    #[test]
    fn test_request_serialization() {
        let request = ChatRequest {
            model: GPT_4O_MINI.into(),
            messages: vec![WireMessage {
                role: "user",
                content: WireContent::Text("hi".into()),
            }],
            temperature: 0.0,
            max_tokens: 256,
            top_p: 0.9,
            stop: None,
            stream: false,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["content"], "hi");
        assert!(json.get("stop").is_none());
    }

    #[test]
    fn test_sse_frames_in_one_chunk() {
        let payload = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
            "data: [DONE]\n\n",
        );

        let mut buffer = SseFrameBuffer::default();
        let chunks: Vec<_> = buffer
            .push(payload.as_bytes())
            .into_iter()
            .map(|c| c.unwrap())
            .collect();

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].delta, "Hel");
        assert_eq!(chunks[1].delta, "lo");
        assert!(chunks[2].done);
    }

    #[test]
    fn test_sse_frame_split_across_chunks_is_reassembled() {
        // Transport boundaries fall anywhere, including mid-frame; the
        // partial halves must not surface as errors or lose the delta.
        let frame = b"data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"}}]}\n\n";
        let (first, second) = frame.split_at(frame.len() / 2);

        let mut buffer = SseFrameBuffer::default();
        assert!(buffer.push(first).is_empty());

        let chunks = buffer.push(second);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_ref().unwrap().delta, "Hello");
    }

    #[test]
    fn test_sse_multibyte_character_split_at_chunk_boundary() {
        let frame = "data: {\"choices\":[{\"delta\":{\"content\":\"é\"}}]}\n\n".as_bytes();
        // Split inside the two-byte UTF-8 sequence for 'é'.
        let mid = frame.iter().position(|&b| b >= 0x80).unwrap() + 1;
        let (first, second) = frame.split_at(mid);

        let mut buffer = SseFrameBuffer::default();
        assert!(buffer.push(first).is_empty());

        let chunks = buffer.push(second);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_ref().unwrap().delta, "é");
    }

    #[test]
    fn test_sse_empty_delta() {
        let mut buffer = SseFrameBuffer::default();
        let chunks = buffer.push(b"data: {\"choices\":[{\"delta\":{}}]}\n\n");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_ref().unwrap().delta, "");
    }

    #[test]
    fn test_sse_keepalive_frame_yields_nothing() {
        let mut buffer = SseFrameBuffer::default();
        assert!(buffer.push(b": keep-alive\n\n").is_empty());
    }

    #[test]
    fn test_finish_reason_mapping() {
        assert_eq!(convert_finish_reason("stop"), FinishReason::Stop);
        assert_eq!(convert_finish_reason("length"), FinishReason::Length);
        assert_eq!(convert_finish_reason("weird"), FinishReason::Error);
    }
}
