//! Request Classifier
//!
//! First stage of the banking pipeline: turn free text into a
//! [`ClassifiedRequest`] via structured output. The flow is an explicit
//! finite-state machine with the decode-retry counter as state:
//!
//! ```text
//!                 decode ok
//!   Classify ───────────────────────► done (Classified)
//!      │  ▲ decode fail, retries left
//!      │  └──────────────┐
//!      │ retries exhausted
//!      ▼
//!   Clarify ── tool call ──► ask_user ──► back to Classify
//!      │  ▲
//!      │  └── chat reply: redirect to the `ask_user` tool
//!      │ redirects exhausted
//!      ▼
//!   done (Fallback with a static message)
//! ```

use std::sync::Arc;

use agent_core::agent::parse_tool_call;
use agent_core::message::{Conversation, Message};
use agent_core::provider::{GenerationOptions, LlmProvider};
use agent_core::tool::Tool;

use crate::error::{BankingError, Result};
use crate::model::ClassifiedRequest;

/// Bounded retries of the structured decode before escalating to the user
const DECODE_RETRIES: usize = 2;

/// Chat replies tolerated in the clarify state before degrading
const CLARIFY_REDIRECTS: usize = 2;

/// Hard bound on LLM calls per classification
const STEP_BUDGET: usize = 20;

/// Static message for the degraded path
pub const FALLBACK_MESSAGE: &str = "Failed to understand the user's intent";

const REDIRECT_NOTICE: &str = "Please call `ask_user` tool instead of chatting";

const RETRY_NOTICE: &str =
    "Your reply did not match the expected JSON schema. Respond with only the JSON object.";

/// JSON schema the structured output must validate against
const CLASSIFIED_REQUEST_SCHEMA: &str = r#"{
  "type": "object",
  "properties": {
    "requestType": { "type": "string", "enum": ["Transfer", "Analytics"] },
    "userRequest": {
      "type": "string",
      "description": "Actual request to be performed by the banking application"
    }
  },
  "required": ["requestType", "userRequest"]
}"#;

/// Terminal state of a classification run
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Classification {
    /// Structured decode succeeded
    Classified(ClassifiedRequest),
    /// Degraded path: classification gave up with a static explanation
    Fallback(String),
}

enum State {
    Classify { attempts: usize },
    Clarify { redirects: usize },
}

/// Classifies free-text banking requests into `{Transfer, Analytics}`
pub struct RequestClassifier {
    provider: Arc<dyn LlmProvider>,
    ask_user: Arc<dyn Tool>,
    options: GenerationOptions,
}

impl RequestClassifier {
    pub fn new(provider: Arc<dyn LlmProvider>, ask_user: Arc<dyn Tool>) -> Self {
        Self {
            provider,
            ask_user,
            options: GenerationOptions::for_model(crate::CHAT_MODEL).with_temperature(0.0),
        }
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    fn system_prompt(&self) -> String {
        let ask_user = self.ask_user.schema();
        format!(
            "You are a banking assistant classifying the user's request.\n\
             Respond ONLY with a JSON object validating against this schema:\n{}\n\n\
             Examples:\n\
             {{\"requestType\": \"Transfer\", \"userRequest\": \"Send 25 euros to Daniel for dinner at the restaurant.\"}}\n\
             {{\"requestType\": \"Analytics\", \"userRequest\": \"Provide transaction overview for the last month\"}}\n\n\
             If the request is too unclear to classify, call the `{}` tool instead:\n\
             ```tool\n{{\"tool\": \"{}\", \"arguments\": {{\"message\": \"your question\"}}}}\n```",
            CLASSIFIED_REQUEST_SCHEMA, ask_user.name, ask_user.name
        )
    }

    /// Classify one free-text request
    pub async fn classify(&self, user_input: &str) -> Result<Classification> {
        let mut conversation = Conversation::with_system_prompt(self.system_prompt());
        conversation.push(Message::user(user_input));

        let mut state = State::Classify { attempts: 0 };

        for _ in 0..STEP_BUDGET {
            let completion = self
                .provider
                .complete(conversation.messages(), &self.options)
                .await
                .map_err(BankingError::Agent)?;

            let content = completion.content;
            conversation.push(Message::assistant(&content));

            match state {
                State::Classify { attempts } => {
                    if let Some(request) = decode_classified(&content) {
                        tracing::debug!(request_type = ?request.request_type, "Request classified");
                        return Ok(Classification::Classified(request));
                    }

                    if attempts < DECODE_RETRIES {
                        tracing::debug!(attempts, "Structured decode failed, retrying");
                        conversation.push(Message::user(RETRY_NOTICE));
                        state = State::Classify {
                            attempts: attempts + 1,
                        };
                    } else {
                        conversation.push(Message::user(FALLBACK_MESSAGE));
                        state = State::Clarify { redirects: 0 };
                    }
                }
                State::Clarify { redirects } => {
                    let ask_user_call = parse_tool_call(&content)
                        .filter(|call| call.name == self.ask_user.schema().name);

                    if let Some(call) = ask_user_call {
                        self.ask_user.validate(&call)?;
                        let answer = self.ask_user.execute(&call).await?;
                        conversation.push(Message::user(answer.output));
                        state = State::Classify { attempts: 0 };
                    } else if redirects < CLARIFY_REDIRECTS {
                        conversation.push(Message::user(REDIRECT_NOTICE));
                        state = State::Clarify {
                            redirects: redirects + 1,
                        };
                    } else {
                        tracing::warn!("Classification degraded to fallback");
                        return Ok(Classification::Fallback(FALLBACK_MESSAGE.into()));
                    }
                }
            }
        }

        Err(BankingError::ClassificationStalled(STEP_BUDGET))
    }
}

/// Decode a `ClassifiedRequest` from LLM output, tolerating code fences and
/// surrounding prose. Empty `userRequest` counts as a decode failure.
fn decode_classified(content: &str) -> Option<ClassifiedRequest> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end <= start {
        return None;
    }

    let request: ClassifiedRequest = serde_json::from_str(&content[start..=end]).ok()?;
    if request.user_request.trim().is_empty() {
        return None;
    }
    Some(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RequestType;
    use agent_core::error::AgentError;
    use agent_core::provider::{Completion, CompletionStream};
    use agent_core::tool::AskUserTool;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedProvider {
        script: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn new(replies: &[&str]) -> Arc<Self> {
            let mut script: Vec<String> = replies.iter().map(|s| s.to_string()).collect();
            script.reverse();
            Arc::new(Self {
                script: Mutex::new(script),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn complete(
            &self,
            _messages: &[Message],
            options: &GenerationOptions,
        ) -> agent_core::Result<Completion> {
            let content = self
                .script
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| AgentError::Provider("script exhausted".into()))?;
            Ok(Completion {
                content,
                model: options.model.clone(),
                usage: None,
                finish_reason: None,
            })
        }

        async fn complete_stream(
            &self,
            _messages: &[Message],
            _options: &GenerationOptions,
        ) -> agent_core::Result<CompletionStream> {
            Err(AgentError::Provider("streaming not scripted".into()))
        }
    }

    fn classifier(provider: Arc<ScriptedProvider>, replies: &str) -> RequestClassifier {
        RequestClassifier::new(
            provider,
            Arc::new(AskUserTool::from_reader(std::io::Cursor::new(
                replies.to_string(),
            ))),
        )
    }

    const VALID_TRANSFER: &str =
        r#"{"requestType": "Transfer", "userRequest": "Send 25 euros to Daniel"}"#;

    #[tokio::test]
    async fn test_classifies_on_first_decode() {
        let provider = ScriptedProvider::new(&[VALID_TRANSFER]);
        let result = classifier(provider, "").classify("Send 25 euros to Daniel").await.unwrap();

        let Classification::Classified(request) = result else {
            panic!("expected classified request");
        };
        assert_eq!(request.request_type, RequestType::Transfer);
        assert_eq!(request.user_request, "Send 25 euros to Daniel");
    }

    #[tokio::test]
    async fn test_decode_failure_is_retried() {
        let provider = ScriptedProvider::new(&[
            "I think this is a transfer request.",
            r#"```json
{"requestType": "Analytics", "userRequest": "Overview for May"}
```"#,
        ]);

        let result = classifier(provider, "").classify("overview please").await.unwrap();
        let Classification::Classified(request) = result else {
            panic!("expected classified request");
        };
        assert_eq!(request.request_type, RequestType::Analytics);
    }

    #[tokio::test]
    async fn test_empty_user_request_counts_as_decode_failure() {
        assert!(decode_classified(r#"{"requestType": "Transfer", "userRequest": "  "}"#).is_none());
    }

    #[tokio::test]
    async fn test_clarify_path_asks_user_then_reclassifies() {
        // Three decode failures exhaust the retries, then the model asks the
        // user and classifies the scripted answer.
        let provider = ScriptedProvider::new(&[
            "not json",
            "still not json",
            "nope",
            "```tool\n{\"tool\": \"ask_user\", \"arguments\": {\"message\": \"What do you need?\"}}\n```",
            VALID_TRANSFER,
        ]);

        let result = classifier(provider, "Send 25 euros to Daniel\n")
            .classify("do the thing")
            .await
            .unwrap();

        assert!(matches!(result, Classification::Classified(_)));
    }

    #[tokio::test]
    async fn test_chat_in_clarify_state_is_redirected() {
        let provider = ScriptedProvider::new(&[
            "not json",
            "still not json",
            "nope",
            "Sure! What would you like to do today?",
            "```tool\n{\"tool\": \"ask_user\", \"arguments\": {\"message\": \"Please restate your request.\"}}\n```",
            VALID_TRANSFER,
        ]);

        let result = classifier(provider, "Send 25 euros to Daniel\n")
            .classify("do the thing")
            .await
            .unwrap();

        assert!(matches!(result, Classification::Classified(_)));
    }

    #[tokio::test]
    async fn test_degrades_to_fallback_after_redirects_exhausted() {
        let provider = ScriptedProvider::new(&[
            "not json",
            "still not json",
            "nope",
            "chat 1",
            "chat 2",
            "chat 3",
        ]);

        let result = classifier(provider, "").classify("???").await.unwrap();
        assert_eq!(result, Classification::Fallback(FALLBACK_MESSAGE.into()));
    }
}
