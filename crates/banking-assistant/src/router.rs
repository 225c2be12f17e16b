//! Request Router
//!
//! Second stage of the banking pipeline: dispatch a [`ClassifiedRequest`] to
//! exactly one of two sub-agents, each with its own system prompt and a
//! disjoint tool set (transfer tools vs. analytics, both with the
//! clarification tool). Routing is total over the two-variant tag, so there
//! is no default branch.

use std::sync::Arc;

use agent_core::agent::AgentBuilder;
use agent_core::provider::{GenerationOptions, LlmProvider};
use agent_core::tool::Tool;

use crate::classifier::{Classification, RequestClassifier};
use crate::error::Result;
use crate::model::{BankAccount, ClassifiedRequest, ContactDirectory, RateTable, RequestType};
use crate::tools::{
    AnalyzeTransactionsTool, ChooseRecipientTool, GetBalanceTool, GetContactsTool,
    GetDefaultCurrencyTool, GetExchangeRateTool, SendMoneyTool, TransactionAnalytics,
    UnconfiguredAnalytics,
};

/// Iteration budget for sub-agents; transfers can take several tool steps
const SUB_AGENT_ITERATIONS: usize = 50;

/// Dispatches classified requests to the transfer or analytics sub-agent
pub struct BankingRouter {
    provider: Arc<dyn LlmProvider>,
    ask_user: Arc<dyn Tool>,
    directory: Arc<ContactDirectory>,
    account: BankAccount,
    rates: Arc<RateTable>,
    analytics: Arc<dyn TransactionAnalytics>,
}

impl BankingRouter {
    /// Router over the demo data set
    pub fn new(provider: Arc<dyn LlmProvider>, ask_user: Arc<dyn Tool>) -> Self {
        Self {
            provider,
            ask_user,
            directory: Arc::new(ContactDirectory::demo()),
            account: BankAccount::demo(),
            rates: Arc::new(RateTable::demo()),
            analytics: Arc::new(UnconfiguredAnalytics),
        }
    }

    pub fn with_directory(mut self, directory: Arc<ContactDirectory>) -> Self {
        self.directory = directory;
        self
    }

    pub fn with_analytics(mut self, analytics: Arc<dyn TransactionAnalytics>) -> Self {
        self.analytics = analytics;
        self
    }

    /// Dispatch to exactly one sub-agent based on the request tag
    pub async fn dispatch(&self, request: &ClassifiedRequest) -> Result<String> {
        match request.request_type {
            RequestType::Transfer => self.run_transfer(request).await,
            RequestType::Analytics => self.run_analytics(request).await,
        }
    }

    async fn run_transfer(&self, request: &ClassifiedRequest) -> Result<String> {
        tracing::info!(request = %request.user_request, "Routing to transfer sub-agent");

        let agent = AgentBuilder::new()
            .provider(self.provider.clone())
            .system_prompt(task_prompt(crate::BANKING_ASSISTANT_PROMPT, request))
            .generation(GenerationOptions::for_model(crate::CHAT_MODEL).with_temperature(0.0))
            .max_iterations(SUB_AGENT_ITERATIONS)
            .tool(GetContactsTool::new(self.directory.clone()))
            .tool(GetBalanceTool::new(self.account.clone()))
            .tool(GetDefaultCurrencyTool::new(self.account.clone()))
            .tool(GetExchangeRateTool::new(self.rates.clone()))
            .tool(ChooseRecipientTool::new(self.directory.clone()))
            .tool(SendMoneyTool::new(self.directory.clone()))
            .shared_tool(self.ask_user.clone())
            .build()?;

        Ok(agent.ask(&request.user_request).await?)
    }

    async fn run_analytics(&self, request: &ClassifiedRequest) -> Result<String> {
        tracing::info!(request = %request.user_request, "Routing to analytics sub-agent");

        let agent = AgentBuilder::new()
            .provider(self.provider.clone())
            .system_prompt(task_prompt(crate::TRANSACTION_ANALYSIS_PROMPT, request))
            .generation(GenerationOptions::for_model(crate::TASK_MODEL).with_temperature(0.0))
            .max_iterations(SUB_AGENT_ITERATIONS)
            .tool(AnalyzeTransactionsTool::new(self.analytics.clone()))
            .shared_tool(self.ask_user.clone())
            .build()?;

        Ok(agent.ask(&request.user_request).await?)
    }
}

fn task_prompt(base: &str, request: &ClassifiedRequest) -> String {
    format!(
        "{}\nSpecifically, you need to help with the following request:\n{}",
        base, request.user_request
    )
}

/// The complete two-stage pipeline: classify, then route
pub struct BankingAssistant {
    classifier: RequestClassifier,
    router: BankingRouter,
}

impl BankingAssistant {
    pub fn new(provider: Arc<dyn LlmProvider>, ask_user: Arc<dyn Tool>) -> Self {
        Self {
            classifier: RequestClassifier::new(provider.clone(), ask_user.clone()),
            router: BankingRouter::new(provider, ask_user),
        }
    }

    pub fn with_analytics(mut self, analytics: Arc<dyn TransactionAnalytics>) -> Self {
        self.router = self.router.with_analytics(analytics);
        self
    }

    /// Handle one user turn end to end
    pub async fn handle(&self, user_input: &str) -> Result<String> {
        match self.classifier.classify(user_input).await? {
            Classification::Classified(request) => self.router.dispatch(&request).await,
            Classification::Fallback(message) => Ok(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::error::AgentError;
    use agent_core::message::Message;
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

    fn ask_user() -> Arc<dyn Tool> {
        Arc::new(AskUserTool::from_reader(std::io::Cursor::new(String::new())))
    }

    fn request(request_type: RequestType, text: &str) -> ClassifiedRequest {
        ClassifiedRequest {
            request_type,
            user_request: text.into(),
        }
    }

    #[tokio::test]
    async fn test_transfer_dispatch_runs_transfer_tools() {
        let provider = ScriptedProvider::new(&[
            "```tool\n{\"tool\": \"sendMoney\", \"arguments\": {\"senderId\": 123, \"amount\": 50, \"recipientId\": 100, \"purpose\": \"concert tickets\", \"confirmed\": true}}\n```",
            "Operation completed successfully.",
        ]);

        let router = BankingRouter::new(provider, ask_user());
        let result = router
            .dispatch(&request(RequestType::Transfer, "Send 50 euros to Alice"))
            .await
            .unwrap();

        assert_eq!(result, "Operation completed successfully.");
    }

    #[tokio::test]
    async fn test_analytics_dispatch_uses_analytics_backend() {
        struct CannedAnalytics;

        #[async_trait]
        impl TransactionAnalytics for CannedAnalytics {
            async fn query(&self, _request: &str) -> agent_core::Result<String> {
                Ok("Total restaurant spending: 120.00 EUR".into())
            }
        }

        let provider = ScriptedProvider::new(&[
            "```tool\n{\"tool\": \"analyzeTransactions\", \"arguments\": {\"request\": \"restaurants this month\"}}\n```",
            "You spent 120.00 EUR on restaurants this month.",
        ]);

        let router = BankingRouter::new(provider, ask_user())
            .with_analytics(Arc::new(CannedAnalytics));
        let result = router
            .dispatch(&request(
                RequestType::Analytics,
                "How much have I spent on restaurants this month?",
            ))
            .await
            .unwrap();

        assert_eq!(result, "You spent 120.00 EUR on restaurants this month.");
    }

    #[tokio::test]
    async fn test_full_pipeline_classifies_then_routes() {
        // First reply answers the classifier, the second is the transfer
        // sub-agent's final message.
        let provider = ScriptedProvider::new(&[
            r#"{"requestType": "Transfer", "userRequest": "Transfer 100 to Bob for groceries"}"#,
            "Task completed successfully.",
        ]);

        let assistant = BankingAssistant::new(provider, ask_user());
        let result = assistant
            .handle("Transfer 100 to Bob for groceries")
            .await
            .unwrap();

        assert_eq!(result, "Task completed successfully.");
    }
}
