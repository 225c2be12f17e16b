//! Transaction-Analysis Tools
//!
//! Analytics queries run against an external collaborator that owns the
//! transaction history. Its internals are out of scope here; the boundary is
//! a single free-text query returning a textual report.

use async_trait::async_trait;
use std::sync::Arc;

use agent_core::error::Result;
use agent_core::tool::{ParameterSchema, Tool, ToolCall, ToolResult, ToolSchema, require_str};

/// External collaborator exposing analytics over the user's transactions
#[async_trait]
pub trait TransactionAnalytics: Send + Sync {
    /// Answer a free-text analytics query (e.g. "total spent on restaurants
    /// this month") with a textual report.
    async fn query(&self, request: &str) -> Result<String>;
}

/// Placeholder backend used when no analytics service is wired up.
///
/// Returns a sentinel the model can relay instead of failing the turn.
pub struct UnconfiguredAnalytics;

#[async_trait]
impl TransactionAnalytics for UnconfiguredAnalytics {
    async fn query(&self, _request: &str) -> Result<String> {
        Ok("No transaction history service is connected in this demo.".into())
    }
}

/// Runs an analytics query against the configured backend
pub struct AnalyzeTransactionsTool {
    backend: Arc<dyn TransactionAnalytics>,
}

impl AnalyzeTransactionsTool {
    pub fn new(backend: Arc<dyn TransactionAnalytics>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for AnalyzeTransactionsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "analyzeTransactions".into(),
            description: "Performs analytics on the user's transaction history.".into(),
            parameters: vec![ParameterSchema::required(
                "request",
                "string",
                "Transaction analytics request",
            )],
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let request = require_str(call, "request")?;
        let report = self.backend.query(request).await?;
        Ok(ToolResult::success("analyzeTransactions", report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct CannedAnalytics;

    #[async_trait]
    impl TransactionAnalytics for CannedAnalytics {
        async fn query(&self, request: &str) -> Result<String> {
            Ok(format!("Report for: {}", request))
        }
    }

    #[tokio::test]
    async fn test_query_is_forwarded_to_backend() {
        let tool = AnalyzeTransactionsTool::new(Arc::new(CannedAnalytics));
        let call = ToolCall {
            name: "analyzeTransactions".into(),
            arguments: serde_json::from_value(json!({ "request": "spending last month" })).unwrap(),
            id: None,
        };

        let result = tool.execute(&call).await.unwrap();
        assert_eq!(result.output, "Report for: spending last month");
    }

    #[tokio::test]
    async fn test_unconfigured_backend_returns_sentinel() {
        let report = UnconfiguredAnalytics.query("anything").await.unwrap();
        assert!(report.contains("not connected") || report.contains("No transaction history"));
    }
}
