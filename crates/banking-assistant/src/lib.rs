//! Banking Assistant
//!
//! Two-stage banking pipeline on top of `agent-core`:
//!
//! ```text
//!  user input
//!      │
//!      ▼
//!  ┌─────────────────┐   structured output    ┌────────────────────┐
//!  │ RequestClassifier│ ─────────────────────►│  ClassifiedRequest │
//!  └─────────────────┘   (retry + ask_user)   └─────────┬──────────┘
//!                                                       │
//!                                    ┌──────────────────┴──────────────────┐
//!                                    ▼                                     ▼
//!                          ┌──────────────────┐                 ┌──────────────────┐
//!                          │ transfer agent   │                 │ analytics agent  │
//!                          │ contacts, FX,    │                 │ analyzeTransact. │
//!                          │ sendMoney, ...   │                 │                  │
//!                          └──────────────────┘                 └──────────────────┘
//! ```
//!
//! All domain data (contacts, rates, account) is fixed demo content. Domain
//! failures travel back to the model as sentinel strings; the typed error
//! channel carries infrastructure faults only.

pub mod classifier;
pub mod error;
pub mod model;
pub mod router;
pub mod tools;

pub use classifier::{Classification, RequestClassifier};
pub use error::{BankingError, Result};
pub use model::{
    BankAccount, ClassifiedRequest, Contact, ContactDirectory, DEMO_USER_ID, RateTable,
    RequestType,
};
pub use router::{BankingAssistant, BankingRouter};

/// Model used for classification and transfers.
///
/// Deliberately a local literal rather than a re-export of the provider
/// crate's model constants: this crate depends only on the `agent-core`
/// traits, and the id is just a generation-options string any backend may
/// interpret.
pub const CHAT_MODEL: &str = "gpt-4o";

/// Cheaper model for the analytics sub-agent (see [`CHAT_MODEL`] on why this
/// is a local literal)
pub const TASK_MODEL: &str = "gpt-4o-mini";

/// System prompt for the money-transfer sub-agent
pub const BANKING_ASSISTANT_PROMPT: &str = "\
You are a banking assistant interacting with a user (userId=123).
Your goal is to understand the user's request and determine whether it can be fulfilled using the available tools.
If the task can be accomplished with the provided tools, proceed accordingly,
at the end of the conversation respond with: \"Task completed successfully.\"
After an operation is succeded, respond with: \"Operation completed successfully.\"
If it is not, respond with: \"Operation failed.\"
If the task cannot be performed with the tools available, respond with: \"Can't perform the task.\"";

/// System prompt for the transaction-analysis sub-agent
pub const TRANSACTION_ANALYSIS_PROMPT: &str = "\
You are a banking assistant analyzing the user's transaction history (userId=123).
Use the analyzeTransactions tool to answer questions about past spending.
At the end of the conversation respond with: \"Task completed successfully.\"
If the task cannot be performed with the tools available, respond with: \"Can't perform the task.\"";
