//! Error Types

use thiserror::Error;

/// Result type alias for banking operations
pub type Result<T> = std::result::Result<T, BankingError>;

/// Banking assistant error types
///
/// Domain-level failures (unknown recipient, unknown currency pair, no
/// matching contact) are NOT errors: they are rendered as sentinel strings at
/// the LLM-facing boundary so the model can explain them to the user. These
/// variants cover infrastructure failures only.
#[derive(Error, Debug)]
pub enum BankingError {
    /// Agent framework or provider failure
    #[error(transparent)]
    Agent(#[from] agent_core::AgentError),

    /// Classification exceeded its step budget without a terminal state
    #[error("Classification did not terminate within {0} steps")]
    ClassificationStalled(usize),
}
