//! Banking Tool Sets
//!
//! Two disjoint tool sets, mirroring the two sub-agents: money transfer
//! (contacts, balance, FX, two-phase send) and transaction analytics. Both
//! sub-agents additionally get the clarification tool from the core crate.

pub mod analysis;
pub mod transfer;

pub use analysis::{AnalyzeTransactionsTool, TransactionAnalytics, UnconfiguredAnalytics};
pub use transfer::{
    ChooseRecipientTool, GetBalanceTool, GetContactsTool, GetDefaultCurrencyTool,
    GetExchangeRateTool, SendMoneyTool, TransferOutcome,
};
