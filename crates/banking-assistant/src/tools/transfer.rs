//! Money-Transfer Tools
//!
//! The transfer domain is implemented as typed functions returning
//! discriminated results; the sentinel strings the model sees are produced
//! only at the tool boundary, in the `Display`/render layer. No real funds
//! move: `sendMoney` is a stub boundary to an external payment system, and a
//! transfer is a two-phase protocol (summary first, then an explicitly
//! confirmed call).

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;

use agent_core::error::{AgentError, Result};
use agent_core::tool::{
    ParameterSchema, Tool, ToolCall, ToolResult, ToolSchema, optional_bool, require_i64,
    require_str,
};

use crate::model::{BankAccount, Contact, ContactDirectory, RateTable};

/// Outcome of a transfer attempt
///
/// An unconfirmed call is pure and idempotent; only `Completed` represents a
/// (simulated) state change, and it is only reachable with `confirmed=true`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Recipient id is not in the contact table
    InvalidRecipient,
    /// Needs an explicit user confirmation before anything happens
    RequiresConfirmation { summary: String },
    /// Transfer performed (simulated)
    Completed { summary: String },
}

impl fmt::Display for TransferOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRecipient => write!(f, "Invalid recipient."),
            Self::RequiresConfirmation { summary } => {
                write!(f, "REQUIRES_CONFIRMATION: {}", summary)
            }
            Self::Completed { summary } => write!(f, "Money was sent. {}", summary),
        }
    }
}

/// Outcome of a fuzzy recipient lookup
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecipientMatch {
    /// Nothing matched the query
    NoCandidates { query: String },
    /// Ranked, 1-indexed candidates for the user to choose from
    Candidates(Vec<Contact>),
}

impl fmt::Display for RecipientMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCandidates { query } => write!(
                f,
                "No candidates found for '{}'. Use getContacts and ask the user to choose.",
                query
            ),
            Self::Candidates(contacts) => {
                for (idx, contact) in contacts.iter().enumerate() {
                    if idx > 0 {
                        writeln!(f)?;
                    }
                    write!(
                        f,
                        "{}. {}: {} {} ({})",
                        idx + 1,
                        contact.id,
                        contact.name,
                        contact.surname_or_empty(),
                        contact.phone_number
                    )?;
                }
                Ok(())
            }
        }
    }
}

/// Attempt a transfer against the contact table
pub fn send_money(
    directory: &ContactDirectory,
    amount: Decimal,
    recipient_id: u32,
    purpose: &str,
    confirmed: bool,
) -> TransferOutcome {
    let Some(recipient) = directory.get(recipient_id) else {
        return TransferOutcome::InvalidRecipient;
    };

    let summary = format!(
        "Transfer €{:.2} to {} {} ({}) for \"{}\".",
        amount,
        recipient.name,
        recipient.surname_or_empty(),
        recipient.phone_number,
        purpose
    );

    if !confirmed {
        return TransferOutcome::RequiresConfirmation { summary };
    }

    // A real system would call a payment API here.
    TransferOutcome::Completed { summary }
}

/// Resolve an ambiguous recipient name to ranked candidates
pub fn choose_recipient(directory: &ContactDirectory, fuzzy_name: &str) -> RecipientMatch {
    let matches = directory.search(fuzzy_name);
    if matches.is_empty() {
        return RecipientMatch::NoCandidates {
            query: fuzzy_name.to_string(),
        };
    }
    RecipientMatch::Candidates(matches.into_iter().cloned().collect())
}

fn require_decimal(call: &ToolCall, name: &str) -> Result<Decimal> {
    let value = call
        .arguments
        .get(name)
        .ok_or_else(|| AgentError::ToolValidation(format!("Missing argument: {}", name)))?;

    let parsed = match value {
        serde_json::Value::String(s) => s.trim().parse().ok(),
        serde_json::Value::Number(n) => n.as_f64().and_then(Decimal::from_f64_retain),
        _ => None,
    };

    parsed.ok_or_else(|| AgentError::ToolValidation(format!("Argument '{}' must be a number", name)))
}

fn user_id_param() -> ParameterSchema {
    ParameterSchema::required(
        "userId",
        "integer",
        "The unique identifier of the user (always 123 in this demo)",
    )
}

/// Lists the user's full contact table
pub struct GetContactsTool {
    directory: Arc<ContactDirectory>,
}

impl GetContactsTool {
    pub fn new(directory: Arc<ContactDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Tool for GetContactsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "getContacts".into(),
            description: "Returns the list of contacts for the given user.".into(),
            parameters: vec![user_id_param()],
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let _user_id = require_i64(call, "userId")?;

        let listing = self
            .directory
            .all()
            .iter()
            .map(|c| {
                format!(
                    "ID: {}, Name: {}, Surname: {}, Phone Number: {}",
                    c.id,
                    c.name,
                    c.surname_or_empty(),
                    c.phone_number
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        Ok(ToolResult::success("getContacts", listing))
    }
}

/// Reports the fixed demo balance
pub struct GetBalanceTool {
    account: BankAccount,
}

impl GetBalanceTool {
    pub fn new(account: BankAccount) -> Self {
        Self { account }
    }
}

#[async_trait]
impl Tool for GetBalanceTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "getBalance".into(),
            description: "Returns the current balance (demo value).".into(),
            parameters: vec![user_id_param()],
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let _user_id = require_i64(call, "userId")?;
        Ok(ToolResult::success(
            "getBalance",
            format!(
                "Balance: {:.2} {}",
                self.account.balance, self.account.currency
            ),
        ))
    }
}

/// Reports the user's default currency
pub struct GetDefaultCurrencyTool {
    account: BankAccount,
}

impl GetDefaultCurrencyTool {
    pub fn new(account: BankAccount) -> Self {
        Self { account }
    }
}

#[async_trait]
impl Tool for GetDefaultCurrencyTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "getDefaultCurrency".into(),
            description: "Returns the default user currency (demo value).".into(),
            parameters: vec![user_id_param()],
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let _user_id = require_i64(call, "userId")?;
        Ok(ToolResult::success(
            "getDefaultCurrency",
            self.account.currency.clone(),
        ))
    }
}

/// Looks up a demo FX rate between two ISO currencies
pub struct GetExchangeRateTool {
    rates: Arc<RateTable>,
}

impl GetExchangeRateTool {
    pub fn new(rates: Arc<RateTable>) -> Self {
        Self { rates }
    }
}

#[async_trait]
impl Tool for GetExchangeRateTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "getExchangeRate".into(),
            description: "Returns a demo FX rate between two ISO currencies (e.g. EUR to USD)."
                .into(),
            parameters: vec![
                ParameterSchema::required("from", "string", "Base currency (e.g., EUR)"),
                ParameterSchema::required("to", "string", "Target currency (e.g., USD)"),
            ],
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let from = require_str(call, "from")?;
        let to = require_str(call, "to")?;

        let output = match self.rates.lookup(from, to) {
            Some(rate) => format!("{:.2}", rate),
            None => "No information about exchange rate available.".into(),
        };

        Ok(ToolResult::success("getExchangeRate", output))
    }
}

/// Resolves an ambiguous recipient name to a ranked candidate list
pub struct ChooseRecipientTool {
    directory: Arc<ContactDirectory>,
}

impl ChooseRecipientTool {
    pub fn new(directory: Arc<ContactDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Tool for ChooseRecipientTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "chooseRecipient".into(),
            description: "Returns a ranked list of possible recipients for an ambiguous name. \
                          Ask the user to pick one and then use the selected contact id."
                .into(),
            parameters: vec![ParameterSchema::required(
                "confusingRecipientName",
                "string",
                "An ambiguous or partial contact name",
            )],
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let name = require_str(call, "confusingRecipientName")?;
        let outcome = choose_recipient(&self.directory, name);
        Ok(ToolResult::success("chooseRecipient", outcome.to_string()))
    }
}

/// Two-phase money transfer (simulated)
pub struct SendMoneyTool {
    directory: Arc<ContactDirectory>,
}

impl SendMoneyTool {
    pub fn new(directory: Arc<ContactDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Tool for SendMoneyTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "sendMoney".into(),
            description: "Sends money from the user to a contact. If confirmed=false, returns \
                          REQUIRES_CONFIRMATION with a human-readable summary; confirm with the \
                          user before retrying with confirmed=true."
                .into(),
            parameters: vec![
                ParameterSchema::required("senderId", "integer", "Sender user id"),
                ParameterSchema::required(
                    "amount",
                    "number",
                    "Amount in the sender's default currency",
                ),
                ParameterSchema::required("recipientId", "integer", "Recipient contact id"),
                ParameterSchema::required("purpose", "string", "Short purpose/description"),
                ParameterSchema::optional(
                    "confirmed",
                    "boolean",
                    "Whether the user already confirmed this transfer",
                    serde_json::Value::Bool(false),
                ),
            ],
            has_side_effects: true,
        }
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let _sender_id = require_i64(call, "senderId")?;
        let amount = require_decimal(call, "amount")?;
        let recipient_id = u32::try_from(require_i64(call, "recipientId")?)
            .map_err(|_| AgentError::ToolValidation("Argument 'recipientId' is out of range".into()))?;
        let purpose = require_str(call, "purpose")?;
        let confirmed = optional_bool(call, "confirmed", false);

        let outcome = send_money(&self.directory, amount, recipient_id, purpose, confirmed);

        tracing::info!(recipient_id, confirmed, outcome = %outcome, "sendMoney");

        Ok(ToolResult::success("sendMoney", outcome.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn call(name: &str, arguments: serde_json::Value) -> ToolCall {
        ToolCall {
            name: name.into(),
            arguments: serde_json::from_value(arguments).unwrap(),
            id: None,
        }
    }

    fn directory() -> Arc<ContactDirectory> {
        Arc::new(ContactDirectory::demo())
    }

    #[test]
    fn test_choose_recipient_daniel_returns_both_daniels() {
        let outcome = choose_recipient(&ContactDirectory::demo(), "Daniel");
        assert_eq!(
            outcome.to_string(),
            "1. 103: Daniel Anderson (+46 70 123 45 67)\n2. 104: Daniel Garcia (+34 612 345 678)"
        );
    }

    #[test]
    fn test_choose_recipient_no_candidates_sentinel() {
        let outcome = choose_recipient(&ContactDirectory::demo(), "Zzz");
        assert_eq!(
            outcome.to_string(),
            "No candidates found for 'Zzz'. Use getContacts and ask the user to choose."
        );
    }

    #[test]
    fn test_unconfirmed_send_is_idempotent() {
        let directory = ContactDirectory::demo();

        let first = send_money(&directory, dec!(25), 103, "dinner", false);
        let second = send_money(&directory, dec!(25), 103, "dinner", false);

        assert_eq!(first, second);
        assert_eq!(
            first.to_string(),
            "REQUIRES_CONFIRMATION: Transfer €25.00 to Daniel Anderson (+46 70 123 45 67) for \"dinner\"."
        );
    }

    #[test]
    fn test_confirmed_send_embeds_same_summary() {
        let directory = ContactDirectory::demo();

        let pending = send_money(&directory, dec!(25), 103, "dinner", false);
        let done = send_money(&directory, dec!(25), 103, "dinner", true);

        let TransferOutcome::RequiresConfirmation { summary } = pending else {
            panic!("expected confirmation request");
        };
        assert_eq!(done.to_string(), format!("Money was sent. {}", summary));
    }

    #[test]
    fn test_invalid_recipient_sentinel() {
        let outcome = send_money(&ContactDirectory::demo(), dec!(10), 999, "rent", true);
        assert_eq!(outcome.to_string(), "Invalid recipient.");
    }

    #[tokio::test]
    async fn test_get_contacts_listing() {
        let tool = GetContactsTool::new(directory());
        let result = tool
            .execute(&call("getContacts", json!({ "userId": 123 })))
            .await
            .unwrap();

        assert!(result.output.starts_with(
            "ID: 100, Name: Alice, Surname: Smith, Phone Number: +1 415 555 1234"
        ));
        assert_eq!(result.output.lines().count(), 5);
    }

    #[tokio::test]
    async fn test_balance_and_currency() {
        let balance = GetBalanceTool::new(BankAccount::demo())
            .execute(&call("getBalance", json!({ "userId": 123 })))
            .await
            .unwrap();
        assert_eq!(balance.output, "Balance: 200.00 EUR");

        let currency = GetDefaultCurrencyTool::new(BankAccount::demo())
            .execute(&call("getDefaultCurrency", json!({ "userId": 123 })))
            .await
            .unwrap();
        assert_eq!(currency.output, "EUR");
    }

    #[tokio::test]
    async fn test_exchange_rate_lookup_and_sentinel() {
        let tool = GetExchangeRateTool::new(Arc::new(RateTable::demo()));

        let known = tool
            .execute(&call("getExchangeRate", json!({ "from": "EUR", "to": "USD" })))
            .await
            .unwrap();
        assert_eq!(known.output, "1.10");

        let unknown = tool
            .execute(&call("getExchangeRate", json!({ "from": "USD", "to": "GBP" })))
            .await
            .unwrap();
        assert_eq!(unknown.output, "No information about exchange rate available.");
    }

    #[tokio::test]
    async fn test_send_money_tool_accepts_string_amount() {
        let tool = SendMoneyTool::new(directory());
        let result = tool
            .execute(&call(
                "sendMoney",
                json!({
                    "senderId": 123,
                    "amount": "50.00",
                    "recipientId": 100,
                    "purpose": "concert tickets",
                    "confirmed": true
                }),
            ))
            .await
            .unwrap();

        assert_eq!(
            result.output,
            "Money was sent. Transfer €50.00 to Alice Smith (+1 415 555 1234) for \"concert tickets\"."
        );
    }
}
