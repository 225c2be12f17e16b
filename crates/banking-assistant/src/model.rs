//! Domain Model
//!
//! Read-only demo data: the contact table, the FX rate table, and the demo
//! account. All of it is constructed explicitly and passed into the tool
//! components; nothing here is a process-wide global.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// The demo user everything is keyed to
pub const DEMO_USER_ID: u32 = 123;

/// A contact in the user's address book
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: u32,
    pub name: String,
    pub surname: Option<String>,
    pub phone_number: String,
}

impl Contact {
    pub fn new(id: u32, name: &str, surname: Option<&str>, phone_number: &str) -> Self {
        Self {
            id,
            name: name.into(),
            surname: surname.map(Into::into),
            phone_number: phone_number.into(),
        }
    }

    /// Surname or empty string, for display
    pub fn surname_or_empty(&self) -> &str {
        self.surname.as_deref().unwrap_or("")
    }
}

/// Immutable contact table, loaded once at startup
#[derive(Clone, Debug, Default)]
pub struct ContactDirectory {
    contacts: Vec<Contact>,
}

impl ContactDirectory {
    pub fn new(contacts: Vec<Contact>) -> Self {
        Self { contacts }
    }

    /// The fixed demo contact table
    pub fn demo() -> Self {
        Self::new(vec![
            Contact::new(100, "Alice", Some("Smith"), "+1 415 555 1234"),
            Contact::new(101, "Bob", Some("Johnson"), "+49 151 23456789"),
            Contact::new(102, "Charlie", Some("Williams"), "+36 20 123 4567"),
            Contact::new(103, "Daniel", Some("Anderson"), "+46 70 123 45 67"),
            Contact::new(104, "Daniel", Some("Garcia"), "+34 612 345 678"),
        ])
    }

    pub fn get(&self, id: u32) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.id == id)
    }

    pub fn all(&self) -> &[Contact] {
        &self.contacts
    }

    /// Case-insensitive substring match against given and family names
    pub fn search(&self, fuzzy_name: &str) -> Vec<&Contact> {
        let needle = fuzzy_name.to_lowercase();
        self.contacts
            .iter()
            .filter(|c| {
                c.name.to_lowercase().contains(&needle)
                    || c.surname
                        .as_deref()
                        .is_some_and(|s| s.to_lowercase().contains(&needle))
            })
            .collect()
    }
}

/// Demo account state: fixed balance and default currency
#[derive(Clone, Debug)]
pub struct BankAccount {
    pub user_id: u32,
    pub balance: Decimal,
    pub currency: String,
}

impl BankAccount {
    pub fn demo() -> Self {
        Self {
            user_id: DEMO_USER_ID,
            balance: dec!(200.00),
            currency: "EUR".into(),
        }
    }
}

/// Fixed FX rate table over uppercase ISO currency pairs
#[derive(Clone, Debug, Default)]
pub struct RateTable {
    rates: Vec<(String, String, Decimal)>,
}

impl RateTable {
    pub fn demo() -> Self {
        Self {
            rates: vec![
                ("EUR".into(), "USD".into(), dec!(1.10)),
                ("EUR".into(), "GBP".into(), dec!(0.86)),
                ("GBP".into(), "EUR".into(), dec!(1.16)),
                ("USD".into(), "EUR".into(), dec!(0.90)),
            ],
        }
    }

    /// Rate for a currency pair; lookup is case-insensitive
    pub fn lookup(&self, from: &str, to: &str) -> Option<Decimal> {
        let (from, to) = (from.to_uppercase(), to.to_uppercase());
        self.rates
            .iter()
            .find(|(f, t, _)| *f == from && *t == to)
            .map(|(_, _, rate)| *rate)
    }
}

/// Category of a classified banking request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestType {
    Transfer,
    Analytics,
}

/// Output of the request classifier, consumed exactly once by the router
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedRequest {
    /// Type of request: Transfer or Analytics
    pub request_type: RequestType,

    /// Actual request to be performed by the banking application
    pub user_request: String,
}
