use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerwiseError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Income => "INCOME",
            Self::Expense => "EXPENSE",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "INCOME" => Ok(Self::Income),
            "EXPENSE" => Ok(Self::Expense),
            _ => Err(LedgerwiseError::InvalidInput(format!(
                "transaction type must be 'income' or 'expense', got '{raw}'"
            ))),
        }
    }
}

/// A ledger entry. `amount` is always a non-negative magnitude; the sign
/// lives in `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub owner: String,
    pub amount: f64,
    pub kind: TransactionType,
    pub category: String,
    pub description: String,
    pub date: NaiveDateTime,
}

/// One `STMTTRN` entry as pulled out of a statement, before any
/// interpretation. Every field is optional because banks omit them freely.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawStatementRecord {
    pub trnamt: Option<String>,
    pub memo: Option<String>,
    pub name: Option<String>,
    pub dtposted: Option<String>,
    pub fitid: Option<String>,
}
