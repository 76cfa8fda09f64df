//! General ledger entry model.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Ledger account classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    Revenue,
    Expense,
    Asset,
    Liability,
    Equity,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Revenue => "revenue",
            EntryType::Expense => "expense",
            EntryType::Asset => "asset",
            EntryType::Liability => "liability",
            EntryType::Equity => "equity",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "revenue" => Some(EntryType::Revenue),
            "expense" => Some(EntryType::Expense),
            "asset" => Some(EntryType::Asset),
            "liability" => Some(EntryType::Liability),
            "equity" => Some(EntryType::Equity),
            _ => None,
        }
    }
}

/// Append-only ledger entry. At most one of `debit`/`credit` is non-zero per
/// entry; corrections are new offsetting entries, never updates.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GeneralLedgerEntry {
    pub entry_id: Uuid,
    pub org_id: Uuid,
    pub entry_date: NaiveDate,
    pub account: String,
    pub entry_type: String,
    pub description: String,
    pub debit: Decimal,
    pub credit: Decimal,
    pub invoice_id: Option<Uuid>,
    pub ref_id: Option<Uuid>,
    pub ref_type: Option<String>,
    pub created_utc: DateTime<Utc>,
}

/// Input for appending a ledger entry.
#[derive(Debug, Clone)]
pub struct RecordEntry {
    pub org_id: Uuid,
    pub entry_date: NaiveDate,
    pub account: String,
    pub entry_type: EntryType,
    pub description: String,
    pub debit: Decimal,
    pub credit: Decimal,
    pub invoice_id: Option<Uuid>,
    pub ref_id: Option<Uuid>,
    pub ref_type: Option<String>,
}

/// Outbox row: a pending ledger entry recorded atomically with its primary
/// record, waiting to be flushed into `ledger_entries`.
#[derive(Debug, Clone, FromRow)]
pub struct LedgerIntent {
    pub intent_id: Uuid,
    pub org_id: Uuid,
    pub entry_date: NaiveDate,
    pub account: String,
    pub entry_type: String,
    pub description: String,
    pub debit: Decimal,
    pub credit: Decimal,
    pub invoice_id: Option<Uuid>,
    pub ref_id: Option<Uuid>,
    pub ref_type: Option<String>,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub flushed_utc: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
}
