//! Expense model.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Operating expense. Creation emits a paired ledger entry set (expense
/// debit + cash credit), best-effort.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Expense {
    pub expense_id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub amount: Decimal,
    pub expense_date: NaiveDate,
    pub bill_ref: Option<String>,
    pub created_by: Uuid,
    pub removed: bool,
    pub created_utc: DateTime<Utc>,
}

/// Input for recording an expense.
#[derive(Debug, Clone)]
pub struct CreateExpense {
    pub org_id: Uuid,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub amount: Decimal,
    pub expense_date: NaiveDate,
    pub bill_ref: Option<String>,
    pub created_by: Uuid,
}
