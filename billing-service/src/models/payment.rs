//! Payment model.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Payment against exactly one invoice. Immutable once created: amendments
/// go through new payments, not edits.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub payment_id: Uuid,
    pub org_id: Uuid,
    pub invoice_id: Uuid,
    pub client_id: Uuid,
    pub amount: Decimal,
    pub account: String,
    pub payment_date: NaiveDate,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub removed: bool,
    pub created_utc: DateTime<Utc>,
}

/// Input for recording a payment.
#[derive(Debug, Clone)]
pub struct RecordPayment {
    pub org_id: Uuid,
    pub invoice_id: Uuid,
    pub amount: Decimal,
    pub account: String,
    pub payment_date: NaiveDate,
    pub notes: Option<String>,
    pub created_by: Uuid,
}
