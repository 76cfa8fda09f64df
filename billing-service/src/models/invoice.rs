//! Invoice model.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Derived payment state. Never set directly by a request: always recomputed
/// from `(total, credit)` by the billing calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Partially,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Partially => "partially",
            PaymentStatus::Paid => "paid",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "partially" => PaymentStatus::Partially,
            "paid" => PaymentStatus::Paid,
            _ => PaymentStatus::Unpaid,
        }
    }
}

/// Invoice workflow status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Pending,
    Sent,
    Cancelled,
    OnHold,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Cancelled => "cancelled",
            InvoiceStatus::OnHold => "on_hold",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "draft" => InvoiceStatus::Draft,
            "sent" => InvoiceStatus::Sent,
            "cancelled" => InvoiceStatus::Cancelled,
            "on_hold" => InvoiceStatus::OnHold,
            _ => InvoiceStatus::Pending,
        }
    }
}

/// Invoice document. `sub_total`, `tax_total`, `total`, `credit` and
/// `payment_status` are derived columns; the discount is folded into `total`
/// once, at build time. Soft-deleted via `removed`, never hard-deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub invoice_id: Uuid,
    pub org_id: Uuid,
    pub invoice_number: i64,
    pub client_id: Uuid,
    pub invoice_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub tax_rate: Decimal,
    pub discount: Decimal,
    pub sub_total: Decimal,
    pub tax_total: Decimal,
    pub total: Decimal,
    pub credit: Decimal,
    pub payment_status: String,
    pub status: String,
    pub pdf: Option<String>,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub removed: bool,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Invoice {
    /// Remaining payable amount.
    pub fn outstanding(&self) -> Decimal {
        crate::services::money::sub(self.total, self.credit)
    }
}

/// Line item on an invoice. `original_quantity`/`returned_quantity` are
/// carried for audit display when the line came through return adjustment.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InvoiceItem {
    pub invoice_item_id: Uuid,
    pub invoice_id: Uuid,
    pub org_id: Uuid,
    pub item_name: String,
    pub description: Option<String>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total: Decimal,
    pub original_quantity: Option<Decimal>,
    pub returned_quantity: Option<Decimal>,
    pub sort_order: i32,
    pub created_utc: DateTime<Utc>,
}

/// Input for building an invoice.
#[derive(Debug, Clone)]
pub struct CreateInvoice {
    pub org_id: Uuid,
    pub client_id: Uuid,
    pub invoice_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub tax_rate: Decimal,
    pub discount: Decimal,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub items: Vec<CreateInvoiceItem>,
}

#[derive(Debug, Clone)]
pub struct CreateInvoiceItem {
    pub item_name: String,
    pub description: Option<String>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub original_quantity: Option<Decimal>,
    pub returned_quantity: Option<Decimal>,
}
