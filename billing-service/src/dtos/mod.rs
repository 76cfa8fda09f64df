//! Request and response DTOs for the REST surface.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{Client, Invoice, InvoiceItem, MatchedBy, Order, OrderItem, Payment};
use crate::services::reports::{AgingBuckets, MonthlyTrend};
use crate::services::statement::StatementRow;

// ----------------------------------------------------------------------------
// Clients
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateClientRequest {
    #[validate(length(min = 1, message = "client name is required"))]
    pub name: String,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub linked_user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ClientLookupQuery {
    pub client_id: Option<Uuid>,
    pub linked_user_id: Option<Uuid>,
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClientMatchResponse {
    pub client: Client,
    pub matched_by: MatchedBy,
}

// ----------------------------------------------------------------------------
// Orders
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    pub client_id: Uuid,
    #[validate(
        length(min = 1, message = "order must have at least one line item"),
        nested
    )]
    pub items: Vec<OrderItemRequest>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct OrderItemRequest {
    pub item_id: Uuid,
    #[validate(length(min = 1, message = "item name is required"))]
    pub item_name: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

// ----------------------------------------------------------------------------
// Returns
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateReturnRequest {
    pub order_id: Uuid,
    pub order_item_id: Uuid,
    pub returned_quantity: Decimal,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReturnListQuery {
    pub order_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateReturnStatusRequest {
    pub status: String,
}

// ----------------------------------------------------------------------------
// Invoices
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvoiceRequest {
    pub client_id: Uuid,
    pub invoice_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    #[validate(
        length(min = 1, message = "invoice must have at least one line item"),
        nested
    )]
    pub items: Vec<InvoiceItemRequest>,
    pub tax_rate: Option<Decimal>,
    pub discount: Option<Decimal>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct InvoiceItemRequest {
    #[validate(length(min = 1, message = "item name is required"))]
    pub item_name: String,
    pub description: Option<String>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

/// Body for building an invoice from an order's return-adjusted lines.
#[derive(Debug, Deserialize)]
pub struct InvoiceFromOrderRequest {
    pub invoice_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub tax_rate: Option<Decimal>,
    pub discount: Option<Decimal>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateInvoiceRequest {
    #[validate(
        length(min = 1, message = "invoice must have at least one line item"),
        nested
    )]
    pub items: Vec<InvoiceItemRequest>,
    pub tax_rate: Option<Decimal>,
    pub discount: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct InvoiceListQuery {
    pub client_id: Option<Uuid>,
    pub payment_status: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
}

// ----------------------------------------------------------------------------
// Payments
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct RecordPaymentRequest {
    pub invoice_id: Uuid,
    pub amount: Decimal,
    #[validate(length(min = 1, message = "account label is required"))]
    pub account: String,
    pub payment_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentListQuery {
    pub invoice_id: Option<Uuid>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub payment: Payment,
    pub invoice: Invoice,
}

// ----------------------------------------------------------------------------
// Expenses
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateExpenseRequest {
    #[validate(length(min = 1, message = "expense name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "expense category is required"))]
    pub category: String,
    pub description: Option<String>,
    pub amount: Decimal,
    pub expense_date: Option<NaiveDate>,
    pub bill_ref: Option<String>,
}

// ----------------------------------------------------------------------------
// Ledger and reports
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct Paging {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct LedgerListQuery {
    pub entry_type: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct LedgerSummaryResponse {
    pub revenue: Decimal,
    pub expenses: Decimal,
    pub net_profit: Decimal,
    pub estimated_tax: Decimal,
}

#[derive(Debug, Serialize)]
pub struct StatementResponse {
    pub client: Client,
    pub rows: Vec<StatementRow>,
    pub balance: Decimal,
}

#[derive(Debug, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct FinancialSummaryResponse {
    pub total_revenue: Decimal,
    pub total_expenses: Decimal,
    pub net_profit: Decimal,
    pub estimated_tax: Decimal,
    pub monthly_trend: Vec<MonthlyTrend>,
    pub expenses_by_category: Vec<CategoryTotal>,
    pub outstanding: AgingBuckets,
}

// ----------------------------------------------------------------------------
// History
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub activity_type: Option<String>,
    pub client: Option<String>,
    pub performer: Option<String>,
    pub status: Option<String>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    pub q: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}
