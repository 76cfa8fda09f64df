//! Invoice handlers.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use rust_decimal::Decimal;
use service_core::error::AppError;
use service_core::response::ApiResponse;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::{
    CreateInvoiceRequest, InvoiceFromOrderRequest, InvoiceItemRequest, InvoiceListQuery,
    InvoiceResponse, UpdateInvoiceRequest,
};
use crate::middleware::Identity;
use crate::models::{CreateInvoice, CreateInvoiceItem, Invoice};
use crate::services::{ledger, returns};
use crate::startup::AppState;

fn items_from_request(items: Vec<InvoiceItemRequest>) -> Vec<CreateInvoiceItem> {
    items
        .into_iter()
        .map(|item| CreateInvoiceItem {
            item_name: item.item_name,
            description: item.description,
            quantity: item.quantity,
            unit_price: item.unit_price,
            original_quantity: None,
            returned_quantity: None,
        })
        .collect()
}

pub async fn create_invoice(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<CreateInvoiceRequest>,
) -> Result<Json<ApiResponse<InvoiceResponse>>, AppError> {
    payload.validate()?;

    let input = CreateInvoice {
        org_id: identity.org_id,
        client_id: payload.client_id,
        invoice_date: payload
            .invoice_date
            .unwrap_or_else(|| Utc::now().date_naive()),
        due_date: payload.due_date,
        tax_rate: payload.tax_rate.unwrap_or(Decimal::ZERO),
        discount: payload.discount.unwrap_or(Decimal::ZERO),
        notes: payload.notes,
        created_by: identity.user_id,
        items: items_from_request(payload.items),
    };

    let (invoice, items) = state
        .db
        .create_invoice(&input, &state.config.accounting.revenue_account)
        .await?;

    ledger::flush_now(&state.db).await;

    Ok(ApiResponse::ok(InvoiceResponse { invoice, items }))
}

/// Build an invoice from an order: the order's lines are netted against its
/// returns first, and fully-returned lines never reach the invoice.
pub async fn create_invoice_from_order(
    State(state): State<AppState>,
    identity: Identity,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<InvoiceFromOrderRequest>,
) -> Result<Json<ApiResponse<InvoiceResponse>>, AppError> {
    let order = state
        .db
        .get_order(identity.org_id, order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Order not found")))?;

    let order_items = state.db.get_order_items(identity.org_id, order_id).await?;
    let order_returns = state
        .db
        .list_returns(identity.org_id, Some(order_id))
        .await?;

    let adjustment = returns::billable_lines(&order_items, &order_returns);
    returns::log_findings(identity.org_id, order_id, &adjustment);

    if adjustment.lines.is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "No billable quantity remains on this order"
        )));
    }

    let items = adjustment
        .lines
        .into_iter()
        .map(|line| CreateInvoiceItem {
            item_name: line.item_name,
            description: None,
            quantity: line.used_quantity,
            unit_price: line.unit_price,
            original_quantity: Some(line.original_quantity),
            returned_quantity: Some(line.returned_quantity),
        })
        .collect();

    let input = CreateInvoice {
        org_id: identity.org_id,
        client_id: order.client_id,
        invoice_date: payload
            .invoice_date
            .unwrap_or_else(|| Utc::now().date_naive()),
        due_date: payload.due_date,
        tax_rate: payload.tax_rate.unwrap_or(Decimal::ZERO),
        discount: payload.discount.unwrap_or(Decimal::ZERO),
        notes: payload.notes,
        created_by: identity.user_id,
        items,
    };

    let (invoice, items) = state
        .db
        .create_invoice(&input, &state.config.accounting.revenue_account)
        .await?;

    ledger::flush_now(&state.db).await;

    Ok(ApiResponse::ok(InvoiceResponse { invoice, items }))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    identity: Identity,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<ApiResponse<InvoiceResponse>>, AppError> {
    let invoice = state
        .db
        .get_invoice(identity.org_id, invoice_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;
    let items = state
        .db
        .get_invoice_items(identity.org_id, invoice_id)
        .await?;

    Ok(ApiResponse::ok(InvoiceResponse { invoice, items }))
}

pub async fn list_invoices(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<InvoiceListQuery>,
) -> Result<Json<ApiResponse<Vec<Invoice>>>, AppError> {
    let invoices = state
        .db
        .list_invoices(
            identity.org_id,
            query.client_id,
            query.payment_status.as_deref(),
            query.page.unwrap_or(1),
            query.page_size.unwrap_or(20),
        )
        .await?;

    Ok(ApiResponse::ok(invoices))
}

pub async fn update_invoice(
    State(state): State<AppState>,
    identity: Identity,
    Path(invoice_id): Path<Uuid>,
    Json(payload): Json<UpdateInvoiceRequest>,
) -> Result<Json<ApiResponse<InvoiceResponse>>, AppError> {
    payload.validate()?;

    let tax_rate = payload.tax_rate.unwrap_or(Decimal::ZERO);
    let discount = payload.discount.unwrap_or(Decimal::ZERO);
    let items = items_from_request(payload.items);

    let (invoice, items) = state
        .db
        .update_invoice_items(identity.org_id, invoice_id, &items, tax_rate, discount)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;

    Ok(ApiResponse::ok(InvoiceResponse { invoice, items }))
}

pub async fn remove_invoice(
    State(state): State<AppState>,
    identity: Identity,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let removed = state.db.remove_invoice(identity.org_id, invoice_id).await?;
    if !removed {
        return Err(AppError::NotFound(anyhow::anyhow!("Invoice not found")));
    }

    Ok(ApiResponse::ok(serde_json::json!({ "removed": true })))
}
