//! Payment handlers.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use service_core::error::AppError;
use service_core::response::ApiResponse;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::{PaymentListQuery, PaymentResponse, RecordPaymentRequest};
use crate::middleware::Identity;
use crate::models::{Payment, RecordPayment};
use crate::services::ledger;
use crate::startup::AppState;

pub async fn record_payment(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<RecordPaymentRequest>,
) -> Result<Json<ApiResponse<PaymentResponse>>, AppError> {
    payload.validate()?;

    let input = RecordPayment {
        org_id: identity.org_id,
        invoice_id: payload.invoice_id,
        amount: payload.amount,
        account: payload.account,
        payment_date: payload
            .payment_date
            .unwrap_or_else(|| Utc::now().date_naive()),
        notes: payload.notes,
        created_by: identity.user_id,
    };

    let (payment, invoice) = state.db.record_payment(&input).await?;

    ledger::flush_now(&state.db).await;

    Ok(ApiResponse::ok(PaymentResponse { payment, invoice }))
}

pub async fn get_payment(
    State(state): State<AppState>,
    identity: Identity,
    Path(payment_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Payment>>, AppError> {
    let payment = state
        .db
        .get_payment(identity.org_id, payment_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Payment not found")))?;

    Ok(ApiResponse::ok(payment))
}

pub async fn list_payments(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<PaymentListQuery>,
) -> Result<Json<ApiResponse<Vec<Payment>>>, AppError> {
    let payments = state
        .db
        .list_payments(
            identity.org_id,
            query.invoice_id,
            query.page.unwrap_or(1),
            query.page_size.unwrap_or(20),
        )
        .await?;

    Ok(ApiResponse::ok(payments))
}
