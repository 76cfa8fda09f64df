//! Expense handlers.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use service_core::error::AppError;
use service_core::response::ApiResponse;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::{CreateExpenseRequest, Paging};
use crate::middleware::Identity;
use crate::models::{CreateExpense, Expense};
use crate::services::ledger;
use crate::startup::AppState;

pub async fn create_expense(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<CreateExpenseRequest>,
) -> Result<Json<ApiResponse<Expense>>, AppError> {
    payload.validate()?;

    let expense = state
        .db
        .create_expense(
            &CreateExpense {
                org_id: identity.org_id,
                name: payload.name,
                category: payload.category,
                description: payload.description,
                amount: payload.amount,
                expense_date: payload
                    .expense_date
                    .unwrap_or_else(|| Utc::now().date_naive()),
                bill_ref: payload.bill_ref,
                created_by: identity.user_id,
            },
            &state.config.accounting.cash_account,
        )
        .await?;

    ledger::flush_now(&state.db).await;

    Ok(ApiResponse::ok(expense))
}

pub async fn list_expenses(
    State(state): State<AppState>,
    identity: Identity,
    Query(paging): Query<Paging>,
) -> Result<Json<ApiResponse<Vec<Expense>>>, AppError> {
    let expenses = state
        .db
        .list_expenses(
            identity.org_id,
            paging.page.unwrap_or(1),
            paging.page_size.unwrap_or(20),
        )
        .await?;

    Ok(ApiResponse::ok(expenses))
}

pub async fn remove_expense(
    State(state): State<AppState>,
    identity: Identity,
    Path(expense_id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let removed = state.db.remove_expense(identity.org_id, expense_id).await?;
    if !removed {
        return Err(AppError::NotFound(anyhow::anyhow!("Expense not found")));
    }

    Ok(ApiResponse::ok(serde_json::json!({ "removed": true })))
}
