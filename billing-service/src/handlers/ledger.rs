//! General ledger handlers: entry listing, summary aggregates, and the
//! per-client statement.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use rust_decimal::Decimal;
use service_core::error::AppError;
use service_core::response::ApiResponse;
use uuid::Uuid;

use crate::dtos::{LedgerListQuery, LedgerSummaryResponse, RangeQuery, StatementResponse};
use crate::middleware::Identity;
use crate::models::GeneralLedgerEntry;
use crate::services::{money, reports, statement};
use crate::startup::AppState;

pub async fn list_entries(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<LedgerListQuery>,
) -> Result<Json<ApiResponse<Vec<GeneralLedgerEntry>>>, AppError> {
    let entries = state
        .db
        .list_ledger_entries(
            identity.org_id,
            query.entry_type.as_deref(),
            query.from,
            query.to,
            query.page.unwrap_or(1),
            query.page_size.unwrap_or(20),
        )
        .await?;

    Ok(ApiResponse::ok(entries))
}

/// Revenue, expenses, net profit, and estimated tax from the ledger.
pub async fn summary(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<RangeQuery>,
) -> Result<Json<ApiResponse<LedgerSummaryResponse>>, AppError> {
    let (revenue, expenses) = state
        .db
        .ledger_summary(identity.org_id, query.from, query.to)
        .await?;

    let net_profit = money::sub(revenue, expenses);
    let estimated_tax = reports::tax_estimate(net_profit, state.config.accounting.tax_rate);

    Ok(ApiResponse::ok(LedgerSummaryResponse {
        revenue,
        expenses,
        net_profit,
        estimated_tax,
    }))
}

/// Per-client statement: invoices as debits, payments as credits, merged by
/// date with a running balance. Recomputed on every request.
pub async fn client_statement(
    State(state): State<AppState>,
    identity: Identity,
    Path(client_id): Path<Uuid>,
) -> Result<Json<ApiResponse<StatementResponse>>, AppError> {
    let client = state
        .db
        .get_client(identity.org_id, client_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Client not found")))?;

    let sources = state
        .db
        .client_statement_sources(identity.org_id, client_id)
        .await?;

    let rows = statement::merge_statement(sources);
    let balance = rows.last().map(|row| row.balance).unwrap_or(Decimal::ZERO);

    Ok(ApiResponse::ok(StatementResponse {
        client,
        rows,
        balance,
    }))
}
