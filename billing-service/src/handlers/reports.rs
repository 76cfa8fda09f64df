//! Financial report handlers.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use service_core::error::AppError;
use service_core::response::ApiResponse;

use crate::dtos::{CategoryTotal, FinancialSummaryResponse, RangeQuery};
use crate::middleware::Identity;
use crate::services::{money, reports};
use crate::startup::AppState;

/// Roll up invoices, expenses, and outstanding balances into one summary.
/// Read-only; performs no writes.
pub async fn financial_summary(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<RangeQuery>,
) -> Result<Json<ApiResponse<FinancialSummaryResponse>>, AppError> {
    let org_id = identity.org_id;

    let total_revenue = state
        .db
        .invoice_revenue_total(org_id, query.from, query.to)
        .await?;
    let total_expenses = state.db.expense_total(org_id, query.from, query.to).await?;

    let net_profit = money::sub(total_revenue, total_expenses);
    let estimated_tax = reports::tax_estimate(net_profit, state.config.accounting.tax_rate);

    let monthly_revenue = state
        .db
        .monthly_invoice_totals(org_id, query.from, query.to)
        .await?;
    let monthly_expenses = state
        .db
        .monthly_expense_totals(org_id, query.from, query.to)
        .await?;
    let monthly_trend = reports::merge_monthly(&monthly_revenue, &monthly_expenses);

    let expenses_by_category = state
        .db
        .expenses_by_category(org_id, query.from, query.to)
        .await?
        .into_iter()
        .map(|(category, amount)| CategoryTotal { category, amount })
        .collect();

    // Aging is always relative to "now" at query time.
    let outstanding_rows = state.db.outstanding_invoices(org_id).await?;
    let outstanding = reports::bucket_outstanding(&outstanding_rows, Utc::now().date_naive());

    Ok(ApiResponse::ok(FinancialSummaryResponse {
        total_revenue,
        total_expenses,
        net_profit,
        estimated_tax,
        monthly_trend,
        expenses_by_category,
        outstanding,
    }))
}
