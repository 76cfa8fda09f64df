//! Unified activity timeline handler.

use axum::{
    extract::{Query, State},
    Json,
};
use service_core::error::AppError;
use service_core::response::ApiResponse;

use crate::dtos::HistoryQuery;
use crate::middleware::Identity;
use crate::models::ActivityType;
use crate::services::history::{self, HistoryFilter, HistoryPage};
use crate::startup::AppState;

/// Merge orders, invoices, and returns into one filterable timeline.
pub async fn history(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<HistoryPage>>, AppError> {
    let activity_type = match &query.activity_type {
        Some(s) => Some(ActivityType::from_string(s).ok_or_else(|| {
            AppError::BadRequest(anyhow::anyhow!("Unknown activity type '{}'", s))
        })?),
        None => None,
    };

    let filter = HistoryFilter {
        from: query.from,
        to: query.to,
        activity_type,
        client: query.client,
        performer: query.performer,
        status: query.status,
        min_amount: query.min_amount,
        max_amount: query.max_amount,
        search: query.q,
    };

    let entries = state.db.history_entries(identity.org_id).await?;
    let page = history::filter_page(
        entries,
        &filter,
        query.page.unwrap_or(1) as usize,
        query.page_size.unwrap_or(20) as usize,
    );

    Ok(ApiResponse::ok(page))
}
