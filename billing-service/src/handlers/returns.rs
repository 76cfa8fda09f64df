//! Goods return handlers.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use service_core::error::AppError;
use service_core::response::ApiResponse;
use uuid::Uuid;

use crate::dtos::{CreateReturnRequest, ReturnListQuery, UpdateReturnStatusRequest};
use crate::middleware::Identity;
use crate::models::{CreateReturn, GoodsReturn, ReturnStatus};
use crate::startup::AppState;

pub async fn create_return(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<CreateReturnRequest>,
) -> Result<Json<ApiResponse<GoodsReturn>>, AppError> {
    let returned = state
        .db
        .create_return(&CreateReturn {
            org_id: identity.org_id,
            order_id: payload.order_id,
            order_item_id: payload.order_item_id,
            returned_quantity: payload.returned_quantity,
            reason: payload.reason,
            created_by: identity.user_id,
        })
        .await?;

    Ok(ApiResponse::ok(returned))
}

pub async fn list_returns(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<ReturnListQuery>,
) -> Result<Json<ApiResponse<Vec<GoodsReturn>>>, AppError> {
    let returns = state
        .db
        .list_returns(identity.org_id, query.order_id)
        .await?;

    Ok(ApiResponse::ok(returns))
}

pub async fn update_return_status(
    State(state): State<AppState>,
    identity: Identity,
    Path(return_id): Path<Uuid>,
    Json(payload): Json<UpdateReturnStatusRequest>,
) -> Result<Json<ApiResponse<GoodsReturn>>, AppError> {
    let next = ReturnStatus::from_string(&payload.status).ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!(
            "Unknown return status '{}'",
            payload.status
        ))
    })?;

    let returned = state
        .db
        .update_return_status(identity.org_id, return_id, next)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Return not found")))?;

    Ok(ApiResponse::ok(returned))
}
