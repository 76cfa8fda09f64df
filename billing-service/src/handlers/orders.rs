//! Order handlers.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use service_core::error::AppError;
use service_core::response::ApiResponse;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::{CreateOrderRequest, OrderResponse, Paging, UpdateOrderStatusRequest};
use crate::middleware::Identity;
use crate::models::{CreateOrder, CreateOrderItem, Order, OrderStatus};
use crate::startup::AppState;

pub async fn create_order(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<ApiResponse<OrderResponse>>, AppError> {
    payload.validate()?;

    let input = CreateOrder {
        org_id: identity.org_id,
        client_id: payload.client_id,
        created_by: identity.user_id,
        items: payload
            .items
            .into_iter()
            .map(|item| CreateOrderItem {
                item_id: item.item_id,
                item_name: item.item_name,
                quantity: item.quantity,
                unit_price: item.unit_price,
            })
            .collect(),
    };

    let (order, items) = state.db.create_order(&input).await?;

    Ok(ApiResponse::ok(OrderResponse { order, items }))
}

pub async fn get_order(
    State(state): State<AppState>,
    identity: Identity,
    Path(order_id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrderResponse>>, AppError> {
    let order = state
        .db
        .get_order(identity.org_id, order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Order not found")))?;
    let items = state.db.get_order_items(identity.org_id, order_id).await?;

    Ok(ApiResponse::ok(OrderResponse { order, items }))
}

pub async fn list_orders(
    State(state): State<AppState>,
    identity: Identity,
    Query(paging): Query<Paging>,
) -> Result<Json<ApiResponse<Vec<Order>>>, AppError> {
    let orders = state
        .db
        .list_orders(
            identity.org_id,
            None,
            paging.page.unwrap_or(1),
            paging.page_size.unwrap_or(20),
        )
        .await?;

    Ok(ApiResponse::ok(orders))
}

pub async fn update_order_status(
    State(state): State<AppState>,
    identity: Identity,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> Result<Json<ApiResponse<Order>>, AppError> {
    let next = OrderStatus::from_string(&payload.status).ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!("Unknown order status '{}'", payload.status))
    })?;

    let order = state
        .db
        .update_order_status(identity.org_id, order_id, next)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Order not found")))?;

    Ok(ApiResponse::ok(order))
}
