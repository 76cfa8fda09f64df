//! Client handlers.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use service_core::error::AppError;
use service_core::response::ApiResponse;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::{ClientLookupQuery, ClientMatchResponse, CreateClientRequest, Paging};
use crate::middleware::Identity;
use crate::models::{Client, ClientLookup, CreateClient};
use crate::startup::AppState;

pub async fn create_client(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<CreateClientRequest>,
) -> Result<Json<ApiResponse<Client>>, AppError> {
    payload.validate()?;

    let client = state
        .db
        .create_client(&CreateClient {
            org_id: identity.org_id,
            name: payload.name,
            email: payload.email,
            phone: payload.phone,
            address: payload.address,
            linked_user_id: payload.linked_user_id,
        })
        .await?;

    Ok(ApiResponse::ok(client))
}

pub async fn get_client(
    State(state): State<AppState>,
    identity: Identity,
    Path(client_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Client>>, AppError> {
    let client = state
        .db
        .get_client(identity.org_id, client_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Client not found")))?;

    Ok(ApiResponse::ok(client))
}

pub async fn list_clients(
    State(state): State<AppState>,
    identity: Identity,
    Query(paging): Query<Paging>,
) -> Result<Json<ApiResponse<Vec<Client>>>, AppError> {
    let clients = state
        .db
        .list_clients(
            identity.org_id,
            paging.page.unwrap_or(1),
            paging.page_size.unwrap_or(20),
        )
        .await?;

    Ok(ApiResponse::ok(clients))
}

/// Resolve a client through the prioritized lookup strategies and report
/// which one matched.
pub async fn lookup_client(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<ClientLookupQuery>,
) -> Result<Json<ApiResponse<ClientMatchResponse>>, AppError> {
    let lookup = ClientLookup {
        client_id: query.client_id,
        linked_user_id: query.linked_user_id,
        email: query.email,
        name: query.name,
    };

    if lookup.client_id.is_none()
        && lookup.linked_user_id.is_none()
        && lookup.email.is_none()
        && lookup.name.is_none()
    {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "At least one lookup key is required"
        )));
    }

    let (client, matched_by) = state
        .db
        .find_client(identity.org_id, &lookup)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("No client matched the lookup")))?;

    Ok(ApiResponse::ok(ClientMatchResponse { client, matched_by }))
}
